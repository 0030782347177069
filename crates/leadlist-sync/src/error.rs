use leadlist_core::Rejection;
use thiserror::Error;

/// Failure of a remote call below the application level.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("circuit open after repeated transport failures")]
    CircuitOpen,

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Failures worth another attempt: the request never reached the service,
    /// the service asked us to come back later, or the call timed out. Lead
    /// submissions update on a sole key match, so replaying a record the
    /// service already processed updates the same contact.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) => true,
            Self::Server { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::Decode(_) | Self::CircuitOpen | Self::Other(_) => false,
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("username must not be empty")]
    MissingCredentials,

    #[error("credentials rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Per-row scrubbing failures of a bulk import.
#[derive(Debug, Clone)]
pub struct RowRejection {
    pub row: usize,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{} field(s) rejected: {}", .rejected.len(), join(.rejected))]
    ValidationMismatch { rejected: Vec<Rejection> },

    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("service reported failure: {message}")]
    ServiceFailure {
        message: String,
        inserted: u32,
        updated: u32,
    },

    #[error("service did not confirm a single record (inserted {inserted}, updated {updated})")]
    Unconfirmed { inserted: u32, updated: u32 },

    #[error("no records to import")]
    EmptyBatch,

    #[error("{} row(s) rejected, first at row {}", .rows.len(), first_row(.rows))]
    RowsRejected { rows: Vec<RowRejection> },

    #[error("row {row} has different fields from row 0")]
    InconsistentColumns { row: usize },

    #[error("list name must not be empty")]
    InvalidListName,

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

impl SubmitError {
    /// Short, stable label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationMismatch { .. } => "validation_mismatch",
            Self::Authentication(_) => "authentication",
            Self::Transport(_) => "transport",
            Self::ServiceFailure { .. } => "service_failure",
            Self::Unconfirmed { .. } => "unconfirmed",
            Self::EmptyBatch => "empty_batch",
            Self::RowsRejected { .. } => "rows_rejected",
            Self::InconsistentColumns { .. } => "inconsistent_columns",
            Self::InvalidListName => "invalid_list_name",
            Self::Csv(_) => "csv",
        }
    }
}

fn join(rejected: &[Rejection]) -> String {
    rejected
        .iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn first_row(rows: &[RowRejection]) -> usize {
    rows.first().map(|r| r.row).unwrap_or_default()
}
