//! Lead submission: scrub, authenticate, route, map, send, and interpret.
//!
//! A submission is a straight pipeline with no re-entry:
//!
//! ```text
//! scrub ─┬─ rejected ──────────────────────────────► ValidationMismatch
//!        └─ complete ─ authenticate ─┬─ failed ────► Authentication
//!                                    └─ ok ─ map ─ route ─ send ─┬─► receipt
//!                                                                ├─► ServiceFailure / Unconfirmed
//!                                                                └─► Transport
//! ```
//!
//! The service is only called once a record has survived scrubbing intact.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use leadlist_core::{
    CleanRecord, FieldSchema, RawRecord, map_fields, positional, scrub_with_report,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{RowRejection, SubmitError};
use crate::retry::{CircuitBreaker, RetryPolicy};
use crate::service::{
    AddCsvQuery, AddRecordQuery, Authenticator, CreateListQuery, Credentials, ListService,
    ListUpdateSettings, RecordResult,
};

/// First column number the remote service expects, for records and CSV alike.
pub const START_INDEX: u32 = 1;

pub type SubmissionOutcome = Result<SubmissionReceipt, SubmitError>;

/// Confirmation that the service inserted or updated exactly one contact.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub list_name: String,
    pub inserted: u32,
    pub updated: u32,
    pub submitted_at: DateTime<Utc>,
}

/// A bulk import accepted by the service for background processing.
#[derive(Debug, Clone, Serialize)]
pub struct CsvImportReceipt {
    pub list_name: String,
    pub rows: usize,
    pub identifier: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Records carrying this field are routed to `member_list`.
    pub member_key: String,
    pub member_list: String,
    pub retry: RetryPolicy,
    pub breaker_threshold: u32,
    pub breaker_cooldown: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            member_key: "member_id".to_string(),
            member_list: "members-oep".to_string(),
            retry: RetryPolicy::default(),
            breaker_threshold: 5,
            breaker_cooldown: Duration::from_secs(30),
        }
    }
}

/// Sends leads to the remote list service.
///
/// Holds the shared schema, the login, and a circuit breaker that spans every
/// call made through this submitter. Each submission is otherwise independent.
pub struct Submitter<A> {
    schema: Arc<FieldSchema>,
    authenticator: A,
    credentials: Credentials,
    config: SubmitterConfig,
    breaker: CircuitBreaker,
}

impl<A: Authenticator> Submitter<A> {
    pub fn new(
        schema: Arc<FieldSchema>,
        authenticator: A,
        credentials: Credentials,
        config: SubmitterConfig,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.breaker_threshold, config.breaker_cooldown);
        Self {
            schema,
            authenticator,
            credentials,
            config,
            breaker,
        }
    }

    /// The list a record goes to: the member list when the record carries the
    /// member key, otherwise `default_list`.
    pub fn target_list<'a>(&'a self, clean: &CleanRecord, default_list: &'a str) -> &'a str {
        if clean.contains_key(&self.config.member_key) {
            &self.config.member_list
        } else {
            default_list
        }
    }

    /// Build the `AddRecordToList` request for an already-scrubbed record.
    pub fn build_record_query(&self, clean: &CleanRecord, default_list: &str) -> AddRecordQuery {
        let (mapping, record) = positional(clean, &self.schema, START_INDEX);
        AddRecordQuery {
            list_name: self.target_list(clean, default_list).to_string(),
            list_update_settings: ListUpdateSettings::lead_policy(mapping),
            record,
        }
    }

    /// Submit one lead.
    pub async fn add_record_to_list(
        &self,
        raw: &RawRecord,
        default_list: &str,
    ) -> SubmissionOutcome {
        let scrubbed = scrub_with_report(&self.schema, raw);
        if scrubbed.clean.len() != raw.len() {
            warn!(
                rejected = scrubbed.rejected.len(),
                fields = raw.len(),
                "record failed scrubbing"
            );
            return Err(SubmitError::ValidationMismatch {
                rejected: scrubbed.rejected,
            });
        }

        let service = self.authenticator.authenticate(&self.credentials).await?;

        let query = self.build_record_query(&scrubbed.clean, default_list);
        info!(list = %query.list_name, fields = query.record.len(), "submitting record");

        let result = self
            .config
            .retry
            .run("AddRecordToList", &self.breaker, || {
                service.add_record_to_list(&query)
            })
            .await?;

        interpret(&query.list_name, result)
    }

    /// Submit many leads as one headerless CSV import.
    ///
    /// Every record must scrub cleanly and carry the same fields in the same
    /// order, since one column mapping covers all rows.
    pub async fn add_records_csv(
        &self,
        records: &[RawRecord],
        default_list: &str,
    ) -> Result<CsvImportReceipt, SubmitError> {
        let rows = self.scrub_rows(records)?;

        let service = self.authenticator.authenticate(&self.credentials).await?;

        let query = self.build_csv_query(&rows, default_list)?;
        info!(list = %query.list_name, rows = rows.len(), "importing records");

        let imported = self
            .config
            .retry
            .run("AddToListCsv", &self.breaker, || service.add_to_list_csv(&query))
            .await?;

        info!(identifier = %imported.identifier, "import accepted");
        Ok(CsvImportReceipt {
            list_name: query.list_name,
            rows: rows.len(),
            identifier: imported.identifier,
            submitted_at: Utc::now(),
        })
    }

    /// Create an empty list on the remote service.
    pub async fn create_list(&self, name: &str) -> Result<(), SubmitError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SubmitError::InvalidListName);
        }

        let service = self.authenticator.authenticate(&self.credentials).await?;

        let query = CreateListQuery {
            list_name: name.to_string(),
        };
        info!(list = %name, "creating list");
        self.config
            .retry
            .run("CreateList", &self.breaker, || service.create_list(&query))
            .await?;
        Ok(())
    }

    fn scrub_rows(&self, records: &[RawRecord]) -> Result<Vec<CleanRecord>, SubmitError> {
        if records.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }

        let mut rows = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();
        for (row, raw) in records.iter().enumerate() {
            let scrubbed = scrub_with_report(&self.schema, raw);
            if scrubbed.is_complete() {
                rows.push(scrubbed.clean);
            } else {
                rejected.push(RowRejection {
                    row,
                    rejected: scrubbed.rejected,
                });
            }
        }
        if !rejected.is_empty() {
            warn!(rows = rejected.len(), "rows failed scrubbing");
            return Err(SubmitError::RowsRejected { rows: rejected });
        }

        let Some(first) = rows.first() else {
            return Err(SubmitError::EmptyBatch);
        };
        if first.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }
        if let Some(row) = rows.iter().position(|r| !r.keys().eq(first.keys())) {
            return Err(SubmitError::InconsistentColumns { row });
        }
        Ok(rows)
    }

    fn build_csv_query(
        &self,
        rows: &[CleanRecord],
        default_list: &str,
    ) -> Result<AddCsvQuery, SubmitError> {
        let Some(first) = rows.first() else {
            return Err(SubmitError::EmptyBatch);
        };
        let mapping = map_fields(first, &self.schema, START_INDEX);
        Ok(AddCsvQuery {
            list_name: self.target_list(first, default_list).to_string(),
            list_update_settings: ListUpdateSettings::lead_policy(mapping),
            csv_data: encode_csv(rows)?,
        })
    }
}

/// Turn the service's answer into an outcome.
///
/// A non-empty failure message always wins, even when the counts report an
/// affected record.
pub fn interpret(list_name: &str, result: RecordResult) -> SubmissionOutcome {
    let inserted = result.crm_records_inserted;
    let updated = result.crm_records_updated;

    if let Some(message) = result.failure() {
        warn!(list = %list_name, %message, inserted, updated, "service reported failure");
        return Err(SubmitError::ServiceFailure {
            message: message.to_string(),
            inserted,
            updated,
        });
    }

    if result.affected_one() {
        info!(list = %list_name, inserted, updated, "record accepted");
        return Ok(SubmissionReceipt {
            list_name: list_name.to_string(),
            inserted,
            updated,
            submitted_at: Utc::now(),
        });
    }

    warn!(list = %list_name, inserted, updated, "service did not confirm record");
    Err(SubmitError::Unconfirmed { inserted, updated })
}

fn encode_csv(rows: &[CleanRecord]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    for row in rows {
        writer.write_record(row.iter().map(|(_, value)| value))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
