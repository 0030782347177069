//! Remote list service contract, lead submission, and transport policy.

pub mod error;
pub mod retry;
pub mod service;
pub mod submit;

#[cfg(feature = "http")]
pub mod http;

pub use error::{AuthError, RowRejection, SubmitError, TransportError};
pub use retry::{CircuitBreaker, RetryPolicy};
pub use service::{
    AddCsvQuery, AddRecordQuery, Authenticator, CreateListQuery, Credentials, CrmAddMode,
    CrmUpdateMode, ImportIdentifier, ListAddMode, ListService, ListUpdateSettings, RecordResult,
};
pub use submit::{
    CsvImportReceipt, START_INDEX, SubmissionOutcome, SubmissionReceipt, Submitter,
    SubmitterConfig, interpret,
};

#[cfg(feature = "http")]
pub use http::{HttpAuthenticator, HttpListService};
