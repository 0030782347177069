//! Contract with the remote list service and its authentication provider.
//!
//! Wire types mirror the service's RPC messages: camelCase field names,
//! SCREAMING_SNAKE_CASE mode constants, and responses wrapped in a
//! `{"return": ...}` envelope.

use std::fmt;

use async_trait::async_trait;
use leadlist_core::MappedField;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, TransportError};

/// Login for the remote service. `Debug` never prints the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How the service treats records with no matching contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrmAddMode {
    AddNew,
    DontAdd,
}

/// How the service treats records that match existing contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrmUpdateMode {
    UpdateFirst,
    UpdateAll,
    UpdateSoleMatches,
    DontUpdate,
}

/// Which matched contacts are added to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListAddMode {
    AddFirst,
    AddAll,
    AddIfSoleCrmMatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUpdateSettings {
    pub fields_mapping: Vec<MappedField>,
    pub skip_header_line: bool,
    pub clean_list_before_update: bool,
    pub crm_add_mode: CrmAddMode,
    pub crm_update_mode: CrmUpdateMode,
    pub list_add_mode: ListAddMode,
}

impl ListUpdateSettings {
    /// Fixed update policy for lead submissions: add unknown contacts, update
    /// a contact only when exactly one matches, never wipe the list first.
    pub fn lead_policy(fields_mapping: Vec<MappedField>) -> Self {
        Self {
            fields_mapping,
            skip_header_line: false,
            clean_list_before_update: false,
            crm_add_mode: CrmAddMode::AddNew,
            crm_update_mode: CrmUpdateMode::UpdateSoleMatches,
            list_add_mode: ListAddMode::AddIfSoleCrmMatch,
        }
    }
}

/// `AddRecordToList` request: one positional record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecordQuery {
    pub list_name: String,
    pub list_update_settings: ListUpdateSettings,
    pub record: Vec<String>,
}

/// `AddRecordToList` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResult {
    #[serde(default)]
    pub failure_message: Option<String>,
    #[serde(default)]
    pub crm_records_updated: u32,
    #[serde(default)]
    pub crm_records_inserted: u32,
}

impl RecordResult {
    /// The failure message, if the service sent a non-empty one.
    pub fn failure(&self) -> Option<&str> {
        self.failure_message.as_deref().filter(|m| !m.is_empty())
    }

    /// Exactly one contact was inserted or exactly one was updated.
    pub fn affected_one(&self) -> bool {
        self.crm_records_inserted == 1 || self.crm_records_updated == 1
    }
}

/// `AddToListCsv` request: many records as headerless CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCsvQuery {
    pub list_name: String,
    pub list_update_settings: ListUpdateSettings,
    pub csv_data: String,
}

/// Handle for an asynchronous import started by `AddToListCsv`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportIdentifier {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListQuery {
    pub list_name: String,
}

/// Response envelope used by every RPC method.
#[derive(Debug, Deserialize)]
pub struct RpcReturn<T> {
    #[serde(rename = "return")]
    pub value: T,
}

/// The remote list service, already authenticated.
#[async_trait]
pub trait ListService: Send + Sync {
    async fn add_record_to_list(
        &self,
        query: &AddRecordQuery,
    ) -> Result<RecordResult, TransportError>;

    async fn add_to_list_csv(&self, query: &AddCsvQuery)
    -> Result<ImportIdentifier, TransportError>;

    async fn create_list(&self, query: &CreateListQuery) -> Result<(), TransportError>;
}

/// Produces authenticated [`ListService`] handles.
#[async_trait]
pub trait Authenticator: Send + Sync {
    type Service: ListService;

    async fn authenticate(&self, credentials: &Credentials) -> Result<Self::Service, AuthError>;
}
