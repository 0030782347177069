//! Lead record preparation: field schema, scrubbing, and column mapping.

pub mod mapping;
pub mod record;
pub mod schema;
pub mod scrub;

pub use mapping::{MappedField, map_fields, positional};
pub use record::{CleanRecord, RawRecord};
pub use schema::{FieldKind, FieldSchema, FieldSpec, SchemaError};
pub use scrub::{RejectReason, Rejection, Scrubbed, scrub, scrub_with_report};
