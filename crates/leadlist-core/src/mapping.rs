//! Column mapping for the remote service's positional record format.
//!
//! The remote list matches values to fields by column number, not by name, so
//! the mapping and the flattened value array must come from the same pass over
//! the [`CleanRecord`].

use serde::{Deserialize, Serialize};

use crate::record::CleanRecord;
use crate::schema::FieldSchema;

/// One column of the positional record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedField {
    pub column_number: u64,
    pub field_name: String,
    /// Whether the remote service matches existing contacts on this column.
    pub key: bool,
}

/// Number each field of `clean` consecutively from `start_index`.
///
/// Column numbers are widened to `u64`, so any `u32` start is valid.
///
/// Fields absent from `schema` are never present in a `CleanRecord`; should
/// one appear through a foreign schema it is mapped as a non-key column.
pub fn map_fields(clean: &CleanRecord, schema: &FieldSchema, start_index: u32) -> Vec<MappedField> {
    clean
        .keys()
        .zip(u64::from(start_index)..)
        .map(|(name, column_number)| MappedField {
            column_number,
            field_name: name.to_string(),
            key: schema.get(name).is_some_and(|spec| spec.is_key),
        })
        .collect()
}

/// Column mapping together with the values in matching column order.
pub fn positional(
    clean: &CleanRecord,
    schema: &FieldSchema,
    start_index: u32,
) -> (Vec<MappedField>, Vec<String>) {
    (map_fields(clean, schema, start_index), clean.values())
}
