//! Terminal rendering for scrub reports, outcomes, and rejections.

use leadlist_core::{CleanRecord, FieldSchema, MappedField, Rejection};
use leadlist_sync::RowRejection;
use serde::Serialize;

const LABEL_WIDTH: usize = 14;

/// Print the column mapping of a clean record next to its values.
pub fn print_mapping(clean: &CleanRecord, mapping: &[MappedField], schema: &FieldSchema) {
    if mapping.is_empty() {
        println!("(no fields)");
        return;
    }
    println!(
        "{:>4}  {:<LABEL_WIDTH$} {:<8} {:<3}  value",
        "col", "field", "kind", "key"
    );
    for field in mapping {
        let value = clean.get(&field.field_name).unwrap_or_default();
        let kind = schema
            .get(&field.field_name)
            .map_or("?", |spec| spec.kind.as_str());
        println!(
            "{:>4}  {:<LABEL_WIDTH$} {:<8} {:<3}  {}",
            field.column_number,
            field.field_name,
            kind,
            if field.key { "yes" } else { "" },
            value
        );
    }
}

/// Print dropped fields, one per line.
pub fn print_rejections(rejected: &[Rejection]) {
    for rejection in rejected {
        println!(
            "  {:<LABEL_WIDTH$} {} (got {})",
            rejection.field, rejection.reason, rejection.value
        );
    }
}

pub fn print_row_rejections(rows: &[RowRejection]) {
    for row in rows {
        println!("row {}", row.row);
        print_rejections(&row.rejected);
    }
}

pub fn pretty_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Print a receipt or other outcome as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", pretty_json(value)?);
    Ok(())
}
