//! Command implementations for the `leadlist` binary.

use std::path::Path;

use anyhow::{Context, bail};
use leadlist_core::{FieldSchema, RawRecord, positional, scrub_with_report};
use leadlist_sync::{Authenticator, SubmitError, Submitter};

use crate::display;

/// Parse a `name=value` pair from the command line.
pub fn parse_field(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty field name in `{s}`"));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Build a raw record from a JSON file or from `--field` pairs.
pub fn read_record(
    path: Option<&Path>,
    fields: &[(String, String)],
) -> anyhow::Result<RawRecord> {
    match path {
        Some(path) => load_json(path),
        None => Ok(fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
            .collect()),
    }
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))
}

/// Scrub a record without contacting the service.
pub fn scrub(schema: &FieldSchema, record: &Path) -> anyhow::Result<()> {
    let raw: RawRecord = load_json(record)?;
    let scrubbed = scrub_with_report(schema, &raw);
    let (mapping, _) = positional(&scrubbed.clean, schema, leadlist_sync::START_INDEX);

    display::print_mapping(&scrubbed.clean, &mapping, schema);
    if !scrubbed.is_complete() {
        println!();
        println!("rejected {} of {} field(s):", scrubbed.rejected.len(), raw.len());
        display::print_rejections(&scrubbed.rejected);
        bail!("record would be rejected");
    }
    Ok(())
}

pub async fn submit<A: Authenticator>(
    submitter: &Submitter<A>,
    raw: &RawRecord,
    list: &str,
) -> anyhow::Result<()> {
    match submitter.add_record_to_list(raw, list).await {
        Ok(receipt) => display::print_json(&receipt),
        Err(err) => {
            if let SubmitError::ValidationMismatch { rejected } = &err {
                display::print_rejections(rejected);
            }
            Err(err).context("submission failed")
        }
    }
}

pub async fn import_csv<A: Authenticator>(
    submitter: &Submitter<A>,
    records: &Path,
    list: &str,
) -> anyhow::Result<()> {
    let records: Vec<RawRecord> = load_json(records)?;
    match submitter.add_records_csv(&records, list).await {
        Ok(receipt) => display::print_json(&receipt),
        Err(err) => {
            if let SubmitError::RowsRejected { rows } = &err {
                display::print_row_rejections(rows);
            }
            Err(err).context("import failed")
        }
    }
}

pub async fn create_list<A: Authenticator>(
    submitter: &Submitter<A>,
    name: &str,
) -> anyhow::Result<()> {
    submitter
        .create_list(name)
        .await
        .with_context(|| format!("creating list `{name}`"))?;
    display::print_json(&serde_json::json!({ "created": name.trim() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn parse_field_splits_on_first_equals() {
        assert_eq!(
            parse_field("first_name=Grace").unwrap(),
            ("first_name".to_string(), "Grace".to_string())
        );
        assert_eq!(
            parse_field("note=a=b").unwrap(),
            ("note".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn parse_field_rejects_missing_equals() {
        assert!(parse_field("first_name").is_err());
        assert!(parse_field("=Grace").is_err());
    }

    #[test]
    fn read_record_from_fields_keeps_order() {
        let fields = vec![
            ("zip".to_string(), "10001".to_string()),
            ("state".to_string(), "NY".to_string()),
        ];
        let raw = read_record(None, &fields).unwrap();
        let keys: Vec<&str> = raw.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zip", "state"]);
        assert_eq!(raw.get("zip"), Some(&json!("10001")));
    }

    fn json_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn read_record_from_file() {
        let file = json_file(r#"{"state": "NY", "zip": 10001}"#);
        let raw = read_record(Some(file.path()), &[]).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.get("zip"), Some(&json!(10001)));
    }

    #[test]
    fn read_record_rejects_json_array() {
        let file = json_file(r#"[{"state": "NY"}]"#);
        assert!(read_record(Some(file.path()), &[]).is_err());
    }

    #[test]
    fn scrub_passes_clean_record() {
        let file = json_file(r#"{"first_name": "Grace", "number1": "(555) 123-4567"}"#);
        assert!(scrub(&FieldSchema::lead_default(), file.path()).is_ok());
    }

    #[test]
    fn scrub_fails_on_rejected_field() {
        let file = json_file(r#"{"state": "New York"}"#);
        assert!(scrub(&FieldSchema::lead_default(), file.path()).is_err());
    }
}
