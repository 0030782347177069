//! Validate and normalise a raw lead against the field schema.
//!
//! Scrubbing drops rather than aborts: an entry that fails any rule is left
//! out of the [`CleanRecord`] and the rest of the record carries on. Callers
//! detect loss by comparing sizes, and [`scrub_with_report`] says why each
//! entry was dropped.
//!
//! Rules, applied in order per entry:
//!
//! 1. the field name must exist in the schema
//! 2. the value must have a textual form (string or number)
//! 3. the textual length must fall inside the field's bounds
//! 4. kind-specific checks:
//!    - `Text`: must be a JSON string, kept verbatim
//!    - `Phone`: non-digits stripped; bounds apply to the unstripped text
//!    - `Integer`: must parse as a finite number, kept verbatim

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::record::{CleanRecord, RawRecord};
use crate::schema::{FieldKind, FieldSchema, FieldSpec};

/// Why a single entry was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    UnknownField,
    NotScalar,
    TooShort { len: usize, min: usize },
    TooLong { len: usize, max: usize },
    NotText,
    NotNumeric,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField => write!(f, "unknown field"),
            Self::NotScalar => write!(f, "value is not a string or number"),
            Self::TooShort { len, min } => write!(f, "length {len} below minimum {min}"),
            Self::TooLong { len, max } => write!(f, "length {len} above maximum {max}"),
            Self::NotText => write!(f, "value is not text"),
            Self::NotNumeric => write!(f, "value is not numeric"),
        }
    }
}

/// A dropped entry with its original value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub field: String,
    pub value: Value,
    #[serde(flatten)]
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Result of [`scrub_with_report`].
#[derive(Debug, Clone, Default)]
pub struct Scrubbed {
    pub clean: CleanRecord,
    pub rejected: Vec<Rejection>,
}

impl Scrubbed {
    /// True when no entry was dropped.
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Scrub a raw record, discarding the rejection details.
pub fn scrub(schema: &FieldSchema, raw: &RawRecord) -> CleanRecord {
    scrub_with_report(schema, raw).clean
}

/// Scrub a raw record and report every dropped entry.
pub fn scrub_with_report(schema: &FieldSchema, raw: &RawRecord) -> Scrubbed {
    let mut out = Scrubbed::default();

    for (name, value) in raw.iter() {
        let checked = match schema.get(name) {
            Some(spec) => scrub_value(spec, value),
            None => Err(RejectReason::UnknownField),
        };
        match checked {
            Ok(clean) => out.clean.push(name.clone(), clean),
            Err(reason) => {
                debug!(field = %name, %reason, "dropping field");
                out.rejected.push(Rejection {
                    field: name.clone(),
                    value: value.clone(),
                    reason,
                });
            }
        }
    }

    out
}

fn scrub_value(spec: &FieldSpec, value: &Value) -> Result<String, RejectReason> {
    let text = textual(value).ok_or(RejectReason::NotScalar)?;

    let len = text.len();
    if len < spec.min_length {
        return Err(RejectReason::TooShort {
            len,
            min: spec.min_length,
        });
    }
    if len > spec.max_length {
        return Err(RejectReason::TooLong {
            len,
            max: spec.max_length,
        });
    }

    match spec.kind {
        FieldKind::Text if value.is_string() => Ok(text),
        FieldKind::Text => Err(RejectReason::NotText),
        FieldKind::Phone => Ok(text.chars().filter(char::is_ascii_digit).collect()),
        FieldKind::Integer if is_numeric(&text) => Ok(text),
        FieldKind::Integer => Err(RejectReason::NotNumeric),
    }
}

/// Textual form of a scalar JSON value.
fn textual(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts signed integers, decimals, and exponent forms; rejects inf/NaN.
fn is_numeric(text: &str) -> bool {
    text.trim()
        .parse::<f64>()
        .map(f64::is_finite)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_lead() -> RawRecord {
        RawRecord::new()
            .with("first_name", "Grace")
            .with("last_name", "Hopper")
            .with("number1", "(555) 123-4567")
            .with("state", "NY")
            .with("zip", "10001")
    }

    fn reason_for(scrubbed: &Scrubbed, field: &str) -> RejectReason {
        scrubbed
            .rejected
            .iter()
            .find(|r| r.field == field)
            .map(|r| r.reason.clone())
            .unwrap_or_else(|| panic!("no rejection for {field}"))
    }

    #[test]
    fn valid_record_keeps_every_field() {
        let schema = FieldSchema::lead_default();
        let raw = valid_lead();
        let scrubbed = scrub_with_report(&schema, &raw);
        assert!(scrubbed.is_complete());
        assert_eq!(scrubbed.clean.len(), raw.len());
        let raw_keys: Vec<&str> = raw.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(scrubbed.clean.keys().collect::<Vec<_>>(), raw_keys);
    }

    #[test]
    fn phone_is_stripped_but_bounded_before_stripping() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new().with("number1", "(555) 123-4567");
        let clean = scrub(&schema, &raw);
        assert_eq!(clean.get("number1"), Some("5551234567"));
    }

    #[test]
    fn phone_too_long_before_stripping_is_dropped() {
        let schema = FieldSchema::lead_default();
        // 16 chars raw, 10 digits stripped.
        let raw = RawRecord::new().with("number2", "+1 (555) 123-456");
        let scrubbed = scrub_with_report(&schema, &raw);
        assert!(scrubbed.clean.is_empty());
        assert_eq!(
            reason_for(&scrubbed, "number2"),
            RejectReason::TooLong { len: 16, max: 14 }
        );
    }

    #[test]
    fn phone_accepts_numeric_json() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new().with("number1", json!(5551234567u64));
        assert_eq!(scrub(&schema, &raw).get("number1"), Some("5551234567"));
    }

    #[test]
    fn unknown_field_dropped() {
        let schema = FieldSchema::lead_default();
        let raw = valid_lead().with("email", "grace@example.com");
        let scrubbed = scrub_with_report(&schema, &raw);
        assert_eq!(scrubbed.clean.len(), raw.len() - 1);
        assert_eq!(reason_for(&scrubbed, "email"), RejectReason::UnknownField);
    }

    #[test]
    fn short_text_dropped() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new().with("first_name", "Al");
        let scrubbed = scrub_with_report(&schema, &raw);
        assert_eq!(
            reason_for(&scrubbed, "first_name"),
            RejectReason::TooShort { len: 2, min: 3 }
        );
    }

    #[test]
    fn numeric_value_for_text_field_dropped() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new().with("last_name", json!(12345));
        let scrubbed = scrub_with_report(&schema, &raw);
        assert_eq!(reason_for(&scrubbed, "last_name"), RejectReason::NotText);
    }

    #[test]
    fn integer_accepts_number_and_numeric_string() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new()
            .with("zip", json!(90210))
            .with("member_id", "0012345");
        let clean = scrub(&schema, &raw);
        assert_eq!(clean.get("zip"), Some("90210"));
        assert_eq!(clean.get("member_id"), Some("0012345"));
    }

    #[test]
    fn integer_rejects_non_numeric() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new().with("zip", "9021A");
        let scrubbed = scrub_with_report(&schema, &raw);
        assert_eq!(reason_for(&scrubbed, "zip"), RejectReason::NotNumeric);
    }

    #[test]
    fn integer_rejects_infinity_spelling() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new().with("member_id", "infinity");
        let scrubbed = scrub_with_report(&schema, &raw);
        assert_eq!(reason_for(&scrubbed, "member_id"), RejectReason::NotNumeric);
    }

    #[test]
    fn non_scalar_values_dropped() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new()
            .with("state", json!(null))
            .with("zip", json!(true))
            .with("first_name", json!(["Ada"]));
        let scrubbed = scrub_with_report(&schema, &raw);
        assert!(scrubbed.clean.is_empty());
        assert_eq!(scrubbed.rejected.len(), 3);
        assert!(
            scrubbed
                .rejected
                .iter()
                .all(|r| r.reason == RejectReason::NotScalar)
        );
    }

    #[test]
    fn one_bad_field_does_not_abort_record() {
        let schema = FieldSchema::lead_default();
        let raw = valid_lead().with("state", "New York");
        let scrubbed = scrub_with_report(&schema, &raw);
        assert_eq!(scrubbed.clean.len(), 4);
        assert_eq!(scrubbed.rejected.len(), 1);
        assert_eq!(scrubbed.rejected[0].value, json!("New York"));
    }

    #[test]
    fn order_follows_raw_record_not_schema() {
        let schema = FieldSchema::lead_default();
        let raw = RawRecord::new()
            .with("zip", "10001")
            .with("bogus", "x")
            .with("first_name", "Grace");
        let clean = scrub(&schema, &raw);
        assert_eq!(clean.keys().collect::<Vec<_>>(), vec!["zip", "first_name"]);
    }

    #[test]
    fn scrubbing_clean_record_is_idempotent() {
        let schema = FieldSchema::lead_default();
        let once = scrub(&schema, &valid_lead().with("member_id", json!(123456)));
        let twice = scrub(&schema, &RawRecord::from(&once));
        assert_eq!(once, twice);
    }

    #[test]
    fn rejection_display_names_field() {
        let rejection = Rejection {
            field: "zip".into(),
            value: json!("1"),
            reason: RejectReason::TooShort { len: 1, min: 5 },
        };
        assert_eq!(rejection.to_string(), "zip: length 1 below minimum 5");
    }

    #[test]
    fn rejection_serializes_flat() {
        let rejection = Rejection {
            field: "email".into(),
            value: json!("a@b.c"),
            reason: RejectReason::UnknownField,
        };
        let json = serde_json::to_value(&rejection).unwrap();
        assert_eq!(
            json,
            json!({"field": "email", "value": "a@b.c", "reason": "unknown_field"})
        );
    }
}
