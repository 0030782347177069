//! Field schema for contact-list lead records.
//!
//! Every field the remote contact list recognises is described by a
//! [`FieldSpec`]: its value kind, inclusive bounds on the length of its
//! textual form, and whether the remote service matches contacts on it.
//! A [`FieldSchema`] is built once at startup and handed by reference to the
//! scrubber, the mapper, and the submitter.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("schema has no fields")]
    Empty,
    #[error("field name must not be empty")]
    EmptyName,
    #[error("duplicate field name: {0}")]
    DuplicateField(String),
    #[error("field {name}: min_length {min} exceeds max_length {max}")]
    InvertedBounds { name: String, min: usize, max: usize },
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Value kind accepted for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Must arrive as a string; stored verbatim.
    Text,
    /// Any textual form; non-digits are stripped before storage.
    Phone,
    /// Textual form must parse as a number; stored verbatim.
    Integer,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Phone => "phone",
            Self::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub min_length: usize,
    pub max_length: usize,
    #[serde(default)]
    pub is_key: bool,
}

impl FieldSpec {
    pub fn new(name: &str, kind: FieldKind, min_length: usize, max_length: usize) -> Self {
        Self {
            name: name.to_string(),
            kind,
            min_length,
            max_length,
            is_key: false,
        }
    }

    /// Mark this field as a match key for the remote service.
    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    /// Whether a textual length falls inside `[min_length, max_length]`.
    pub fn accepts_length(&self, len: usize) -> bool {
        len >= self.min_length && len <= self.max_length
    }
}

/// Immutable, ordered set of recognised fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<FieldSpec>,
}

impl FieldSchema {
    /// Build a schema, rejecting empty or duplicate names and inverted bounds.
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for spec in &fields {
            if spec.name.is_empty() {
                return Err(SchemaError::EmptyName);
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SchemaError::DuplicateField(spec.name.clone()));
            }
            if spec.min_length > spec.max_length {
                return Err(SchemaError::InvertedBounds {
                    name: spec.name.clone(),
                    min: spec.min_length,
                    max: spec.max_length,
                });
            }
        }
        Ok(Self { fields })
    }

    /// The contact-list fields recognised out of the box.
    pub fn lead_default() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("first_name", FieldKind::Text, 3, 100),
                FieldSpec::new("last_name", FieldKind::Text, 3, 100),
                FieldSpec::new("number1", FieldKind::Phone, 10, 14).key(),
                FieldSpec::new("number2", FieldKind::Phone, 10, 14),
                FieldSpec::new("state", FieldKind::Text, 2, 2),
                FieldSpec::new("zip", FieldKind::Integer, 5, 5),
                FieldSpec::new("member_id", FieldKind::Integer, 5, 20),
            ],
        }
    }

    /// Parse a JSON array of field specs.
    pub fn from_json_str(json: &str) -> Result<Self, SchemaError> {
        let fields: Vec<FieldSpec> = serde_json::from_str(json)?;
        Self::new(fields)
    }

    /// Load a schema from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
