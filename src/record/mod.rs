//! Record shapes flowing through the pipeline.
//!
//! - `RawRecord` - one source row keyed by arbitrary column names
//! - `ColumnMapping` - caller-supplied canonical field to column association
//! - `CanonicalRecord` - a row keyed by canonical fields only

pub mod normalize;

pub use normalize::{normalize_label, normalize_record, suggest_mapping};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::catalog::CanonicalField;

/// A single cell as delivered by a record source.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Empty,
}

impl RawValue {
    /// Build a text value, mapping the empty string to `Empty`.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Number(_) => false,
            Self::Empty => true,
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::String(text) => Self::text(text),
            serde_json::Value::Number(number) => match number.as_f64() {
                Some(n) => Self::Number(n),
                None => Self::Text(number.to_string()),
            },
            serde_json::Value::Bool(flag) => Self::Text(if flag { "TRUE" } else { "FALSE" }.into()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Empty => Ok(()),
        }
    }
}

/// One input row; column order is the source's column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    cells: Vec<(String, RawValue)>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zip a header row with a data row. Short rows are padded with `Empty`,
    /// cells beyond the header row are dropped.
    pub fn from_row<I>(headers: &[String], row: I) -> Self
    where
        I: IntoIterator<Item = RawValue>,
    {
        let mut values = row.into_iter();
        let cells = headers
            .iter()
            .map(|header| (header.clone(), values.next().unwrap_or(RawValue::Empty)))
            .collect();
        Self { cells }
    }

    pub fn push(&mut self, column: impl Into<String>, value: RawValue) {
        self.cells.push((column.into(), value));
    }

    /// First cell whose column name matches exactly.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawRecord {
    fn from_iter<T: IntoIterator<Item = (K, RawValue)>>(iter: T) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Canonical field to source column label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping(BTreeMap<CanonicalField, String>);

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: CanonicalField, column: impl Into<String>) -> Self {
        self.insert(field, column);
        self
    }

    pub fn insert(&mut self, field: CanonicalField, column: impl Into<String>) {
        self.0.insert(field, column.into());
    }

    /// Mapped column for `field`, ignoring blank entries.
    pub fn column_for(&self, field: CanonicalField) -> Option<&str> {
        self.0
            .get(&field)
            .map(String::as_str)
            .filter(|column| !column.trim().is_empty())
    }

    /// Number of fields mapped to a non-blank column.
    pub fn mapped_count(&self) -> usize {
        CanonicalField::ALL
            .iter()
            .filter(|field| self.column_for(**field).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.mapped_count() == 0
    }

    pub fn as_map(&self) -> &BTreeMap<CanonicalField, String> {
        &self.0
    }
}

impl FromIterator<(CanonicalField, String)> for ColumnMapping {
    fn from_iter<T: IntoIterator<Item = (CanonicalField, String)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Value of a canonical field. `Missing` marks a field the source never
/// supplied and is distinct from an empty cell.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Present(RawValue),
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Rendered text, or `None` when the value is missing or blank.
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Present(value) if !value.is_blank() => Some(value.to_string()),
            _ => None,
        }
    }
}

static MISSING: FieldValue = FieldValue::Missing;

/// A record holding exactly the requested canonical keys, in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    fields: Vec<(CanonicalField, FieldValue)>,
}

impl CanonicalRecord {
    pub(crate) fn from_fields(fields: Vec<(CanonicalField, FieldValue)>) -> Self {
        Self { fields }
    }

    /// Value of `field`; fields outside the key set read as `Missing`.
    pub fn get(&self, field: CanonicalField) -> &FieldValue {
        self.fields
            .iter()
            .find(|(key, _)| *key == field)
            .map(|(_, value)| value)
            .unwrap_or(&MISSING)
    }

    pub fn keys(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.fields.iter().map(|(key, _)| *key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (*key, value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
