//! Loosely-typed records exchanged with the survey endpoint
//!
//! The endpoint is backed by spreadsheet tabs, so every row is a bag of
//! scalar cells whose column names are not guaranteed. [`Row`] keeps the
//! cells as [`FieldValue`]s and offers the few defensive accessors the
//! hierarchy code needs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

static ABSENT: FieldValue = FieldValue::Absent;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// Null or missing
    #[default]
    Absent,
    /// String cell (nested JSON is kept here as compact text)
    Text(String),
    /// Numeric cell
    Number(f64),
    /// Boolean cell
    Bool(bool),
}

impl FieldValue {
    /// Render the cell as text the way the endpoint's own platform would.
    ///
    /// Integral numbers carry no fractional part (`3`, not `3.0`).
    pub fn render(&self) -> Option<String> {
        match self {
            FieldValue::Absent => None,
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Bool(b) => Some(b.to_string()),
        }
    }

    /// Whether the cell counts as "set": non-empty text, non-zero number, `true`.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Absent => false,
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Number(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Bool(b) => *b,
        }
    }

    /// Numeric reading of the cell; `None` when absent or not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Absent => None,
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Number(_) => None,
            FieldValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Some(0.0)
                } else {
                    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
                }
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => FieldValue::Absent,
            Value::Bool(b) => FieldValue::Bool(b),
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Number)
                .unwrap_or_else(|| FieldValue::Text(n.to_string())),
            Value::String(s) => FieldValue::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Absent => Value::Null,
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    Value::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                }
            }
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FieldValue::from)
    }
}

/// One record of a hierarchy table (panchayat, village, SHG, beneficiary,
/// enterprise, mapping row, user).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, FieldValue>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert a JSON value into a row; only objects qualify.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(
                map.into_iter()
                    .map(|(k, v)| (k, FieldValue::from(v)))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Convert every object element of a JSON array, skipping the rest.
    pub fn from_array(values: Vec<Value>) -> Vec<Self> {
        values.into_iter().filter_map(Self::from_value).collect()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect(),
        )
    }

    /// Cell for `key`, [`FieldValue::Absent`] when the column is missing.
    pub fn get(&self, key: &str) -> &FieldValue {
        self.0.get(key).unwrap_or(&ABSENT)
    }

    /// Whether the column exists at all (a null cell still counts).
    pub fn has_field(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.get(key).render()
    }

    /// Trimmed rendering of the `id` cell, if it is set.
    pub fn id(&self) -> Option<String> {
        let id = self.get("id");
        if !id.is_truthy() {
            return None;
        }
        id.render().map(|s| s.trim().to_string())
    }

    /// Lenient numeric reading: absent, falsy or unparsable cells are zero.
    pub fn number(&self, key: &str) -> f64 {
        let cell = self.get(key);
        if !cell.is_truthy() {
            return 0.0;
        }
        cell.as_number().unwrap_or(0.0)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Any cell whose trimmed text equals `target` exactly.
    pub fn any_field_equals(&self, target: &str) -> bool {
        self.0
            .values()
            .filter_map(FieldValue::render)
            .any(|s| s.trim() == target)
    }

    /// Any cell whose text contains `target`.
    pub fn any_field_contains(&self, target: &str) -> bool {
        self.0
            .values()
            .filter_map(FieldValue::render)
            .any(|s| s.contains(target))
    }

    /// Case-insensitive match of `query` against the `name` cell. An empty
    /// name matches only an empty query; a missing name never matches.
    pub fn name_matches(&self, query: &str) -> bool {
        match self.get("name") {
            FieldValue::Text(name) => name.to_lowercase().contains(&query.to_lowercase()),
            _ => false,
        }
    }
}

impl FromIterator<(String, FieldValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Keep the rows whose name matches the search box text.
pub fn filter_by_name(rows: &[Row], query: &str) -> Vec<Row> {
    rows.iter()
        .filter(|row| row.name_matches(query))
        .cloned()
        .collect()
}

/// Panchayat search: like [`filter_by_name`], but rows with an empty name
/// are always dropped.
pub fn filter_panchayats_by_name(rows: &[Row], query: &str) -> Vec<Row> {
    rows.iter()
        .filter(|row| row.get("name").is_truthy() && row.name_matches(query))
        .cloned()
        .collect()
}
