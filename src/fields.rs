//! Flat field mappings accepted by the `add_*` entry points.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::fmt;

/// A raw, not yet validated input value.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
}

impl RawValue {
    /// The value as text, for fields that only accept strings.
    pub fn as_text(&self) -> String {
        self.to_string()
    }

    /// `true` for an empty or whitespace-only string.
    pub fn is_blank(&self) -> bool {
        matches!(self, RawValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Text(s) => write!(f, "{}", s),
            RawValue::Integer(i) => write!(f, "{}", i),
            RawValue::Float(x) => write!(f, "{}", x),
            RawValue::Decimal(d) => write!(f, "{}", d),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Integer(value.into())
    }
}

impl From<u32> for RawValue {
    fn from(value: u32) -> Self {
        RawValue::Integer(value.into())
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<Decimal> for RawValue {
    fn from(value: Decimal) -> Self {
        RawValue::Decimal(value)
    }
}

/// Field name to raw value, as supplied by the caller.
///
/// Blank strings count as absent, so a CSV cell left empty and a field
/// never set behave the same.
///
/// ```
/// use crypto_report::RawFields;
///
/// let fields = RawFields::new()
///     .with("date", "25/05/2019")
///     .with("brl_value", "R$ 1500,80")
///     .with("coin_quantity", 0.0000001);
/// assert!(fields.contains("date"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFields(BTreeMap<String, RawValue>);

impl RawFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RawValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// The value for `key`, skipping blanks.
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.0.get(key).filter(|v| !v.is_blank())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// `true` if any non-blank field starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0
            .iter()
            .any(|(k, v)| k.starts_with(prefix) && !v.is_blank())
    }

    /// Non-blank entries, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.0
            .iter()
            .filter(|(_, v)| !v.is_blank())
            .map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = RawFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}
