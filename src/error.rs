//! Error types for report generation.

use std::fmt;
use thiserror::Error;

/// Result type alias for report operations
pub type Result<T> = std::result::Result<T, ReportError>;

/// Errors that can occur while building or exporting a report.
#[derive(Error, Debug)]
pub enum ReportError {
    /// One or more input fields were rejected; nothing was registered
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// An encoded cell does not fit the layout budget for its column
    #[error("field '{field}' needs {actual_width} characters but the layout allows {max_width}")]
    EncodingWidthExceeded {
        field: String,
        max_width: usize,
        actual_width: usize,
    },

    /// A cell carries the field delimiter or a line break
    #[error("field '{field}' contains a delimiter or line break")]
    DelimiterInField { field: String },

    /// A cell carries a quote or a character outside printable ASCII
    #[error("field '{field}' contains characters the layout does not allow")]
    UnsafeText { field: String },

    /// A required text cell is empty
    #[error("required field '{field}' is empty")]
    EmptyField { field: String },

    /// A line does not carry the cell count of its record type
    #[error("record {record} needs {expected} fields but {actual} were built")]
    FieldCountMismatch {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Operation rows appeared before the exchange identity row
    #[error("the exchange identity row must come before any operation")]
    MissingExchange,

    /// Unknown value in the `type` column
    #[error("unknown operation type '{kind}' at row {row}")]
    UnknownOperation { row: usize, kind: String },

    /// A CSV row was rejected
    #[error("invalid row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: Box<ReportError>,
    },

    /// Failed to open or read the input file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: crypto-report <operations.csv> [--crlf] [--trailing-newline] [--utc-offset=+HH:MM]")]
    MissingArgument,

    /// Unrecognized or malformed command line option
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// A single rejected input field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Every failure collected while validating one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    /// Returns the failure recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.0.iter().find(|e| e.field == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// None of the accepted date forms matched the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized date '{input}'")]
pub struct DateParseError {
    pub input: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_display_joins_fields() {
        let mut errors = ValidationErrors::default();
        errors.push(ValidationError::new("date", "required"));
        errors.push(ValidationError::new("coin_symbol", "too long"));
        assert_eq!(errors.to_string(), "date: required; coin_symbol: too long");
        assert_eq!(errors.get("date").map(|e| e.reason.as_str()), Some("required"));
        assert!(errors.get("brl_value").is_none());
    }

    #[test]
    fn test_width_error_message() {
        let err = ReportError::EncodingWidthExceeded {
            field: "brl_value".to_string(),
            max_width: 16,
            actual_width: 17,
        };
        assert_eq!(
            err.to_string(),
            "field 'brl_value' needs 17 characters but the layout allows 16"
        );
    }
}
