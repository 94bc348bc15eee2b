//! Export options.

use chrono::{FixedOffset, Offset, Utc};
use std::str::FromStr;

/// Characters placed between report lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineSeparator {
    #[default]
    Lf,
    CrLf,
}

impl LineSeparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineSeparator::Lf => "\n",
            LineSeparator::CrLf => "\r\n",
        }
    }
}

/// Options fixed when a report is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub line_separator: LineSeparator,
    /// Also end the last line with the separator
    pub trailing_separator: bool,
    /// Offset used to read calendar dates and to print `DDMMYYYY`
    pub utc_offset: FixedOffset,
}

impl Default for ReportOptions {
    fn default() -> Self {
        ReportOptions {
            line_separator: LineSeparator::Lf,
            trailing_separator: false,
            utc_offset: Utc.fix(),
        }
    }
}

/// Parses `+HH:MM`, `-HH:MM`, `Z` or `UTC`.
pub fn parse_utc_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
        return Some(Utc.fix());
    }
    FixedOffset::from_str(s).ok()
}
