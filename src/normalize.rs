//! Pure conversions from raw user input to canonical values.

use crate::error::DateParseError;
use crate::fields::RawValue;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

fn slashed_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid regex"))
}

fn compact_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})(\d{1,2})(\d{4})$").expect("valid regex"))
}

fn epoch_seconds() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"))
}

/// Parses a currency amount.
///
/// Strings use `,` as the decimal point and may carry any decoration
/// (`R$ 1500,80` reads as `1500.80`). Thousands separators are not
/// supported: input that still holds more than one separator after
/// stripping is rejected instead of guessed at.
pub fn normalize_currency(raw: &RawValue) -> Result<Decimal, String> {
    let value = match raw {
        RawValue::Text(text) => parse_currency_text(text)?,
        RawValue::Integer(i) => Decimal::from(*i),
        RawValue::Float(f) => {
            if !f.is_finite() {
                return Err("Value is not a finite number".to_string());
            }
            Decimal::from_str(&f.to_string()).map_err(|e| e.to_string())?
        }
        RawValue::Decimal(d) => *d,
    };

    if value.is_sign_negative() && !value.is_zero() {
        return Err("Value cannot be less than zero".to_string());
    }
    Ok(value.abs())
}

fn parse_currency_text(text: &str) -> Result<Decimal, String> {
    if text.contains('-') {
        return Err("Value cannot be less than zero".to_string());
    }

    let cleaned: String = text
        .chars()
        .map(|c| if c == ',' { '.' } else { c })
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Err(format!("No digits in '{}'", text));
    }
    if cleaned.matches('.').count() > 1 {
        return Err(format!(
            "Ambiguous separators in '{}' (thousands separators are not allowed)",
            text
        ));
    }

    Decimal::from_str(&cleaned).map_err(|e| format!("Invalid amount '{}': {}", text, e))
}

/// Parses a date into an instant, reading calendar forms as UTC midnight.
pub fn normalize_date(raw: &RawValue) -> Result<DateTime<FixedOffset>, DateParseError> {
    normalize_date_in(raw, &Utc.fix())
}

/// Parses a date into an instant in `offset`.
///
/// Tried in order, first match wins: `DD/MM/YYYY`, `DDMMYYYY`, Unix epoch
/// seconds, then ISO-like date strings. Calendar dates are midnight in
/// `offset`.
pub fn normalize_date_in(
    raw: &RawValue,
    offset: &FixedOffset,
) -> Result<DateTime<FixedOffset>, DateParseError> {
    let fail = || DateParseError {
        input: raw.to_string(),
    };

    match raw {
        // Whole numbers go through the text patterns so `25052019` stays a
        // calendar date; longer values fall through to epoch seconds there.
        RawValue::Integer(n) => parse_date_text(&n.to_string(), offset).ok_or_else(fail),
        RawValue::Decimal(d) if d.fract().is_zero() => {
            parse_date_text(&d.trunc().to_string(), offset).ok_or_else(fail)
        }
        RawValue::Float(secs) => from_epoch(*secs, offset).ok_or_else(fail),
        RawValue::Decimal(secs) => secs
            .to_string()
            .parse::<f64>()
            .ok()
            .and_then(|s| from_epoch(s, offset))
            .ok_or_else(fail),
        RawValue::Text(text) => parse_date_text(text.trim(), offset).ok_or_else(fail),
    }
}

fn parse_date_text(text: &str, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    // A string matching a calendar pattern never falls through to the
    // timestamp reading, even when the calendar date is impossible.
    if let Some(caps) = slashed_date()
        .captures(text)
        .or_else(|| compact_date().captures(text))
    {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        return midnight(date, offset);
    }

    if epoch_seconds().is_match(text) {
        return text.parse::<f64>().ok().and_then(|s| from_epoch(s, offset));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(offset));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return offset.from_local_datetime(&naive).single();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return midnight(date, offset);
    }

    None
}

fn midnight(date: NaiveDate, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    offset
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .single()
}

fn from_epoch(secs: f64, offset: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::<Utc>::from_timestamp(whole as i64, nanos.min(999_999_999))
        .map(|utc| utc.with_timezone(offset))
}

/// Makes free text safe for a pipe-delimited ASCII line.
///
/// Accents are decomposed and dropped, then anything outside printable
/// ASCII goes, along with `'` and the `|` delimiter.
pub fn sanitize_text(raw: &str) -> String {
    raw.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .filter(|c| (' '..='~').contains(c))
        .filter(|c| *c != '\'' && *c != '|')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use rust_decimal_macros::dec;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_currency_with_symbol_and_comma() {
        assert_eq!(normalize_currency(&text("R$ 1500,80")).unwrap(), dec!(1500.80));
        assert_eq!(normalize_currency(&text("R$ 1,49")).unwrap(), dec!(1.49));
        assert_eq!(normalize_currency(&text("1003.00")).unwrap(), dec!(1003.00));
    }

    #[test]
    fn test_currency_numeric_inputs() {
        assert_eq!(normalize_currency(&RawValue::Integer(0)).unwrap(), dec!(0));
        assert_eq!(
            normalize_currency(&RawValue::Float(0.000004)).unwrap(),
            dec!(0.000004)
        );
        assert_eq!(
            normalize_currency(&RawValue::Decimal(dec!(12.5))).unwrap(),
            dec!(12.5)
        );
    }

    #[test]
    fn test_currency_rejects_thousands_separator() {
        assert!(normalize_currency(&text("R$ 1.500,80")).is_err());
        assert!(normalize_currency(&text("1,500,000")).is_err());
    }

    #[test]
    fn test_currency_rejects_negative_and_empty() {
        assert!(normalize_currency(&text("-5,00")).is_err());
        assert!(normalize_currency(&RawValue::Integer(-1)).is_err());
        assert!(normalize_currency(&text("R$")).is_err());
        assert!(normalize_currency(&RawValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_currency_keeps_full_precision() {
        assert_eq!(
            normalize_currency(&text("0,123456789012")).unwrap(),
            dec!(0.123456789012)
        );
    }

    #[test]
    fn test_date_forms_agree() {
        let slashed = normalize_date(&text("25/05/2019")).unwrap();
        let compact = normalize_date(&text("25052019")).unwrap();
        let generic = normalize_date(&text("2019-05-25")).unwrap();
        let epoch = normalize_date(&RawValue::Integer(1_558_742_400)).unwrap();
        let epoch_text = normalize_date(&text("1558742400")).unwrap();
        assert_eq!(slashed, compact);
        assert_eq!(slashed, generic);
        assert_eq!(slashed, epoch);
        assert_eq!(slashed, epoch_text);
    }

    #[test]
    fn test_whole_numbers_try_calendar_forms_first() {
        let slashed = normalize_date(&text("25/05/2019")).unwrap();
        assert_eq!(normalize_date(&RawValue::Integer(25_052_019)).unwrap(), slashed);
        assert_eq!(normalize_date(&RawValue::Decimal(dec!(25052019))).unwrap(), slashed);
        assert_eq!(
            normalize_date(&RawValue::Decimal(dec!(1558742400.0))).unwrap(),
            slashed
        );
        assert!(normalize_date(&RawValue::Integer(31_022_019)).is_err());
    }

    #[test]
    fn test_date_single_digit_day_and_month() {
        let date = normalize_date(&text("1/8/2019")).unwrap();
        assert_eq!((date.day(), date.month(), date.year()), (1, 8, 2019));
    }

    #[test]
    fn test_date_from_unix_timestamp() {
        let date = normalize_date(&RawValue::Integer(1_564_672_373)).unwrap();
        assert_eq!(date.format("%d%m%Y").to_string(), "01082019");
    }

    #[test]
    fn test_date_in_offset() {
        let brt = FixedOffset::west_opt(3 * 3600).unwrap();
        let date = normalize_date_in(&text("25/05/2019"), &brt).unwrap();
        assert_eq!(date.format("%d%m%Y").to_string(), "25052019");
        assert_eq!(date.timestamp(), 1_558_753_200);

        // 02:00 UTC on the 1st is still the previous day in Brasilia
        let late = normalize_date_in(&RawValue::Integer(1_564_624_800), &brt).unwrap();
        assert_eq!(late.format("%d%m%Y").to_string(), "31072019");
    }

    #[test]
    fn test_date_rfc3339() {
        let date = normalize_date(&text("2019-05-25T10:00:00-03:00")).unwrap();
        assert_eq!(date.format("%d%m%Y %H").to_string(), "25052019 13");
    }

    #[test]
    fn test_date_invalid_inputs() {
        assert!(normalize_date(&text("31/02/2019")).is_err());
        assert!(normalize_date(&text("not a date")).is_err());
        assert!(normalize_date(&text("")).is_err());
        assert!(normalize_date(&RawValue::Float(f64::INFINITY)).is_err());
        let err = normalize_date(&text("soon")).unwrap_err();
        assert_eq!(err.input, "soon");
    }

    #[test]
    fn test_sanitize_strips_accents_and_delimiters() {
        assert_eq!(sanitize_text("São João"), "Sao Joao");
        assert_eq!(sanitize_text("D'Ávila | Cia"), "DAvila  Cia");
        assert_eq!(sanitize_text("line\nbreak\ttab"), "linebreaktab");
        assert_eq!(sanitize_text("Emoji 🚀 rocket"), "Emoji  rocket");
        assert_eq!(sanitize_text("plain"), "plain");
    }
}
