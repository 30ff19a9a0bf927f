//! Conversions from raw spreadsheet cells to the typed values the ledger
//! works with.

use calamine::Data;
use chrono::{Duration, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

// Largest integral f64 that still renders without exponent or rounding.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Text form of a cell, used for labels and join keys. Integral numbers
/// render without a fractional part so `1001.0` and `"1001"` compare equal.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Data::Float(v) => Some(number_text(*v)),
        Data::Int(v) => Some(v.to_string()),
        Data::Bool(v) => Some(v.to_string()),
        Data::DateTime(v) => excel_serial_to_datetime(v.as_f64()).map(|dt| dt.to_string()),
        Data::DateTimeIso(v) | Data::DurationIso(v) => Some(v.trim().to_string()),
        Data::Error(_) | Data::Empty => None,
    }
}

pub fn cell_number(cell: &Data) -> Result<Option<f64>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::Float(v) => Ok(Some(*v)),
        Data::Int(v) => Ok(Some(*v as f64)),
        Data::String(s) => parse_number_text(s),
        Data::Bool(v) => Err(format!("expected a number, found boolean {v}")),
        Data::DateTime(_) | Data::DateTimeIso(_) | Data::DurationIso(_) => {
            Err("expected a number, found a date".to_string())
        }
        Data::Error(e) => Err(format!("cell holds spreadsheet error {e:?}")),
    }
}

pub fn cell_datetime(cell: &Data) -> Result<Option<NaiveDateTime>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::DateTime(v) => excel_serial_to_datetime(v.as_f64())
            .map(Some)
            .ok_or_else(|| format!("date serial {} out of range", v.as_f64())),
        Data::Float(v) => excel_serial_to_datetime(*v)
            .map(Some)
            .ok_or_else(|| format!("date serial {v} out of range")),
        Data::Int(v) => excel_serial_to_datetime(*v as f64)
            .map(Some)
            .ok_or_else(|| format!("date serial {v} out of range")),
        Data::String(s) | Data::DateTimeIso(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            parse_datetime_text(trimmed)
                .map(Some)
                .ok_or_else(|| format!("unrecognised date '{trimmed}'"))
        }
        Data::Bool(v) => Err(format!("expected a date, found boolean {v}")),
        Data::DurationIso(v) => Err(format!("expected a date, found duration {v}")),
        Data::Error(e) => Err(format!("cell holds spreadsheet error {e:?}")),
    }
}

pub fn parse_datetime_text(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(raw, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Spreadsheet serial dates count days from 1899-12-30; the fraction is the
/// time of day.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn number_text(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

fn parse_number_text(raw: &str) -> Result<Option<f64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(value) = trimmed.parse::<f64>() {
        return Ok(Some(value));
    }
    // Decimal comma, as typed in pt-BR sheets ("12,5").
    if !trimmed.contains('.') {
        if let Ok(value) = trimmed.replace(',', ".").parse::<f64>() {
            return Ok(Some(value));
        }
    }
    Err(format!("expected a number, found '{trimmed}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integral_numbers_render_as_keys() {
        assert_eq!(cell_text(&Data::Float(1001.0)).as_deref(), Some("1001"));
        assert_eq!(cell_text(&Data::Int(7)).as_deref(), Some("7"));
        assert_eq!(cell_text(&Data::Float(2.5)).as_deref(), Some("2.5"));
        assert_eq!(
            cell_text(&Data::String("  Móveis ".to_string())).as_deref(),
            Some("Móveis")
        );
        assert_eq!(cell_text(&Data::String("   ".to_string())), None);
        assert_eq!(cell_text(&Data::Empty), None);
    }

    #[test]
    fn parses_numbers_from_text_cells() {
        assert_eq!(cell_number(&Data::String("12.5".to_string())), Ok(Some(12.5)));
        assert_eq!(cell_number(&Data::String("12,5".to_string())), Ok(Some(12.5)));
        assert_eq!(cell_number(&Data::Empty), Ok(None));
        assert!(cell_number(&Data::String("doze".to_string())).is_err());
        assert!(cell_number(&Data::Bool(true)).is_err());
    }

    #[test]
    fn converts_serial_dates() {
        let dt = excel_serial_to_datetime(45_352.5).expect("in range");
        assert_eq!(dt.to_string(), "2024-03-01 12:00:00");
        assert_eq!(
            cell_datetime(&Data::Float(45_352.0)).ok().flatten().map(|d| d.date()),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(excel_serial_to_datetime(-1.0).is_none());
        assert!(excel_serial_to_datetime(f64::NAN).is_none());
    }

    #[test]
    fn parses_textual_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).and_then(|d| d.and_hms_opt(0, 0, 0));
        assert_eq!(parse_datetime_text("2024-03-15"), expected);
        assert_eq!(parse_datetime_text("15/03/2024"), expected);
        assert_eq!(
            parse_datetime_text("2024-03-15T08:30:00").map(|d| d.to_string()),
            Some("2024-03-15 08:30:00".to_string())
        );
        assert!(cell_datetime(&Data::String("ontem".to_string())).is_err());
        assert_eq!(cell_datetime(&Data::Empty), Ok(None));
    }
}
