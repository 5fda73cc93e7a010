//! Lenient date handling for spreadsheet cells

use chrono::{Months, NaiveDate};

use crate::sheets::xlsx::serial_to_datetime;

/// Canonical stored date format
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Largest serial a spreadsheet accepts (9999-12-31)
const MAX_SERIAL: f64 = 2_958_465.0;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"];


/// Parse a date as typed by people or written by spreadsheet tools.
///
/// Accepts `2025-04-01`, `2025/4/1`, `2025.04.01`, `2025年4月1日`, a date-time
/// with one of those date prefixes, or a serial day number.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(date) = parse_date_only(s) {
        return Some(date);
    }

    // Date-times: the date is the token before the first space or `T`,
    // whatever the time part looks like
    if let Some((split, sep)) = s.char_indices().find(|(_, c)| c.is_whitespace() || *c == 'T') {
        let (date, time) = (&s[..split], s[split + sep.len_utf8()..].trim_start());
        if time.starts_with(|c: char| c.is_ascii_digit()) {
            if let Some(date) = parse_date_only(date) {
                return Some(date);
            }
        }
    }

    if let Ok(serial) = s.parse::<f64>() {
        if (1.0..=MAX_SERIAL).contains(&serial) {
            return serial_to_datetime(serial).map(|dt| dt.date());
        }
    }

    None
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

/// Normalise a date cell to `YYYY-MM-DD`; `None` when it cannot be read
pub fn normalize_date(input: &str) -> Option<String> {
    parse_date(input).map(format_date)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Move a date by whole years.
///
/// February 29 lands on February 28 when the target year is not a leap year.
/// `None` when the result is outside the supported calendar.
pub fn add_years(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    let months = Months::new(years.unsigned_abs().checked_mul(12)?);
    if years >= 0 {
        date.checked_add_months(months)
    } else {
        date.checked_sub_months(months)
    }
}

/// Signed number of days from `today` until `date`
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}
