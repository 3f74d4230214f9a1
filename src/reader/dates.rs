//! Excel date plumbing: deciding whether a number format renders a date, and
//! converting serial numbers to instants.

use crate::spreadsheet::NumberFormat;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;

/// Builtin number format ids that render as dates or times.
fn is_builtin_date_id(id: u32) -> bool {
    matches!(id, 14..=17 | 22 | 27..=36 | 45..=47 | 50..=58)
}

/// Decides whether a cell format renders numbers as dates. Custom codes win
/// over the builtin id they shadow.
pub(crate) fn is_date_format(format: &NumberFormat) -> bool {
    match &format.code {
        Some(code) => is_date_format_code(code),
        None => is_builtin_date_id(format.id),
    }
}

/// Scans a custom format code for date/time tokens (y, m, d, h, s), ignoring
/// escaped characters, quoted literals and color/condition brackets.
pub(crate) fn is_date_format_code(format: &str) -> bool {
    let mut is_escaped = false;
    let mut is_literal = false;
    let mut is_color = false;
    for character in format.chars() {
        match character {
            _ if is_escaped => is_escaped = false,
            '_' | '\\' if !is_escaped => is_escaped = true,

            '"' if is_literal => is_literal = false,
            '"' if !is_literal && !is_color => is_literal = true,

            ']' if is_color => is_color = false,
            '[' if !is_color && !is_literal => is_color = true,
            _ if is_literal || is_color => (),

            'Y' | 'y' | 'M' | 'm' | 'D' | 'd' | 'H' | 'h' | 'S' | 's' => return true,
            _ => (),
        }
    }
    false
}

/// Converts an Excel serial number to a naive instant.
///
/// 1900 system: the integer part counts days from 1899-12-30, except that
/// serials below 60 count from 1899-12-31 because Excel inherited the Lotus
/// 1-2-3 bug that makes 1900 a leap year. Serial 60 names the phantom
/// 1900-02-29 and has no instant; callers surface it as a warning. The 1904
/// system counts plainly from 1904-01-01 and has no phantom day.
pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1).expect("Hardcode epoch")
    } else if days >= 61 {
        NaiveDate::from_ymd_opt(1899, 12, 30).expect("Hardcode epoch")
    } else if days <= 59 {
        NaiveDate::from_ymd_opt(1899, 12, 31).expect("Hardcode epoch")
    } else {
        // Serial 60 is 1900-02-29, which never existed
        return None;
    };
    let date = epoch.checked_add_signed(Duration::days(days))?;
    let mut seconds = (serial.fract() * 86_400f64).round() as i64;
    let date = if seconds >= 86_400 {
        seconds -= 86_400;
        date.checked_add_signed(Duration::days(1))?
    } else {
        date
    };
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight + Duration::seconds(seconds))
}
