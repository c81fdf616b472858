//! Display formatters for amounts, dates, and file sizes.
//!
//! DESIGN
//! ======
//! All formatters are pure and locale-stable: output depends only on the
//! input value, never on process locale or the local timezone. Amounts use
//! the Spanish euro layout (`1.234,56 €`), dates use `dd/mm/yyyy`.

use rust_decimal::{Decimal, RoundingStrategy};
use time::{Date, OffsetDateTime, UtcOffset};

const FILE_SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a euro amount as `1.234,56 €`.
#[must_use]
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut out = String::with_capacity(plain.len() + 6);
    if negative {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    out.push(',');
    out.push_str(frac_part);
    out.push_str(" €");
    out
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Format a calendar date as `dd/mm/yyyy`.
#[must_use]
pub fn format_date(date: Date) -> String {
    format!("{:02}/{:02}/{}", date.day(), u8::from(date.month()), date.year())
}

/// Format a timestamp as `dd/mm/yyyy HH:MM`, always in UTC.
#[must_use]
pub fn format_datetime(ts: OffsetDateTime) -> String {
    let utc = ts.to_offset(UtcOffset::UTC);
    format!("{} {:02}:{:02}", format_date(utc.date()), utc.hour(), utc.minute())
}

/// Format a byte count with binary units: `0 Bytes`, `512 Bytes`, `1.5 KB`, `10 MB`.
///
/// Values are rounded to two decimals and trailing zeros are dropped.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".into();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < FILE_SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut rounded = (value * 100.0).round() / 100.0;
    // 1023.995 and up rounds to 1024; carry into the next unit.
    if rounded >= 1024.0 && unit < FILE_SIZE_UNITS.len() - 1 {
        rounded = (rounded / 1024.0 * 100.0).round() / 100.0;
        unit += 1;
    }
    format!("{rounded} {}", FILE_SIZE_UNITS[unit])
}

/// Format a 0-100 score as `87.5%`.
#[must_use]
pub fn format_percent(value: f64) -> String {
    format!("{value:.1}%")
}

#[cfg(test)]
#[path = "format_test.rs"]
mod tests;
