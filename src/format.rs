// Display helpers shared by the booking dialog and the suggestion list

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

// Formats accepted from a `datetime-local` input, most specific last
const INPUT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

// US dollars with two decimals and thousands separators, e.g. `1234.5`
// becomes `$1,234.50`. Half cents round away from zero.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let dollars = rounded.trunc();
    let cents = ((rounded - dollars) * Decimal::ONE_HUNDRED)
        .to_u32()
        .unwrap_or(0);
    let sign = if amount.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    format!("{}${}.{:02}", sign, group_thousands(&dollars.to_string()), cents)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}

// Long-form date such as `June 1, 2024`. Accepts a plain date or any
// `datetime-local` value; `None` when the value cannot be read.
pub fn format_date(value: &str) -> Option<String> {
    let value = value.trim();
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime_input(value).map(|dt| dt.date()))?;

    Some(date.format("%B %-d, %Y").to_string())
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format("%B %-d, %Y %-I:%M %p").to_string()
}

pub fn duration_label(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", days)
    }
}

// Parses the value of a `datetime-local` input. Empty input is `None`.
pub fn parse_datetime_input(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

// ISO value as a `datetime-local` input would hold it; seconds are only
// written when present.
pub fn input_value(value: NaiveDateTime) -> String {
    if value.second() == 0 && value.nanosecond() == 0 {
        value.format("%Y-%m-%dT%H:%M").to_string()
    } else {
        value.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}
