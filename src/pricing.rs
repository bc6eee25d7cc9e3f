// Rental duration and total price shown in the booking dialog's pricing panel

use crate::format::{duration_label, format_currency};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::Serialize;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

// Priced rental for an ordered pickup/return pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RentalQuote {
    pub days: i64,
    pub daily_rate: Decimal,
    pub total: Decimal,
}

impl RentalQuote {
    // None unless both timestamps are set and `return_at > pickup`
    pub fn compute(
        pickup: Option<NaiveDateTime>,
        return_at: Option<NaiveDateTime>,
        daily_rate: Decimal,
    ) -> Option<Self> {
        let (pickup, return_at) = (pickup?, return_at?);
        if return_at <= pickup {
            return None;
        }

        let days = rental_days(pickup, return_at);
        Some(Self {
            days,
            daily_rate,
            total: daily_rate * Decimal::from(days),
        })
    }
}

// Whole days between two timestamps; any partial day counts as a full one
pub fn rental_days(pickup: NaiveDateTime, return_at: NaiveDateTime) -> i64 {
    let elapsed_ms = (return_at - pickup).num_milliseconds().abs();
    (elapsed_ms + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

// Text of the pricing panel. Anything that does not form a valid range
// renders as the zero display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingSummary {
    pub daily_rate: String,
    pub duration: String,
    pub total: String,
}

impl PricingSummary {
    pub fn new(
        pickup: Option<NaiveDateTime>,
        return_at: Option<NaiveDateTime>,
        daily_rate: Decimal,
    ) -> Self {
        let (duration, total) = match RentalQuote::compute(pickup, return_at, daily_rate) {
            Some(quote) => (duration_label(quote.days), format_currency(quote.total)),
            None => (duration_label(0), format_currency(Decimal::ZERO)),
        };

        Self {
            daily_rate: format!("{}/day", format_currency(daily_rate)),
            duration,
            total,
        }
    }
}
