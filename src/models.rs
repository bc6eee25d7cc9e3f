use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// Car as advertised by a `.btn-book-car` button on the listing pages
#[derive(Debug, Clone, PartialEq)]
pub struct CarSummary {
    pub id: u64,
    pub name: String,
    pub daily_rate: Decimal,
}

// Everything the booking dialog collects for one car
#[derive(Debug, Clone, PartialEq)]
pub struct BookingContext {
    pub car_id: u64,
    pub car_name: String,
    pub daily_rate: Decimal,
    pub pickup: Option<NaiveDateTime>,
    pub return_at: Option<NaiveDateTime>,
    pub special_requests: String,
}

impl BookingContext {
    pub fn for_car(car: &CarSummary) -> Self {
        Self {
            car_id: car.id,
            car_name: car.name.clone(),
            daily_rate: car.daily_rate,
            pickup: None,
            return_at: None,
            special_requests: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityQuery {
    pub car_id: u64,
    pub pickup: NaiveDateTime,
    pub return_at: NaiveDateTime,
}

// Data structures for the availability endpoint JSON response
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AvailabilityResponse {
    pub available: bool,
    #[serde(default)]
    pub car_id: Option<u64>,
    #[serde(default)]
    pub car_status: Option<String>,
    #[serde(default)]
    pub daily_rate: Option<Decimal>,
}

// Data structures for the car search endpoint JSON response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CarSearchResponse {
    pub results: Vec<CarSearchRow>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CarSearchRow {
    pub id: u64,
    pub full_name: String,
    // Sent as a decimal string ("45.00"); plain numbers are accepted too
    pub daily_rate: Decimal,
}

// Read-only projection of one search row, rebuilt on every query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: u64,
    pub display_name: String,
    pub daily_rate: Decimal,
}

impl From<CarSearchRow> for SearchResult {
    fn from(row: CarSearchRow) -> Self {
        Self {
            id: row.id,
            display_name: row.full_name,
            daily_rate: row.daily_rate,
        }
    }
}
