// Listing-page forms: filters that submit on every change, and the search
// form whose button shows a loading state while the page reloads

use crate::loading::{toggle_loading, ControlHandle};
use crate::ui::FormSubmitter;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::form_urlencoded;

pub const FILTER_FORM_ID: &str = "filter-form";
pub const SEARCH_FORM_ID: &str = "car-search-form";

#[derive(Debug, Clone)]
pub struct FormConfig {
    // How long the search button stays in its loading state after submit
    pub submit_reset_ms: u64,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            submit_reset_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Category,
    Brand,
    Transmission,
    FuelType,
    MinPrice,
    MaxPrice,
    Search,
    AvailableOnly,
}

impl FilterField {
    pub const ALL: [FilterField; 8] = [
        FilterField::Category,
        FilterField::Brand,
        FilterField::Transmission,
        FilterField::FuelType,
        FilterField::MinPrice,
        FilterField::MaxPrice,
        FilterField::Search,
        FilterField::AvailableOnly,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterField::Category => "category",
            FilterField::Brand => "brand",
            FilterField::Transmission => "transmission",
            FilterField::FuelType => "fuel_type",
            FilterField::MinPrice => "min_price",
            FilterField::MaxPrice => "max_price",
            FilterField::Search => "search",
            FilterField::AvailableOnly => "available_only",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }
}

// Values of the `#filter-form` inputs; empty inputs are None
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarFilters {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub available_only: bool,
}

impl CarFilters {
    // Reads filters back from a listing page query string
    pub fn from_query(query: &str) -> Self {
        let mut filters = Self::default();
        for (name, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            if let Some(field) = FilterField::from_name(&name) {
                filters.set(field, &value);
            }
        }
        filters
    }

    pub fn set(&mut self, field: FilterField, value: &str) {
        let value = value.trim();
        let text = (!value.is_empty()).then(|| value.to_string());

        match field {
            FilterField::Category => self.category = text,
            FilterField::Brand => self.brand = text,
            FilterField::Transmission => self.transmission = text,
            FilterField::FuelType => self.fuel_type = text,
            FilterField::MinPrice => self.min_price = parse_price(field, value),
            FilterField::MaxPrice => self.max_price = parse_price(field, value),
            FilterField::Search => self.search = text,
            FilterField::AvailableOnly => self.available_only = text.is_some(),
        }
    }

    // Query string the form submits, with unset fields left out
    pub fn query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let text_fields = [
            (FilterField::Category, &self.category),
            (FilterField::Brand, &self.brand),
            (FilterField::Transmission, &self.transmission),
            (FilterField::FuelType, &self.fuel_type),
        ];
        for (field, value) in text_fields {
            if let Some(value) = value {
                serializer.append_pair(field.name(), value);
            }
        }

        for (field, value) in [
            (FilterField::MinPrice, self.min_price),
            (FilterField::MaxPrice, self.max_price),
        ] {
            if let Some(value) = value {
                serializer.append_pair(field.name(), &value.to_string());
            }
        }

        if let Some(search) = &self.search {
            serializer.append_pair(FilterField::Search.name(), search);
        }
        if self.available_only {
            serializer.append_pair(FilterField::AvailableOnly.name(), "on");
        }

        serializer.finish()
    }
}

fn parse_price(field: FilterField, value: &str) -> Option<Decimal> {
    if value.is_empty() {
        return None;
    }

    match value.parse::<Decimal>() {
        Ok(price) if !price.is_sign_negative() => Some(price),
        _ => {
            warn!(field = field.name(), value, "Ignoring invalid price filter");
            None
        }
    }
}

// `#filter-form`: every input change submits the form
pub struct FilterForm {
    filters: Mutex<CarFilters>,
    submitter: Arc<dyn FormSubmitter>,
}

impl FilterForm {
    pub fn new(initial: CarFilters, submitter: Arc<dyn FormSubmitter>) -> Self {
        Self {
            filters: Mutex::new(initial),
            submitter,
        }
    }

    pub fn filters(&self) -> CarFilters {
        self.filters.lock().clone()
    }

    pub fn on_change(&self, field: FilterField, value: &str) {
        let query = {
            let mut filters = self.filters.lock();
            filters.set(field, value);
            filters.query_string()
        };

        debug!(field = field.name(), %query, "Filter changed, submitting");
        self.submitter.submit(FILTER_FORM_ID, &query);
    }
}

// `#car-search-form`: submitting puts the submit button into its loading
// state for a fixed time while the results page loads.
pub struct SearchForm {
    submit_button: ControlHandle,
    config: FormConfig,
}

impl SearchForm {
    pub fn new(submit_label: &str, config: FormConfig) -> Self {
        Self {
            submit_button: ControlHandle::new(submit_label),
            config,
        }
    }

    pub fn submit_button(&self) -> &ControlHandle {
        &self.submit_button
    }

    // Returns false when the button is already loading. Must be called
    // from within a tokio runtime.
    pub fn on_submit(&self) -> bool {
        let Some(loading) = toggle_loading(&self.submit_button) else {
            return false;
        };

        let reset_after = Duration::from_millis(self.config.submit_reset_ms);
        tokio::spawn(async move {
            tokio::time::sleep(reset_after).await;
            loading.restore();
        });
        true
    }
}
