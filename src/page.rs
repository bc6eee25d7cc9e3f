// Wires every controller of a listing page to one API client

use crate::api::{check_car_availability, ClientError, HttpRentalApi, RentalApi};
use crate::booking::BookingPage;
use crate::config::AppConfig;
use crate::forms::{CarFilters, FilterForm, SearchForm};
use crate::models::AvailabilityQuery;
use crate::search::{SearchSuggestions, SuggestionPanel};
use crate::ui::{FormSubmitter, Navigator, Notifier};
use std::sync::Arc;

pub const SEARCH_BUTTON_LABEL: &str = "Search";

// What the hosting page provides to the controllers
#[derive(Clone)]
pub struct PageHost {
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub submitter: Arc<dyn FormSubmitter>,
    pub suggestions: Arc<dyn SuggestionPanel>,
    // Query string of the current listing URL, used to seed the filter form
    pub location_query: String,
}

pub struct RentaCarPage {
    api: Arc<dyn RentalApi>,
    pub booking: BookingPage,
    pub search: SearchSuggestions,
    pub filters: FilterForm,
    pub search_form: SearchForm,
}

impl RentaCarPage {
    pub fn connect(config: &AppConfig, host: PageHost) -> Result<Self, ClientError> {
        let api = HttpRentalApi::new(&config.client)?;
        Ok(Self::with_api(Arc::new(api), config, host))
    }

    pub fn with_api(api: Arc<dyn RentalApi>, config: &AppConfig, host: PageHost) -> Self {
        Self {
            booking: BookingPage::new(Arc::clone(&api), host.notifier, config.booking.clone()),
            search: SearchSuggestions::new(
                Arc::clone(&api),
                host.suggestions,
                host.navigator,
                config.search.clone(),
            ),
            filters: FilterForm::new(CarFilters::from_query(&host.location_query), host.submitter),
            search_form: SearchForm::new(SEARCH_BUTTON_LABEL, config.forms.clone()),
            api,
        }
    }

    // Availability outside the booking dialog; errors read as unavailable
    pub async fn check_car_availability(&self, query: AvailabilityQuery) -> bool {
        check_car_availability(self.api.as_ref(), query).await
    }
}
