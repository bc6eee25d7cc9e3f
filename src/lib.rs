// Client-side behaviour of the car rental site: booking dialog, search
// suggestions and listing forms

pub mod api;
pub mod booking;
pub mod config;
pub mod debounce;
pub mod format;
pub mod forms;
pub mod loading;
pub mod markup;
pub mod models;
pub mod page;
pub mod pricing;
pub mod search;
pub mod ui;

// Re-export key types for convenience
pub use api::{
    check_car_availability, ApiError, ClientConfig, ClientError, HttpRentalApi, RentalApi,
};
pub use booking::{
    BookingConfig, BookingConfirmation, BookingDialog, BookingPage, ConfirmOutcome, DialogState,
    ValidationError,
};
pub use config::AppConfig;
pub use format::{format_currency, format_date, format_datetime};
pub use forms::{CarFilters, FilterField, FilterForm, FormConfig, SearchForm};
pub use loading::{toggle_loading, ControlHandle, LoadingGuard};
pub use models::{AvailabilityQuery, AvailabilityResponse, BookingContext, CarSummary, SearchResult};
pub use page::{PageHost, RentaCarPage};
pub use pricing::{PricingSummary, RentalQuote};
pub use search::{SearchConfig, SearchSuggestions, SuggestionList, SuggestionPanel};
pub use ui::{FormSubmitter, Navigator, Notifier};
