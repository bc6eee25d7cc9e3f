// Booking dialog: live pricing, date validation and the availability round trip

use crate::api::{check_car_availability, RentalApi};
use crate::format::{format_currency, format_datetime, input_value, parse_datetime_input};
use crate::loading::{toggle_loading, ControlHandle, LOADING_LABEL};
use crate::markup::{el, Element, MarkupError, Node};
use crate::models::{AvailabilityQuery, BookingContext, CarSummary};
use crate::pricing::{PricingSummary, RentalQuote};
use crate::ui::Notifier;
use chrono::{Local, NaiveDateTime, Timelike};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const BOOKING_MODAL_ID: &str = "bookingModal";
pub const CONFIRM_LABEL: &str = "Confirm Booking";
pub const UNAVAILABLE_MESSAGE: &str = "Sorry, this car is not available for the selected dates.";

// Display text doubles as the alert shown to the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select both pickup and return dates.")]
    MissingDates,

    #[error("Return date must be after pickup date.")]
    ReturnNotAfterPickup,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    #[error("Missing attribute: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct BookingConfig {
    // Pause between a positive availability answer and the confirmation
    pub confirmation_delay_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            confirmation_delay_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogState {
    Open,
    Validating,
    Checking,
    Confirmed,
    Closed,
}

// Serializes to the JSON a booking endpoint would accept.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub car_id: u64,
    pub car_name: String,
    pub pickup: NaiveDateTime,
    pub return_at: NaiveDateTime,
    pub days: i64,
    pub total: Decimal,
    pub special_requests: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed(BookingConfirmation),
    Unavailable,
    Invalid(ValidationError),
    // The confirm control was disabled or the dialog is not open
    Ignored,
    // The dialog was closed while the availability check was running
    Dismissed,
}

// Reads a `.btn-book-car` button's `data-*` attributes.
pub fn car_from_dataset<'a, F>(dataset: F) -> Result<CarSummary, AttributeError>
where
    F: Fn(&str) -> Option<&'a str>,
{
    let required = |name: &'static str| {
        dataset(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(AttributeError::Missing(name))
    };

    let raw_id = required("data-car-id")?;
    let id = raw_id.parse::<u64>().map_err(|_| AttributeError::Invalid {
        name: "data-car-id",
        value: raw_id.to_string(),
    })?;

    let raw_rate = required("data-daily-rate")?;
    let daily_rate = raw_rate
        .parse::<Decimal>()
        .ok()
        .filter(|rate| !rate.is_sign_negative())
        .ok_or_else(|| AttributeError::Invalid {
            name: "data-daily-rate",
            value: raw_rate.to_string(),
        })?;

    Ok(CarSummary {
        id,
        name: required("data-car-name")?.to_string(),
        daily_rate,
    })
}

// Checks the date-ordering invariant and yields the query to send.
pub fn validate_range(context: &BookingContext) -> Result<AvailabilityQuery, ValidationError> {
    let (pickup, return_at) = match (context.pickup, context.return_at) {
        (Some(pickup), Some(return_at)) => (pickup, return_at),
        _ => return Err(ValidationError::MissingDates),
    };

    if return_at <= pickup {
        return Err(ValidationError::ReturnNotAfterPickup);
    }

    Ok(AvailabilityQuery {
        car_id: context.car_id,
        pickup,
        return_at,
    })
}

struct DialogInner {
    context: BookingContext,
    state: DialogState,
    pickup_min: NaiveDateTime,
    return_min: NaiveDateTime,
    pricing: PricingSummary,
}

impl DialogInner {
    fn reprice(&mut self) {
        self.pricing = PricingSummary::new(
            self.context.pickup,
            self.context.return_at,
            self.context.daily_rate,
        );
    }
}

// One booking dialog. Owns its inputs, pricing panel and confirm button;
// everything is dropped with the dialog.
pub struct BookingDialog {
    api: Arc<dyn RentalApi>,
    notifier: Arc<dyn Notifier>,
    config: BookingConfig,
    confirm_button: ControlHandle,
    inner: Mutex<DialogInner>,
}

impl BookingDialog {
    fn new(
        car: &CarSummary,
        api: Arc<dyn RentalApi>,
        notifier: Arc<dyn Notifier>,
        config: BookingConfig,
        now: NaiveDateTime,
    ) -> Self {
        let now = truncate_to_minute(now);
        let context = BookingContext::for_car(car);
        let pricing = PricingSummary::new(None, None, context.daily_rate);

        Self {
            api,
            notifier,
            config,
            confirm_button: ControlHandle::new(CONFIRM_LABEL),
            inner: Mutex::new(DialogInner {
                context,
                state: DialogState::Open,
                pickup_min: now,
                return_min: now,
                pricing,
            }),
        }
    }

    pub fn state(&self) -> DialogState {
        self.inner.lock().state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state(), DialogState::Closed | DialogState::Confirmed)
    }

    pub fn context(&self) -> BookingContext {
        self.inner.lock().context.clone()
    }

    pub fn pricing(&self) -> PricingSummary {
        self.inner.lock().pricing.clone()
    }

    pub fn pickup_min(&self) -> NaiveDateTime {
        self.inner.lock().pickup_min
    }

    pub fn return_min(&self) -> NaiveDateTime {
        self.inner.lock().return_min
    }

    pub fn confirm_button(&self) -> &ControlHandle {
        &self.confirm_button
    }

    // A new pickup also becomes the return input's minimum; clearing it
    // puts the minimum back to the dialog's opening time
    pub fn set_pickup(&self, pickup: Option<NaiveDateTime>) {
        let mut inner = self.inner.lock();
        inner.context.pickup = pickup;
        inner.return_min = pickup.unwrap_or(inner.pickup_min);
        inner.reprice();
    }

    pub fn set_return(&self, return_at: Option<NaiveDateTime>) {
        let mut inner = self.inner.lock();
        inner.context.return_at = return_at;
        inner.reprice();
    }

    // Raw `datetime-local` value; anything unreadable counts as unset.
    pub fn set_pickup_input(&self, value: &str) {
        self.set_pickup(parse_datetime_input(value));
    }

    pub fn set_return_input(&self, value: &str) {
        self.set_return(parse_datetime_input(value));
    }

    pub fn set_special_requests(&self, text: &str) {
        self.inner.lock().context.special_requests = text.to_string();
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if inner.state != DialogState::Confirmed {
            inner.state = DialogState::Closed;
        }
    }

    // Validates the range, checks availability and reports the result.
    // Only one check runs at a time; the confirm button stays disabled
    // until it finishes.
    pub async fn confirm(&self) -> ConfirmOutcome {
        // Open -> Checking happens under one lock so a concurrent close()
        // is either seen here or sees Checking
        let (query, loading) = {
            let mut inner = self.inner.lock();
            if inner.state != DialogState::Open || !self.confirm_button.is_enabled() {
                return ConfirmOutcome::Ignored;
            }

            inner.state = DialogState::Validating;
            let query = match validate_range(&inner.context) {
                Ok(query) => query,
                Err(e) => {
                    inner.state = DialogState::Open;
                    drop(inner);
                    debug!(error = %e, "Booking rejected by validation");
                    self.notifier.alert(&e.to_string());
                    return ConfirmOutcome::Invalid(e);
                }
            };

            let Some(loading) = toggle_loading(&self.confirm_button) else {
                inner.state = DialogState::Open;
                return ConfirmOutcome::Ignored;
            };
            inner.state = DialogState::Checking;
            (query, loading)
        };

        debug!(car_id = query.car_id, "Checking availability");

        let available = check_car_availability(self.api.as_ref(), query).await;
        if available && self.config.confirmation_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.confirmation_delay_ms)).await;
        }

        let mut inner = self.inner.lock();
        if inner.state == DialogState::Closed {
            drop(inner);
            loading.restore();
            warn!(car_id = query.car_id, "Dialog closed before availability answer");
            return ConfirmOutcome::Dismissed;
        }

        if !available {
            inner.state = DialogState::Open;
            drop(inner);
            loading.restore();
            self.notifier.alert(UNAVAILABLE_MESSAGE);
            return ConfirmOutcome::Unavailable;
        }

        inner.state = DialogState::Confirmed;
        let context = inner.context.clone();
        drop(inner);
        loading.restore();

        let quote = RentalQuote::compute(Some(query.pickup), Some(query.return_at), context.daily_rate);
        let confirmation = BookingConfirmation {
            car_id: context.car_id,
            car_name: context.car_name,
            pickup: query.pickup,
            return_at: query.return_at,
            days: quote.map_or(0, |q| q.days),
            total: quote.map_or(Decimal::ZERO, |q| q.total),
            special_requests: context.special_requests,
        };

        info!(
            car_id = confirmation.car_id,
            days = confirmation.days,
            "Booking confirmed"
        );
        self.notifier.alert(&confirmation_message(&confirmation));
        ConfirmOutcome::Confirmed(confirmation)
    }

    // Dialog markup for the current state.
    pub fn render(&self) -> Element {
        let inner = self.inner.lock();
        let button = self.confirm_button.snapshot();
        let context = &inner.context;

        let confirm_content: Vec<Node> = if button.loading {
            vec![
                el("span").class("loading me-2").into(),
                LOADING_LABEL.into(),
            ]
        } else {
            vec![
                el("i").class("bi bi-check-circle me-2").into(),
                button.label.clone().into(),
            ]
        };
        let mut confirm = el("button")
            .attr("type", "button")
            .class("btn btn-primary")
            .id("confirm-booking")
            .children(confirm_content);
        if !button.enabled {
            confirm = confirm.attr("disabled", "disabled");
        }

        let header = el("div")
            .class("modal-header")
            .child(
                el("h5")
                    .class("modal-title")
                    .id("bookingModalLabel")
                    .child(el("i").class("bi bi-calendar-check me-2"))
                    .child(format!("Book {}", context.car_name)),
            )
            .child(
                el("button")
                    .attr("type", "button")
                    .class("btn-close")
                    .attr("data-bs-dismiss", "modal")
                    .attr("aria-label", "Close"),
            );

        let dates = el("div")
            .class("row")
            .child(datetime_field("pickup-date", "Pickup Date", inner.pickup_min, context.pickup))
            .child(datetime_field("return-date", "Return Date", inner.return_min, context.return_at));

        let pricing = el("div").class("row mt-3").child(
            el("div").class("col-md-12").child(
                el("div").class("card bg-light").child(
                    el("div")
                        .class("card-body")
                        .child(el("h6").child("Pricing Details"))
                        .child(pricing_row(
                            "Daily Rate:",
                            el("span").class("fw-bold").child(inner.pricing.daily_rate.clone()),
                        ))
                        .child(pricing_row(
                            "Duration:",
                            el("span").id("rental-duration").child(inner.pricing.duration.clone()),
                        ))
                        .child(el("hr"))
                        .child(pricing_row(
                            "Total:",
                            el("span")
                                .class("fw-bold text-primary")
                                .id("total-price")
                                .child(inner.pricing.total.clone()),
                        )),
                ),
            ),
        );

        let requests = el("div")
            .class("mt-3")
            .child(
                el("label")
                    .attr("for", "special-requests")
                    .class("form-label")
                    .child("Special Requests"),
            )
            .child(
                el("textarea")
                    .class("form-control")
                    .id("special-requests")
                    .attr("rows", "3")
                    .attr("placeholder", "Any special requests or notes...")
                    .child(context.special_requests.clone()),
            );

        let body = el("div").class("modal-body").child(
            el("form")
                .id("booking-form")
                .child(dates)
                .child(pricing)
                .child(requests),
        );

        let footer = el("div")
            .class("modal-footer")
            .child(
                el("button")
                    .attr("type", "button")
                    .class("btn btn-secondary")
                    .attr("data-bs-dismiss", "modal")
                    .child("Cancel"),
            )
            .child(confirm);

        el("div")
            .class("modal fade")
            .id(BOOKING_MODAL_ID)
            .attr("tabindex", "-1")
            .attr("aria-labelledby", "bookingModalLabel")
            .attr("aria-hidden", "true")
            .child(
                el("div").class("modal-dialog modal-lg").child(
                    el("div")
                        .class("modal-content")
                        .child(header)
                        .child(body)
                        .child(footer),
                ),
            )
    }

    pub fn render_html(&self) -> Result<String, MarkupError> {
        self.render().render()
    }
}

fn datetime_field(
    id: &'static str,
    label: &str,
    min: NaiveDateTime,
    value: Option<NaiveDateTime>,
) -> Element {
    let mut input = el("input")
        .attr("type", "datetime-local")
        .class("form-control")
        .id(id)
        .attr("required", "required")
        .attr("min", input_value(min));
    if let Some(value) = value {
        input = input.attr("value", input_value(value));
    }

    el("div")
        .class("col-md-6")
        .child(el("label").attr("for", id).class("form-label").child(label))
        .child(input)
}

fn pricing_row(label: &str, value: Element) -> Element {
    el("div")
        .class("d-flex justify-content-between")
        .child(el("span").child(label))
        .child(value)
}

fn truncate_to_minute(value: NaiveDateTime) -> NaiveDateTime {
    value
        .with_second(0)
        .and_then(|v| v.with_nanosecond(0))
        .unwrap_or(value)
}

pub fn confirmation_message(confirmation: &BookingConfirmation) -> String {
    format!(
        "Booking confirmed for {}!\nPickup: {}\nReturn: {}\nTotal: {}",
        confirmation.car_name,
        format_datetime(confirmation.pickup),
        format_datetime(confirmation.return_at),
        format_currency(confirmation.total)
    )
}

// Page-level owner of the booking dialog; at most one exists at a time.
pub struct BookingPage {
    api: Arc<dyn RentalApi>,
    notifier: Arc<dyn Notifier>,
    config: BookingConfig,
    current: Mutex<Option<Arc<BookingDialog>>>,
}

impl BookingPage {
    pub fn new(api: Arc<dyn RentalApi>, notifier: Arc<dyn Notifier>, config: BookingConfig) -> Self {
        Self {
            api,
            notifier,
            config,
            current: Mutex::new(None),
        }
    }

    pub fn open(&self, car: &CarSummary) -> Arc<BookingDialog> {
        self.open_at(car, Local::now().naive_local())
    }

    // Opens a dialog whose date inputs start at `now`, replacing any
    // dialog that is already on the page.
    pub fn open_at(&self, car: &CarSummary, now: NaiveDateTime) -> Arc<BookingDialog> {
        let dialog = Arc::new(BookingDialog::new(
            car,
            Arc::clone(&self.api),
            Arc::clone(&self.notifier),
            self.config.clone(),
            now,
        ));

        if let Some(previous) = self.current.lock().replace(Arc::clone(&dialog)) {
            previous.close();
        }
        debug!(car_id = car.id, "Booking dialog opened");
        dialog
    }

    // Click on a `.btn-book-car` button.
    pub fn on_book_click<'a, F>(&self, dataset: F) -> Result<Arc<BookingDialog>, AttributeError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let car = car_from_dataset(dataset)?;
        Ok(self.open(&car))
    }

    // The dialog on the page, if it is still open.
    pub fn current(&self) -> Option<Arc<BookingDialog>> {
        self.current
            .lock()
            .as_ref()
            .filter(|dialog| dialog.is_open())
            .cloned()
    }

    pub fn close(&self) {
        if let Some(dialog) = self.current.lock().take() {
            dialog.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock_api::MockRentalApi;
    use crate::ui::testing::RecordingNotifier;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn at(value: &str) -> NaiveDateTime {
        parse_datetime_input(value).unwrap()
    }

    fn corolla() -> CarSummary {
        CarSummary {
            id: 42,
            name: "Toyota Corolla".to_string(),
            daily_rate: dec!(45.00),
        }
    }

    fn page(api: &Arc<MockRentalApi>, notifier: &Arc<RecordingNotifier>, delay_ms: u64) -> BookingPage {
        BookingPage::new(
            Arc::clone(api) as Arc<dyn RentalApi>,
            Arc::clone(notifier) as Arc<dyn Notifier>,
            BookingConfig {
                confirmation_delay_ms: delay_ms,
            },
        )
    }

    fn setup(delay_ms: u64) -> (Arc<MockRentalApi>, Arc<RecordingNotifier>, BookingPage) {
        let api = Arc::new(MockRentalApi::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let page = page(&api, &notifier, delay_ms);
        (api, notifier, page)
    }

    #[test]
    fn test_car_from_dataset() {
        let attrs: HashMap<&str, &str> = [
            ("data-car-id", "42"),
            ("data-car-name", "Toyota Corolla"),
            ("data-daily-rate", "45.00"),
        ]
        .into_iter()
        .collect();

        let car = car_from_dataset(|name| attrs.get(name).copied()).unwrap();
        assert_eq!(car, corolla());
    }

    #[test]
    fn test_car_from_dataset_errors() {
        let missing = car_from_dataset(|name| match name {
            "data-car-id" => Some("42"),
            "data-daily-rate" => Some("45"),
            _ => None,
        });
        assert_eq!(missing, Err(AttributeError::Missing("data-car-name")));

        let bad_rate = car_from_dataset(|name| match name {
            "data-car-id" => Some("42"),
            "data-car-name" => Some("Corolla"),
            _ => Some("-3"),
        });
        assert!(matches!(
            bad_rate,
            Err(AttributeError::Invalid { name: "data-daily-rate", .. })
        ));

        let bad_id = car_from_dataset(|name| match name {
            "data-car-id" => Some("abc"),
            _ => Some("1"),
        });
        assert!(matches!(bad_id, Err(AttributeError::Invalid { name: "data-car-id", .. })));
    }

    #[test]
    fn test_validate_range() {
        let mut context = BookingContext::for_car(&corolla());
        assert_eq!(validate_range(&context), Err(ValidationError::MissingDates));

        context.pickup = Some(at("2024-06-03T10:00"));
        context.return_at = Some(at("2024-06-03T10:00"));
        assert_eq!(validate_range(&context), Err(ValidationError::ReturnNotAfterPickup));

        context.return_at = Some(at("2024-06-04T10:00"));
        let query = validate_range(&context).unwrap();
        assert_eq!(query.car_id, 42);
        assert_eq!(query.return_at, at("2024-06-04T10:00"));
    }

    #[test]
    fn test_open_starts_with_zero_pricing_and_now_minimum() {
        let (_api, _notifier, page) = setup(0);
        let dialog = page.open_at(&corolla(), at("2024-05-30T08:15:42"));

        assert_eq!(dialog.state(), DialogState::Open);
        assert_eq!(dialog.pickup_min(), at("2024-05-30T08:15"));
        assert_eq!(dialog.return_min(), at("2024-05-30T08:15"));

        let pricing = dialog.pricing();
        assert_eq!(pricing.daily_rate, "$45.00/day");
        assert_eq!(pricing.duration, "0 days");
        assert_eq!(pricing.total, "$0.00");
    }

    #[test]
    fn test_date_changes_reprice_and_raise_return_minimum() {
        let (_api, _notifier, page) = setup(0);
        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));

        dialog.set_pickup_input("2024-06-01T10:00");
        assert_eq!(dialog.return_min(), at("2024-06-01T10:00"));
        assert_eq!(dialog.pricing().total, "$0.00");

        dialog.set_return_input("2024-06-03T11:00");
        let pricing = dialog.pricing();
        assert_eq!(pricing.duration, "3 days");
        assert_eq!(pricing.total, "$135.00");

        // Moving pickup past return falls back to the zero display
        dialog.set_pickup_input("2024-06-04T10:00");
        assert_eq!(dialog.pricing().duration, "0 days");
        assert_eq!(dialog.pricing().total, "$0.00");

        dialog.set_pickup_input("");
        assert_eq!(dialog.context().pickup, None);
        assert_eq!(dialog.return_min(), at("2024-05-30T08:00"));
        assert_eq!(dialog.pickup_min(), at("2024-05-30T08:00"));
    }

    #[tokio::test]
    async fn test_confirm_without_dates_is_blocked() {
        let (api, notifier, page) = setup(0);
        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");

        let outcome = dialog.confirm().await;

        assert_eq!(outcome, ConfirmOutcome::Invalid(ValidationError::MissingDates));
        assert_eq!(notifier.messages(), vec!["Please select both pickup and return dates."]);
        assert!(api.availability_calls().await.is_empty());
        assert_eq!(dialog.state(), DialogState::Open);
        assert!(dialog.confirm_button().is_enabled());
    }

    #[tokio::test]
    async fn test_confirm_with_misordered_dates_is_blocked() {
        let (api, notifier, page) = setup(0);
        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-03T10:00");
        dialog.set_return_input("2024-06-01T10:00");

        let outcome = dialog.confirm().await;

        assert_eq!(
            outcome,
            ConfirmOutcome::Invalid(ValidationError::ReturnNotAfterPickup)
        );
        assert_eq!(notifier.messages(), vec!["Return date must be after pickup date."]);
        assert!(api.availability_calls().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_available_car_is_confirmed_and_dialog_closes() {
        let (api, notifier, page) = setup(1500);
        api.set_available(42, true).await;

        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-03T10:00");
        dialog.set_special_requests("Child seat please");

        let outcome = dialog.confirm().await;

        let confirmation = match outcome {
            ConfirmOutcome::Confirmed(confirmation) => confirmation,
            other => panic!("expected confirmation, got {:?}", other),
        };
        assert_eq!(confirmation.days, 2);
        assert_eq!(confirmation.total, dec!(90.00));
        assert_eq!(confirmation.special_requests, "Child seat please");

        let calls = api.availability_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            AvailabilityQuery {
                car_id: 42,
                pickup: at("2024-06-01T10:00"),
                return_at: at("2024-06-03T10:00"),
            }
        );

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Toyota Corolla"));
        assert!(messages[0].contains("June 1, 2024 10:00 AM"));
        assert!(messages[0].contains("June 3, 2024 10:00 AM"));

        assert_eq!(dialog.state(), DialogState::Confirmed);
        assert!(page.current().is_none());
        assert!(dialog.confirm_button().is_enabled());

        let json = serde_json::to_value(&confirmation).unwrap();
        assert_eq!(json["car_id"], 42);
        assert_eq!(json["pickup"], "2024-06-01T10:00:00");
        assert_eq!(json["total"], "90.00");
    }

    #[tokio::test]
    async fn test_unavailable_car_keeps_dialog_open() {
        let (api, notifier, page) = setup(0);
        api.set_available(42, false).await;

        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-03T10:00");

        let outcome = dialog.confirm().await;

        assert_eq!(outcome, ConfirmOutcome::Unavailable);
        assert_eq!(notifier.messages(), vec![UNAVAILABLE_MESSAGE]);
        assert_eq!(dialog.state(), DialogState::Open);
        assert!(page.current().is_some());

        let button = dialog.confirm_button().snapshot();
        assert!(button.enabled);
        assert!(!button.loading);
        assert_eq!(button.label, CONFIRM_LABEL);
    }

    #[tokio::test]
    async fn test_network_failure_counts_as_unavailable() {
        let (api, notifier, page) = setup(0);
        api.set_available(42, true).await;
        api.fail_next_requests(1);

        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-03T10:00");

        assert_eq!(dialog.confirm().await, ConfirmOutcome::Unavailable);
        assert_eq!(notifier.messages(), vec![UNAVAILABLE_MESSAGE]);

        // Rejected goes back to Open, so a retry is possible
        assert!(matches!(dialog.confirm().await, ConfirmOutcome::Confirmed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_button_is_loading_while_checking() {
        let (api, _notifier, page) = setup(0);
        api.set_available(42, true).await;
        api.set_delay(500);

        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-03T10:00");

        let running = tokio::spawn({
            let dialog = Arc::clone(&dialog);
            async move { dialog.confirm().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(dialog.state(), DialogState::Checking);
        let button = dialog.confirm_button().snapshot();
        assert!(!button.enabled);
        assert_eq!(button.label, LOADING_LABEL);
        let html = dialog.render_html().unwrap();
        assert!(html.contains(r#"id="confirm-booking" disabled="disabled""#));

        assert!(matches!(running.await.unwrap(), ConfirmOutcome::Confirmed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_confirm_issues_one_check() {
        let (api, notifier, page) = setup(0);
        api.set_available(42, true).await;
        api.set_delay(500);

        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-03T10:00");

        let (first, second) = futures::join!(dialog.confirm(), dialog.confirm());

        assert!(matches!(first, ConfirmOutcome::Confirmed(_)));
        assert_eq!(second, ConfirmOutcome::Ignored);
        assert_eq!(api.availability_calls().await.len(), 1);
        assert_eq!(notifier.messages().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_during_check_discards_answer() {
        let (api, notifier, page) = setup(0);
        api.set_available(42, true).await;
        api.set_delay(500);

        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-03T10:00");

        let running = tokio::spawn({
            let dialog = Arc::clone(&dialog);
            async move { dialog.confirm().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        page.close();

        assert_eq!(running.await.unwrap(), ConfirmOutcome::Dismissed);
        assert!(notifier.messages().is_empty());
        assert!(dialog.confirm_button().is_enabled());
        assert!(page.current().is_none());
    }

    #[tokio::test]
    async fn test_confirm_on_busy_or_closed_dialog_changes_nothing() {
        let (api, notifier, page) = setup(0);
        api.set_available(42, true).await;
        let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-03T10:00");

        let busy = toggle_loading(dialog.confirm_button()).unwrap();
        assert_eq!(dialog.confirm().await, ConfirmOutcome::Ignored);
        assert_eq!(dialog.state(), DialogState::Open);
        busy.restore();

        dialog.close();
        assert_eq!(dialog.confirm().await, ConfirmOutcome::Ignored);
        assert_eq!(dialog.state(), DialogState::Closed);
        assert!(dialog.confirm_button().is_enabled());

        assert!(api.availability_calls().await.is_empty());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_close_racing_confirm_is_never_overwritten() {
        for _ in 0..200 {
            let (api, notifier, page) = setup(0);
            api.set_available(42, true).await;
            let dialog = page.open_at(&corolla(), at("2024-05-30T08:00"));
            dialog.set_pickup_input("2024-06-01T10:00");
            dialog.set_return_input("2024-06-03T10:00");

            let confirming = tokio::spawn({
                let dialog = Arc::clone(&dialog);
                async move { dialog.confirm().await }
            });
            let closing = tokio::spawn({
                let dialog = Arc::clone(&dialog);
                async move {
                    dialog.close();
                    dialog.state()
                }
            });

            let after_close = closing.await.unwrap();
            let outcome = confirming.await.unwrap();

            // A close that landed first wins; otherwise the booking had already completed
            assert_eq!(dialog.state(), after_close);
            match after_close {
                DialogState::Closed => {
                    assert!(matches!(
                        outcome,
                        ConfirmOutcome::Ignored | ConfirmOutcome::Dismissed
                    ));
                    assert!(notifier.messages().is_empty());
                }
                DialogState::Confirmed => {
                    assert!(matches!(outcome, ConfirmOutcome::Confirmed(_)));
                }
                other => panic!("close left the dialog in {:?}", other),
            }
            assert!(dialog.confirm_button().is_enabled());
        }
    }

    #[test]
    fn test_open_replaces_existing_dialog() {
        let (_api, _notifier, page) = setup(0);
        let first = page.open_at(&corolla(), at("2024-05-30T08:00"));
        let second = page.open_at(
            &CarSummary {
                id: 7,
                name: "Honda Civic".to_string(),
                daily_rate: dec!(50),
            },
            at("2024-05-30T08:00"),
        );

        assert_eq!(first.state(), DialogState::Closed);
        let current = page.current().unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert_eq!(current.context().car_name, "Honda Civic");
    }

    #[tokio::test]
    async fn test_book_click_parses_button() {
        let (_api, _notifier, page) = setup(0);
        let dialog = page
            .on_book_click(|name| match name {
                "data-car-id" => Some("42"),
                "data-car-name" => Some("Toyota Corolla"),
                "data-daily-rate" => Some("45.00"),
                _ => None,
            })
            .unwrap();
        assert_eq!(dialog.context().car_id, 42);

        let err = page.on_book_click(|_| None).err().unwrap();
        assert_eq!(err, AttributeError::Missing("data-car-id"));
    }

    #[test]
    fn test_render_reflects_state_and_escapes_names() {
        let (_api, _notifier, page) = setup(0);
        let dialog = page.open_at(
            &CarSummary {
                id: 1,
                name: "<b>Mini</b> & \"Co\"".to_string(),
                daily_rate: dec!(30),
            },
            at("2024-05-30T08:00"),
        );
        dialog.set_pickup_input("2024-06-01T10:00");
        dialog.set_return_input("2024-06-02T12:00");

        let tree = dialog.render();
        assert_eq!(tree.attribute("id"), Some(BOOKING_MODAL_ID));
        assert_eq!(tree.find_by_id("rental-duration").unwrap().text_content(), "2 days");
        assert_eq!(tree.find_by_id("total-price").unwrap().text_content(), "$60.00");
        assert_eq!(
            tree.find_by_id("return-date").unwrap().attribute("min"),
            Some("2024-06-01T10:00")
        );

        let html = dialog.render_html().unwrap();
        assert!(html.contains("Book &lt;b&gt;Mini&lt;/b&gt; &amp;"));
        assert!(!html.contains("<b>Mini</b>"));
        assert!(html.contains(r#"<textarea class="form-control" id="special-requests""#));
    }
}
