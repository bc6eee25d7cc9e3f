// Search-as-you-type suggestions under the `#search-input` field

use crate::api::{car_detail_path, RentalApi};
use crate::debounce::DebounceTimer;
use crate::format::format_currency;
use crate::markup::{el, Element, MarkupError};
use crate::models::SearchResult;
use crate::ui::Navigator;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const SUGGESTIONS_ID: &str = "search-suggestions";

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub debounce_ms: u64,
    // Trimmed queries shorter than this hide the panel instead of searching
    pub min_query_chars: usize,
    pub result_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            min_query_chars: 3,
            result_limit: 5,
        }
    }
}

// The dropdown the suggestions are rendered into.
pub trait SuggestionPanel: Send + Sync + 'static {
    fn show(&self, results: &[SearchResult]);
    fn hide(&self);
}

#[derive(Debug, Default)]
struct ListState {
    rows: Vec<SearchResult>,
    visible: bool,
}

// `#search-suggestions` kept as rows plus a visibility flag.
#[derive(Debug, Default)]
pub struct SuggestionList {
    state: Mutex<ListState>,
}

impl SuggestionList {
    pub fn rows(&self) -> Vec<SearchResult> {
        self.state.lock().rows.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    pub fn render(&self) -> Element {
        let state = self.state.lock();
        let style = if state.visible {
            "display: block"
        } else {
            "display: none"
        };

        el("div")
            .id(SUGGESTIONS_ID)
            .attr("style", style)
            .children(state.rows.iter().map(suggestion_row))
    }

    pub fn render_html(&self) -> Result<String, MarkupError> {
        self.render().render()
    }
}

impl SuggestionPanel for SuggestionList {
    fn show(&self, results: &[SearchResult]) {
        let mut state = self.state.lock();
        state.rows = results.to_vec();
        state.visible = true;
    }

    // Rows stay rendered; only the panel is hidden
    fn hide(&self) {
        self.state.lock().visible = false;
    }
}

pub fn suggestion_row(result: &SearchResult) -> Element {
    el("div")
        .class("suggestion-item p-2 border-bottom")
        .attr("data-car-id", result.id.to_string())
        .child(
            el("div")
                .class("d-flex align-items-center")
                .child(el("i").class("bi bi-car-front me-2"))
                .child(
                    el("div")
                        .child(el("div").class("fw-bold").child(result.display_name.clone()))
                        .child(
                            el("small")
                                .class("text-muted")
                                .child(format!("{}/day", format_currency(result.daily_rate))),
                        ),
                ),
        )
}

struct SuggestionsInner {
    api: Arc<dyn RentalApi>,
    panel: Arc<dyn SuggestionPanel>,
    config: SearchConfig,
    // Bumped for every fired or abandoned query; older answers are dropped
    generation: AtomicU64,
}

impl SuggestionsInner {
    async fn fetch(&self, query: String) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(%query, generation, "Fetching suggestions");

        let results = match self.api.search_cars(&query, self.config.result_limit).await {
            Ok(results) => results,
            Err(e) => {
                warn!(%query, error = %e, "Error fetching suggestions");
                Vec::new()
            }
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(%query, generation, "Discarding stale suggestions");
            return;
        }
        self.panel.show(&results);
    }

    fn abandon(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.panel.hide();
    }
}

// Controller for the search field. Dropping it cancels a pending query.
pub struct SearchSuggestions {
    inner: Arc<SuggestionsInner>,
    navigator: Arc<dyn Navigator>,
    timer: DebounceTimer,
    input: Mutex<String>,
}

impl SearchSuggestions {
    pub fn new(
        api: Arc<dyn RentalApi>,
        panel: Arc<dyn SuggestionPanel>,
        navigator: Arc<dyn Navigator>,
        config: SearchConfig,
    ) -> Self {
        let timer = DebounceTimer::new(Duration::from_millis(config.debounce_ms));
        Self {
            inner: Arc::new(SuggestionsInner {
                api,
                panel,
                config,
                generation: AtomicU64::new(0),
            }),
            navigator,
            timer,
            input: Mutex::new(String::new()),
        }
    }

    // Current text of the search field.
    pub fn input_value(&self) -> String {
        self.input.lock().clone()
    }

    // The search field changed. Must be called from within a tokio runtime.
    pub fn on_input(&self, value: &str) {
        *self.input.lock() = value.to_string();
        self.timer.cancel();

        let query = value.trim();
        if query.chars().count() < self.inner.config.min_query_chars {
            self.inner.abandon();
            return;
        }

        let inner = Arc::clone(&self.inner);
        let query = query.to_string();
        self.timer.schedule(async move { inner.fetch(query).await });
    }

    pub fn on_select(&self, car_id: u64) {
        self.navigator.navigate(&car_detail_path(car_id));
    }

    // Any click on the page; `inside_search_container` tells whether it
    // landed within `.search-container`.
    pub fn on_document_click(&self, inside_search_container: bool) {
        if !inside_search_container {
            // Pending and in-flight queries must not reopen the panel
            self.timer.cancel();
            self.inner.abandon();
        }
    }
}
