// Page capabilities the controllers need from whatever hosts them

// Blocking user-visible message (the page's `alert`).
pub trait Notifier: Send + Sync + 'static {
    fn alert(&self, message: &str);
}

// Moves the page to another location.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, path: &str);
}

// Submits a form with the given query string.
pub trait FormSubmitter: Send + Sync + 'static {
    fn submit(&self, form_id: &str, query: &str);
}
