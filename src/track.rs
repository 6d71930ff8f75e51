//! Analytics tracking joined to the unit of work.
//!
//! Each event or page view is sent from a background thread once the
//! transaction commits. Nothing is sent in development mode.

use std::sync::Arc;

use crate::config::Settings;
use crate::dispatcher::{call_in_background, DeferredCall};
use crate::hooks::CommitHooks;
use crate::TransactionResult;

/// A custom analytics event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub category: String,
    pub action: String,
    pub label: Option<String>,
    pub value: Option<i64>,
    pub noninteraction: bool,
}

impl Event {
    pub fn new(category: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            label: None,
            value: None,
            noninteraction: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn noninteraction(mut self) -> Self {
        self.noninteraction = true;
        self
    }
}

/// A page view, possibly virtual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub path: String,
}

impl Page {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Delivers analytics hits. Called from a background thread.
pub trait AnalyticsBackend: Send + Sync + 'static {
    /// Send a custom event hit.
    fn track_event(&self, event: Event) -> TransactionResult<()>;

    /// Send a page view hit.
    fn track_pageview(&self, page: Page) -> TransactionResult<()>;
}

/// Analytics helper that sends hits in the background after commit.
pub struct Tracker<B: AnalyticsBackend> {
    settings: Arc<Settings>,
    backend: Arc<B>,
}

impl<B: AnalyticsBackend> Tracker<B> {
    /// Create a tracker; development mode in `settings` disables it.
    pub fn new(settings: Arc<Settings>, backend: Arc<B>) -> Self {
        Self { settings, backend }
    }

    /// Queue `event`. Returns whether anything was joined to `tx`.
    pub fn track_event<T>(&self, tx: &T, event: Event) -> bool
    where
        T: CommitHooks + ?Sized,
    {
        if self.settings.is_development() {
            return false;
        }
        let backend = Arc::clone(&self.backend);
        let label = format!("track event {}/{}", event.category, event.action);
        let call = DeferredCall::with_args(move |event: Event| backend.track_event(event), event).labelled(label);
        call_in_background(tx, call);
        true
    }

    /// Queue a page view for `page`. Returns whether anything was joined to `tx`.
    pub fn track_page<T>(&self, tx: &T, page: Page) -> bool
    where
        T: CommitHooks + ?Sized,
    {
        if self.settings.is_development() {
            return false;
        }
        let backend = Arc::clone(&self.backend);
        let label = format!("track page {}", page.path);
        let call = DeferredCall::with_args(move |page: Page| backend.track_pageview(page), page).labelled(label);
        call_in_background(tx, call);
        true
    }
}
