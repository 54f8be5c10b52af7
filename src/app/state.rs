//! Application state management.
//!
//! This module provides the shared application state that is
//! accessible to all request handlers via Axum's State extractor.

use std::sync::Arc;
use std::time::Duration;

use crate::config::RefreshMode;
use crate::infra::MetricStore;

use super::service::ExporterService;

/// Longest a scrape waits for its refresh before serving stale values.
///
/// Kept below the router's request timeout so `/metrics` always answers.
pub const DEFAULT_SCRAPE_DEADLINE: Duration = Duration::from_secs(25);

/// Shared application state for the Axum web server.
///
/// # Thread Safety
///
/// All contained types are wrapped in `Arc` and implement `Send + Sync`,
/// making `AppState` safe to share across async tasks.
#[derive(Clone)]
pub struct AppState {
    /// The service refreshing metric values.
    pub service: Arc<ExporterService>,

    /// Store rendered on every scrape.
    pub metrics: Arc<MetricStore>,

    /// Whether scrapes trigger a refresh before rendering.
    pub refresh_mode: RefreshMode,

    /// Upper bound on the refresh a scrape waits for.
    pub scrape_deadline: Duration,
}

impl AppState {
    /// Creates a new `AppState` sharing the service's metric store.
    #[must_use]
    pub fn new(service: Arc<ExporterService>, refresh_mode: RefreshMode) -> Self {
        let metrics = Arc::clone(service.metrics());
        Self {
            service,
            metrics,
            refresh_mode,
            scrape_deadline: DEFAULT_SCRAPE_DEADLINE,
        }
    }

    /// Replaces the scrape refresh deadline.
    #[must_use]
    pub fn with_scrape_deadline(mut self, deadline: Duration) -> Self {
        self.scrape_deadline = deadline;
        self
    }

    /// Whether `/metrics` must refresh before rendering.
    #[must_use]
    pub fn refreshes_on_scrape(&self) -> bool {
        self.refresh_mode == RefreshMode::Scrape
    }
}
