//! Application layer containing the refresh pipeline and shared state.

pub mod service;
pub mod state;
pub mod worker;

pub use service::{ExporterService, PeerCounts};
pub use state::{AppState, DEFAULT_SCRAPE_DEADLINE};
pub use worker::{MetricRefreshWorker, WorkerConfig, spawn_workers};
