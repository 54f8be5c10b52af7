//! Cosmos Node Exporter
//!
//! A Prometheus exporter that turns a Cosmos SDK node's local REST API,
//! address book and live peer connections into health gauges.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                   API Layer                  │
//! │       /metrics exposition, health probes     │
//! ├─────────────────────────────────────────────┤
//! │               Application Layer              │
//! │   Refresh pipeline, interval workers, state  │
//! ├─────────────────────────────────────────────┤
//! │                 Domain Layer                 │
//! │   Traits, node status, address sets, errors  │
//! ├─────────────────────────────────────────────┤
//! │             Infrastructure Layer             │
//! │  REST client, address book, procfs, gauges   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Exported metrics
//!
//! - `cosmos_block_number`: height of the latest block
//! - `cosmos_block_time_skew`: nanoseconds between now and the latest block's timestamp
//! - `cosmos_node_peers`: address book entries with a live connection on the peer port
//! - `cosmos_addrbook_peers`: entries in the address book
//! - `cosmos_validator_count`: size of the latest validator set (opt-in)
//! - `cosmos_exporter_refresh_failures_total`: failed refreshes per metric
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cosmos_node_exporter::api::create_router;
//! use cosmos_node_exporter::app::{AppState, ExporterService};
//! use cosmos_node_exporter::config::RefreshMode;
//! use cosmos_node_exporter::infra::{FileAddressBook, MetricStore, ProcNetConnectionTable, RestNodeClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = ExporterService::new(
//!         Arc::new(RestNodeClient::with_defaults("http://127.0.0.1:1317")?),
//!         Arc::new(FileAddressBook::new("/root/.gaia/config/addrbook.json")),
//!         Arc::new(ProcNetConnectionTable::new()),
//!         Arc::new(MetricStore::default()),
//!         26656,
//!     );
//!     let state = Arc::new(AppState::new(Arc::new(service), RefreshMode::Scrape));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, create_router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod app;
pub mod config;
pub mod domain;
pub mod infra;

// Test utilities are available in tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
