//! Metric refresh service.
//!
//! This module contains the collection pipeline: it pulls raw data from
//! the node API, the address book and the connection table through trait
//! abstractions, derives the exported values and writes them to the
//! [`MetricStore`].

use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::domain::{
    AddressBook, AppError, Clock, ConnectionTable, HealthResponse, HealthStatus, MetricKind,
    NodeApiClient, SystemClock,
};
use crate::infra::MetricStore;

/// Peer counts produced by one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerCounts {
    /// Addresses listed in the address book
    pub known: usize,
    /// Known addresses with a live connection on the peer port
    pub connected: usize,
}

/// Service refreshing every exported metric.
///
/// Each refresh is independent: a failing source only leaves its own
/// gauge at the previous value and never touches the others.
///
/// # Example
///
/// ```ignore
/// let service = ExporterService::new(node_api, address_book, connections, metrics, 26656);
/// service.refresh_all().await;
/// let body = service.metrics().render();
/// ```
pub struct ExporterService {
    node_api: Arc<dyn NodeApiClient>,
    address_book: Arc<dyn AddressBook>,
    connections: Arc<dyn ConnectionTable>,
    clock: Arc<dyn Clock>,
    metrics: Arc<MetricStore>,
    peer_port: u16,
}

impl ExporterService {
    /// Creates a new `ExporterService` measuring skew against the system clock.
    ///
    /// # Arguments
    ///
    /// * `node_api` - REST client for block and validator data.
    /// * `address_book` - Source of the expected peer addresses.
    /// * `connections` - Source of the live peer connections.
    /// * `metrics` - Store the refreshed values are written to.
    /// * `peer_port` - Remote port identifying peer connections.
    #[must_use]
    pub fn new(
        node_api: Arc<dyn NodeApiClient>,
        address_book: Arc<dyn AddressBook>,
        connections: Arc<dyn ConnectionTable>,
        metrics: Arc<MetricStore>,
        peer_port: u16,
    ) -> Self {
        Self {
            node_api,
            address_book,
            connections,
            clock: Arc::new(SystemClock),
            metrics,
            peer_port,
        }
    }

    /// Replaces the clock used for time skew.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricStore> {
        &self.metrics
    }

    /// Metrics this service refreshes, in a stable order.
    #[must_use]
    pub fn enabled_metrics(&self) -> Vec<MetricKind> {
        MetricKind::ALL
            .into_iter()
            .filter(|kind| *kind != MetricKind::Validators || self.metrics.tracks_validators())
            .collect()
    }

    /// Fetches the latest block and records its height.
    #[instrument(skip(self))]
    pub async fn refresh_block_height(&self) -> Result<f64, AppError> {
        let status = self.node_api.latest_block().await?;
        let height = status.block_height()?;
        self.metrics.set_block_height(height);
        Ok(height)
    }

    /// Fetches the latest block and records how far its timestamp lags
    /// behind the clock, in nanoseconds.
    #[instrument(skip(self))]
    pub async fn refresh_time_skew(&self) -> Result<f64, AppError> {
        let status = self.node_api.latest_block().await?;
        let skew = status.time_skew_nanos(self.clock.now())?;
        self.metrics.set_time_skew(skew);
        Ok(skew)
    }

    /// Reconciles live peer connections with the address book.
    ///
    /// The address book size is recorded as soon as the book loads, even
    /// when the connection table cannot be read.
    #[instrument(skip(self))]
    pub async fn refresh_peers(&self) -> Result<PeerCounts, AppError> {
        let (expected, observed) = tokio::join!(
            self.address_book.load(),
            self.connections.remote_addresses(self.peer_port)
        );

        let expected = expected?;
        self.metrics.set_address_book_peers(expected.len());

        let observed = observed?;
        let connected = observed.intersection_count(&expected);
        self.metrics.set_peers(connected);

        Ok(PeerCounts {
            known: expected.len(),
            connected,
        })
    }

    /// Fetches the latest validator set and records its size.
    #[instrument(skip(self))]
    pub async fn refresh_validators(&self) -> Result<usize, AppError> {
        if !self.metrics.tracks_validators() {
            return Err(AppError::NotSupported(
                "validator tracking is disabled".to_string(),
            ));
        }
        let validators = self.node_api.validator_set().await?;
        self.metrics.set_validators(validators.len());
        Ok(validators.len())
    }

    /// Refreshes one metric, logging and counting a failure instead of
    /// returning it. Returns whether the refresh succeeded.
    pub async fn refresh(&self, kind: MetricKind) -> bool {
        let result = match kind {
            MetricKind::BlockHeight => self.refresh_block_height().await,
            MetricKind::TimeSkew => self.refresh_time_skew().await,
            MetricKind::Peers => self
                .refresh_peers()
                .await
                .map(|counts| counts.connected as f64),
            MetricKind::Validators => self.refresh_validators().await.map(|count| count as f64),
        };

        match result {
            Ok(value) => {
                debug!(metric = %kind, value = value, "Metric refreshed");
                true
            }
            Err(e) => {
                warn!(metric = %kind, error = %e, "Metric refresh failed, keeping previous value");
                self.metrics.record_failure(kind);
                false
            }
        }
    }

    /// Refreshes every enabled metric concurrently and waits for all of them.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) {
        let validators = async {
            if self.metrics.tracks_validators() {
                self.refresh(MetricKind::Validators).await;
            }
        };

        tokio::join!(
            self.refresh(MetricKind::BlockHeight),
            self.refresh(MetricKind::TimeSkew),
            self.refresh(MetricKind::Peers),
            validators,
        );
    }

    /// Performs a health check on the node API and the address book.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> HealthResponse {
        let (node_api, address_book) =
            tokio::join!(self.node_api.health_check(), self.address_book.load());

        let node_api_health = match node_api {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Node API health check failed");
                HealthStatus::Unhealthy
            }
        };

        let address_book_health = match address_book {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Address book health check failed");
                HealthStatus::Unhealthy
            }
        };

        HealthResponse::new(node_api_health, address_book_health)
    }
}
