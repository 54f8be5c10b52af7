//! Prometheus gauges published by the exporter.
//!
//! The store owns its own recorder instead of installing a global one, so
//! several stores (one per test, for instance) can live in one process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::{Counter, Gauge, counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::domain::MetricKind;

pub const BLOCK_NUMBER: &str = "cosmos_block_number";
pub const BLOCK_TIME_SKEW: &str = "cosmos_block_time_skew";
pub const NODE_PEERS: &str = "cosmos_node_peers";
pub const ADDRBOOK_PEERS: &str = "cosmos_addrbook_peers";
pub const VALIDATOR_COUNT: &str = "cosmos_validator_count";
pub const REFRESH_FAILURES: &str = "cosmos_exporter_refresh_failures_total";

/// A gauge whose last value can also be read back.
struct GaugeCell {
    gauge: Gauge,
    bits: AtomicU64,
}

impl GaugeCell {
    fn new(gauge: Gauge) -> Self {
        gauge.set(0.0);
        Self {
            gauge,
            bits: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
        self.gauge.set(value);
    }

    fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

struct CounterCell {
    counter: Counter,
    count: AtomicU64,
}

impl CounterCell {
    fn new(counter: Counter) -> Self {
        counter.absolute(0);
        Self {
            counter,
            count: AtomicU64::new(0),
        }
    }

    fn increment(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.counter.increment(1);
    }

    fn get(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Last-value store for every exported metric.
///
/// Each gauge is written by a single refresh path and may be read at any
/// time; values are independent of one another.
pub struct MetricStore {
    handle: PrometheusHandle,
    block_height: GaugeCell,
    time_skew: GaugeCell,
    peers: GaugeCell,
    address_book_peers: GaugeCell,
    validators: Option<GaugeCell>,
    refresh_failures: HashMap<MetricKind, CounterCell>,
}

impl MetricStore {
    /// Create a store with its own Prometheus recorder.
    ///
    /// `cosmos_validator_count` is only registered when `track_validators`
    /// is set, so it never shows up as a misleading zero.
    #[must_use]
    pub fn new(track_validators: bool) -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            describe_gauge!(BLOCK_NUMBER, "Number of the latest block in chain");
            describe_gauge!(
                BLOCK_TIME_SKEW,
                "Difference between current timestamp and block timestamp, in nanoseconds"
            );
            describe_gauge!(NODE_PEERS, "Amount of chain peers");
            describe_gauge!(
                ADDRBOOK_PEERS,
                "Amount of peers listed in the address book"
            );
            describe_counter!(
                REFRESH_FAILURES,
                "Number of failed metric refreshes"
            );

            let validators = track_validators.then(|| {
                describe_gauge!(
                    VALIDATOR_COUNT,
                    "Amount of validators in the latest validator set"
                );
                GaugeCell::new(gauge!(VALIDATOR_COUNT))
            });

            let refresh_failures = MetricKind::ALL
                .into_iter()
                .filter(|kind| track_validators || *kind != MetricKind::Validators)
                .map(|kind| {
                    let counter = counter!(REFRESH_FAILURES, "metric" => kind.as_str());
                    (kind, CounterCell::new(counter))
                })
                .collect();

            Self {
                handle,
                block_height: GaugeCell::new(gauge!(BLOCK_NUMBER)),
                time_skew: GaugeCell::new(gauge!(BLOCK_TIME_SKEW)),
                peers: GaugeCell::new(gauge!(NODE_PEERS)),
                address_book_peers: GaugeCell::new(gauge!(ADDRBOOK_PEERS)),
                validators,
                refresh_failures,
            }
        })
    }

    pub fn set_block_height(&self, height: f64) {
        self.block_height.set(height);
    }

    pub fn block_height(&self) -> f64 {
        self.block_height.get()
    }

    /// Record the time skew in nanoseconds.
    pub fn set_time_skew(&self, nanos: f64) {
        self.time_skew.set(nanos);
    }

    pub fn time_skew(&self) -> f64 {
        self.time_skew.get()
    }

    pub fn set_peers(&self, count: usize) {
        self.peers.set(count as f64);
    }

    pub fn peers(&self) -> f64 {
        self.peers.get()
    }

    pub fn set_address_book_peers(&self, count: usize) {
        self.address_book_peers.set(count as f64);
    }

    pub fn address_book_peers(&self) -> f64 {
        self.address_book_peers.get()
    }

    #[must_use]
    pub fn tracks_validators(&self) -> bool {
        self.validators.is_some()
    }

    /// Ignored unless the store was created with validator tracking.
    pub fn set_validators(&self, count: usize) {
        if let Some(validators) = &self.validators {
            validators.set(count as f64);
        }
    }

    pub fn validators(&self) -> Option<f64> {
        self.validators.as_ref().map(GaugeCell::get)
    }

    pub fn record_failure(&self, kind: MetricKind) {
        if let Some(counter) = self.refresh_failures.get(&kind) {
            counter.increment();
        }
    }

    pub fn refresh_failures(&self, kind: MetricKind) -> u64 {
        self.refresh_failures
            .get(&kind)
            .map(CounterCell::get)
            .unwrap_or(0)
    }

    /// Render every metric in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for MetricStore {
    fn default() -> Self {
        Self::new(false)
    }
}
