//! Mock implementations for testing.
//!
//! These mocks provide in-memory implementations of domain traits
//! that can be reconfigured mid-test to simulate upstream changes,
//! failures and slow responses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::app::ExporterService;
use crate::domain::{
    AddressBook, AddressBookError, AddressSet, AppError, Clock, ConnectionTable,
    ConnectionTableError, NodeApiClient, NodeApiError, NodeStatus, ValidatorSet,
};
use crate::infra::MetricStore;

fn address_set(ips: &[&str]) -> AddressSet {
    let mut set = AddressSet::new();
    for ip in ips {
        set.insert_literal(ip);
    }
    set
}

/// Mock node REST API.
///
/// # Example
///
/// ```
/// use cosmos_node_exporter::test_utils::MockNodeApiClient;
///
/// let mock = MockNodeApiClient::new("100", "2024-01-01T00:00:00Z");
/// mock.set_failing(true);
/// ```
pub struct MockNodeApiClient {
    status: Mutex<NodeStatus>,
    validators: Mutex<ValidatorSet>,
    should_fail: AtomicBool,
    latency_ms: AtomicU64,
    latest_block_calls: AtomicU64,
    validator_set_calls: AtomicU64,
}

impl MockNodeApiClient {
    #[must_use]
    pub fn new(height: &str, time: &str) -> Self {
        Self {
            status: Mutex::new(NodeStatus::new(height, time)),
            validators: Mutex::new(ValidatorSet::default()),
            should_fail: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
            latest_block_calls: AtomicU64::new(0),
            validator_set_calls: AtomicU64::new(0),
        }
    }

    pub fn set_status(&self, height: &str, time: &str) {
        *self.status.lock().unwrap() = NodeStatus::new(height, time);
    }

    pub fn set_validators(&self, addresses: &[&str]) {
        *self.validators.lock().unwrap() =
            ValidatorSet::new(addresses.iter().map(|a| a.to_string()).collect());
    }

    /// Makes every call fail with a connection error.
    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::Relaxed);
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn latest_block_calls(&self) -> u64 {
        self.latest_block_calls.load(Ordering::Relaxed)
    }

    pub fn validator_set_calls(&self) -> u64 {
        self.validator_set_calls.load(Ordering::Relaxed)
    }

    async fn simulate(&self) -> Result<(), AppError> {
        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(AppError::NodeApi(NodeApiError::Connection(
                "Mock node unreachable".to_string(),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl NodeApiClient for MockNodeApiClient {
    async fn latest_block(&self) -> Result<NodeStatus, AppError> {
        self.latest_block_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate().await?;
        Ok(self.status.lock().unwrap().clone())
    }

    async fn validator_set(&self) -> Result<ValidatorSet, AppError> {
        self.validator_set_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate().await?;
        Ok(self.validators.lock().unwrap().clone())
    }
}

/// Mock address book holding an in-memory address set.
#[derive(Default)]
pub struct MockAddressBook {
    addresses: Mutex<AddressSet>,
    should_fail: AtomicBool,
}

impl MockAddressBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_addresses(ips: &[&str]) -> Self {
        let book = Self::new();
        book.set_addresses(ips);
        book
    }

    pub fn set_addresses(&self, ips: &[&str]) {
        *self.addresses.lock().unwrap() = address_set(ips);
    }

    /// Makes every load fail as if the file were missing.
    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::Relaxed);
    }
}

#[async_trait]
impl AddressBook for MockAddressBook {
    async fn load(&self) -> Result<AddressSet, AppError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(AppError::AddressBook(AddressBookError::FileAccess(
                "Mock address book missing".to_string(),
            )));
        }
        Ok(self.addresses.lock().unwrap().clone())
    }
}

/// Mock connection table returning a fixed set of remote addresses.
///
/// The port filter is assumed to have been applied; the requested port is
/// recorded so tests can check it.
#[derive(Default)]
pub struct MockConnectionTable {
    addresses: Mutex<AddressSet>,
    should_fail: AtomicBool,
    last_port: Mutex<Option<u16>>,
}

impl MockConnectionTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_addresses(ips: &[&str]) -> Self {
        let table = Self::new();
        table.set_addresses(ips);
        table
    }

    pub fn set_addresses(&self, ips: &[&str]) {
        *self.addresses.lock().unwrap() = address_set(ips);
    }

    pub fn set_failing(&self, failing: bool) {
        self.should_fail.store(failing, Ordering::Relaxed);
    }

    pub fn last_port(&self) -> Option<u16> {
        *self.last_port.lock().unwrap()
    }
}

#[async_trait]
impl ConnectionTable for MockConnectionTable {
    async fn remote_addresses(&self, port: u16) -> Result<AddressSet, AppError> {
        *self.last_port.lock().unwrap() = Some(port);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(AppError::ConnectionTable(ConnectionTableError::Unavailable(
                "Mock connection table unreadable".to_string(),
            )));
        }
        Ok(self.addresses.lock().unwrap().clone())
    }
}

/// Clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// # Panics
    /// Panics if `rfc3339` is not a valid RFC 3339 timestamp.
    #[must_use]
    pub fn at(rfc3339: &str) -> Self {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .expect("valid RFC 3339 timestamp")
            .with_timezone(&Utc);
        Self(now)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Service wired to mocks: block 12345 at `2024-01-01T00:00:00Z`, clock
/// five seconds later, address book `10.0.0.1, 10.0.0.2`, live peers
/// `10.0.0.2, 10.0.0.9`.
#[must_use]
pub fn test_service() -> ExporterService {
    test_service_with_node_api(Arc::new(MockNodeApiClient::new(
        "12345",
        "2024-01-01T00:00:00.000000000Z",
    )))
}

/// [`test_service`] with a caller-supplied node API mock.
#[must_use]
pub fn test_service_with_node_api(node_api: Arc<MockNodeApiClient>) -> ExporterService {
    ExporterService::new(
        node_api,
        Arc::new(MockAddressBook::with_addresses(&["10.0.0.1", "10.0.0.2"])),
        Arc::new(MockConnectionTable::with_addresses(&["10.0.0.2", "10.0.0.9"])),
        Arc::new(MetricStore::default()),
        crate::config::DEFAULT_PEER_PORT,
    )
    .with_clock(Arc::new(FixedClock::at("2024-01-01T00:00:05Z")))
}

/// Value of the first sample of `name` in a Prometheus text body.
///
/// Matches the bare metric name only, so `cosmos_node_peers` does not pick
/// up `cosmos_node_peers_total`.
pub fn scrape_value(body: &str, name: &str) -> Option<f64> {
    body.lines()
        .filter(|line| !line.starts_with('#'))
        .find(|line| {
            line.strip_prefix(name)
                .is_some_and(|rest| rest.starts_with(' ') || rest.starts_with('{'))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
