use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::ChainStatusError;

/// Latest block header fields as reported by the node's REST API.
///
/// Both fields are kept exactly as the node sent them; numeric and time
/// values are derived on demand so a bad field only affects its own metric.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeStatus {
    pub block_height: String,
    pub block_timestamp: String,
}

impl NodeStatus {
    pub fn new(block_height: impl Into<String>, block_timestamp: impl Into<String>) -> Self {
        Self {
            block_height: block_height.into(),
            block_timestamp: block_timestamp.into(),
        }
    }

    /// Parses the height text as a base-10 number.
    ///
    /// # Errors
    /// Returns [`ChainStatusError::InvalidHeight`] for empty, non-numeric or
    /// non-finite input.
    pub fn block_height(&self) -> Result<f64, ChainStatusError> {
        self.block_height
            .parse::<f64>()
            .ok()
            .filter(|height| height.is_finite())
            .ok_or_else(|| ChainStatusError::InvalidHeight(self.block_height.clone()))
    }

    /// Parses the RFC 3339 block timestamp (fractional seconds allowed).
    pub fn block_time(&self) -> Result<DateTime<Utc>, ChainStatusError> {
        DateTime::parse_from_rfc3339(&self.block_timestamp)
            .map(|time| time.with_timezone(&Utc))
            .map_err(|_| ChainStatusError::InvalidTimestamp(self.block_timestamp.clone()))
    }

    /// Signed distance from the block timestamp to `now`.
    ///
    /// Positive when the block is in the past, negative when the node's
    /// clock runs ahead of ours.
    pub fn time_skew(&self, now: DateTime<Utc>) -> Result<TimeDelta, ChainStatusError> {
        Ok(now.signed_duration_since(self.block_time()?))
    }

    /// [`Self::time_skew`] expressed in nanoseconds.
    pub fn time_skew_nanos(&self, now: DateTime<Utc>) -> Result<f64, ChainStatusError> {
        let skew = self.time_skew(now)?;
        skew.num_nanoseconds()
            .map(|nanos| nanos as f64)
            .ok_or_else(|| ChainStatusError::SkewOutOfRange(skew.to_string()))
    }
}

/// Validator entries of the latest validator set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidatorSet {
    pub addresses: Vec<String>,
}

impl ValidatorSet {
    pub fn new(addresses: Vec<String>) -> Self {
        Self { addresses }
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

/// Set of single-host IP addresses.
///
/// IPv4-mapped IPv6 addresses are folded to plain IPv4 on insert so an
/// address read from `/proc/net/tcp6` compares equal to the same address
/// written in dotted form in the address book.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    addrs: HashSet<IpAddr>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a normalized address. Returns false if it was already present.
    pub fn insert(&mut self, ip: IpAddr) -> bool {
        self.addrs.insert(ip.to_canonical())
    }

    /// Parses an IP literal and inserts it.
    ///
    /// Returns `None` when `raw` is not a valid IP literal, leaving the set
    /// untouched.
    pub fn insert_literal(&mut self, raw: &str) -> Option<bool> {
        normalize_ip(raw).map(|ip| self.insert(ip))
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.addrs.contains(&ip.to_canonical())
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpAddr> {
        self.addrs.iter()
    }

    /// Number of addresses present in both sets.
    pub fn intersection_count(&self, other: &AddressSet) -> usize {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .addrs
            .iter()
            .filter(|ip| large.addrs.contains(ip))
            .count()
    }
}

impl FromIterator<IpAddr> for AddressSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        let mut set = AddressSet::new();
        for ip in iter {
            set.insert(ip);
        }
        set
    }
}

/// Parses a single-host IP literal into its canonical form.
pub fn normalize_ip(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}

/// Metrics refreshed by the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    BlockHeight,
    TimeSkew,
    Peers,
    Validators,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::BlockHeight,
        MetricKind::TimeSkew,
        MetricKind::Peers,
        MetricKind::Validators,
    ];

    /// Label value used on the refresh failure counter.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::BlockHeight => "block_height",
            MetricKind::TimeSkew => "time_skew",
            MetricKind::Peers => "peers",
            MetricKind::Validators => "validators",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Health check status for upstream sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Health check response for the exporter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub node_api: HealthStatus,
    pub address_book: HealthStatus,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn new(node_api: HealthStatus, address_book: HealthStatus) -> Self {
        let status = match (&node_api, &address_book) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            (HealthStatus::Unhealthy, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };

        Self {
            status,
            node_api,
            address_book,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn set(ips: &[&str]) -> AddressSet {
        let mut set = AddressSet::new();
        for ip in ips {
            set.insert_literal(ip).unwrap();
        }
        set
    }

    #[test]
    fn test_block_height_parses_decimal_text() {
        let status = NodeStatus::new("12345", "2024-01-01T00:00:00Z");
        assert_eq!(status.block_height().unwrap(), 12345.0);

        let status = NodeStatus::new("9007199254740993", "");
        assert_eq!(status.block_height().unwrap(), 9007199254740993_f64);
    }

    #[test]
    fn test_block_height_rejects_garbage() {
        for bad in ["", "abc", "12a", " 12", "NaN", "inf"] {
            let status = NodeStatus::new(bad, "");
            assert_eq!(
                status.block_height(),
                Err(ChainStatusError::InvalidHeight(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_time_skew_past_block_is_positive() {
        let status = NodeStatus::new("1", "2024-01-01T00:00:00.000000000Z");
        let skew = status.time_skew(at("2024-01-01T00:00:05Z")).unwrap();
        assert_eq!(skew, TimeDelta::seconds(5));

        let nanos = status.time_skew_nanos(at("2024-01-01T00:00:05Z")).unwrap();
        assert_eq!(nanos, 5_000_000_000.0);
    }

    #[test]
    fn test_time_skew_future_block_is_negative() {
        let status = NodeStatus::new("1", "2024-01-01T00:00:10.250000000Z");
        let skew = status.time_skew(at("2024-01-01T00:00:10Z")).unwrap();
        assert_eq!(skew, TimeDelta::milliseconds(-250));
    }

    #[test]
    fn test_time_skew_keeps_nanosecond_precision() {
        let status = NodeStatus::new("1", "2024-01-01T00:00:00.000000001Z");
        let nanos = status
            .time_skew_nanos(at("2024-01-01T00:00:00.000000003Z"))
            .unwrap();
        assert_eq!(nanos, 2.0);
    }

    #[test]
    fn test_time_skew_honours_offsets() {
        let status = NodeStatus::new("1", "2024-01-01T02:00:00+02:00");
        let skew = status.time_skew(at("2024-01-01T00:00:01Z")).unwrap();
        assert_eq!(skew, TimeDelta::seconds(1));
    }

    #[test]
    fn test_time_skew_rejects_bad_timestamp() {
        let status = NodeStatus::new("1", "yesterday");
        assert_eq!(
            status.time_skew(Utc::now()),
            Err(ChainStatusError::InvalidTimestamp("yesterday".to_string()))
        );
    }

    #[test]
    fn test_intersection_is_symmetric() {
        let a = set(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        let b = set(&["10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5"]);
        assert_eq!(a.intersection_count(&b), 2);
        assert_eq!(b.intersection_count(&a), 2);
    }

    #[test]
    fn test_intersection_of_disjoint_sets_is_zero() {
        let a = set(&["10.0.0.1", "10.0.0.2"]);
        let b = set(&["192.168.0.1"]);
        assert_eq!(a.intersection_count(&b), 0);
        assert_eq!(a.intersection_count(&AddressSet::new()), 0);
    }

    #[test]
    fn test_intersection_of_subset_is_subset_size() {
        let a = set(&["10.0.0.1", "10.0.0.2"]);
        let b = set(&["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(a.intersection_count(&b), a.len());
    }

    #[test]
    fn test_address_set_deduplicates() {
        let mut addrs = AddressSet::new();
        assert_eq!(addrs.insert_literal("10.0.0.1"), Some(true));
        assert_eq!(addrs.insert_literal("10.0.0.1"), Some(false));
        assert_eq!(addrs.len(), 1);
    }

    #[test]
    fn test_address_set_folds_ipv4_mapped() {
        let mut addrs = AddressSet::new();
        addrs.insert(IpAddr::V6(Ipv4Addr::new(10, 0, 0, 7).to_ipv6_mapped()));
        assert!(addrs.contains(&IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))));
        assert_eq!(addrs.insert_literal("::ffff:10.0.0.7"), Some(false));
    }

    #[test]
    fn test_normalize_ip() {
        assert_eq!(
            normalize_ip("10.0.0.1"),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)))
        );
        assert_eq!(normalize_ip("::1"), Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(normalize_ip("10.0.0.256"), None);
        assert_eq!(normalize_ip("10.0.0.1/32"), None);
        assert_eq!(normalize_ip(""), None);
    }

    #[test]
    fn test_metric_kind_labels_are_unique() {
        let labels: HashSet<_> = MetricKind::ALL.iter().map(MetricKind::as_str).collect();
        assert_eq!(labels.len(), MetricKind::ALL.len());
        assert_eq!(MetricKind::Peers.to_string(), "peers");
    }

    #[test]
    fn test_health_response_healthy() {
        let response = HealthResponse::new(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_eq!(response.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_health_response_degraded() {
        let response = HealthResponse::new(HealthStatus::Healthy, HealthStatus::Unhealthy);
        assert_eq!(response.status, HealthStatus::Degraded);
    }

    #[test]
    fn test_health_response_unhealthy() {
        let response = HealthResponse::new(HealthStatus::Unhealthy, HealthStatus::Unhealthy);
        assert_eq!(response.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Degraded).unwrap();
        assert_eq!(json, "\"degraded\"");
    }
}
