//! Domain traits defining contracts for external systems.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::AppError;
use super::types::{AddressSet, NodeStatus, ValidatorSet};

/// Client for the node's REST API
#[async_trait]
pub trait NodeApiClient: Send + Sync {
    /// Check REST API connectivity
    async fn health_check(&self) -> Result<(), AppError> {
        self.latest_block().await.map(|_| ())
    }

    /// Fetch the header of the latest block
    async fn latest_block(&self) -> Result<NodeStatus, AppError>;

    /// Fetch the latest validator set
    async fn validator_set(&self) -> Result<ValidatorSet, AppError>;
}

/// Source of the addresses the node is expected to peer with
#[async_trait]
pub trait AddressBook: Send + Sync {
    /// Load the current set of known peer addresses
    async fn load(&self) -> Result<AddressSet, AppError>;
}

/// Accessor for the host's live TCP connection table
#[async_trait]
pub trait ConnectionTable: Send + Sync {
    /// Remote addresses of all connections whose remote port is `port`
    async fn remote_addresses(&self, port: u16) -> Result<AddressSet, AppError>;
}

/// Wall clock used for time skew measurements
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
