//! Live TCP connection table read from procfs.

use async_trait::async_trait;
use std::net::SocketAddr;
use tracing::instrument;

use crate::domain::{AddressSet, AppError, ConnectionTable, ConnectionTableError};

/// Collect the remote IPs of every connection whose remote port is `port`.
pub fn remote_addresses_on_port<I>(remotes: I, port: u16) -> AddressSet
where
    I: IntoIterator<Item = SocketAddr>,
{
    remotes
        .into_iter()
        .filter(|remote| remote.port() == port)
        .map(|remote| remote.ip())
        .collect()
}

/// Connection table backed by `/proc/net/tcp` and `/proc/net/tcp6`
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcNetConnectionTable;

impl ProcNetConnectionTable {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
fn read_remote_endpoints() -> Result<Vec<SocketAddr>, AppError> {
    use tracing::debug;

    let mut remotes: Vec<SocketAddr> = procfs::net::tcp()
        .map_err(|e| ConnectionTableError::Unavailable(e.to_string()))?
        .into_iter()
        .map(|entry| entry.remote_address)
        .collect();

    // Hosts with IPv6 disabled have no tcp6 table
    match procfs::net::tcp6() {
        Ok(entries) => remotes.extend(entries.into_iter().map(|entry| entry.remote_address)),
        Err(e) => debug!(error = %e, "IPv6 connection table unavailable"),
    }

    Ok(remotes)
}

#[cfg(not(target_os = "linux"))]
fn read_remote_endpoints() -> Result<Vec<SocketAddr>, AppError> {
    Err(ConnectionTableError::Unsupported.into())
}

#[async_trait]
impl ConnectionTable for ProcNetConnectionTable {
    #[instrument(skip(self))]
    async fn remote_addresses(&self, port: u16) -> Result<AddressSet, AppError> {
        let remotes = tokio::task::spawn_blocking(read_remote_endpoints)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;
        Ok(remote_addresses_on_port(remotes, port))
    }
}
