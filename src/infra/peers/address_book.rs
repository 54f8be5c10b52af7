//! Tendermint `addrbook.json` reader.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use crate::domain::{AddressBook, AddressBookError, AddressSet, AppError};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AddrBookFile {
    // Entries stay untyped so one malformed entry cannot reject the file
    addrs: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct KnownAddress {
    addr: NetAddress,
}

#[derive(Debug, Deserialize)]
struct NetAddress {
    #[serde(default)]
    ip: Option<String>,
}

/// Result of parsing an address book.
#[derive(Debug, Clone, Default)]
pub struct ParsedAddressBook {
    pub addresses: AddressSet,
    /// Entries dropped for a missing or invalid IP literal
    pub skipped: usize,
}

/// Parse the raw contents of an address book file.
///
/// Entries with no `addr.ip` (e.g. id-only entries) or an invalid IP literal
/// are skipped and counted; only an undecodable document is an error.
pub fn parse_address_book(contents: &[u8]) -> Result<ParsedAddressBook, AddressBookError> {
    let file: AddrBookFile = serde_json::from_slice(contents)?;
    let mut parsed = ParsedAddressBook::default();

    for entry in file.addrs {
        let ip = serde_json::from_value::<KnownAddress>(entry)
            .ok()
            .and_then(|known| known.addr.ip);

        match ip.as_deref().map(|raw| parsed.addresses.insert_literal(raw)) {
            Some(Some(_)) => {}
            _ => {
                debug!(ip = ?ip, "Skipping malformed address book entry");
                parsed.skipped += 1;
            }
        }
    }

    Ok(parsed)
}

/// Address book backed by a JSON file on the local filesystem
pub struct FileAddressBook {
    path: PathBuf,
}

impl FileAddressBook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AddressBook for FileAddressBook {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<AddressSet, AppError> {
        let contents = tokio::fs::read(&self.path)
            .await
            .map_err(AddressBookError::from)?;
        let parsed = parse_address_book(&contents)?;

        if parsed.skipped > 0 {
            warn!(
                skipped = parsed.skipped,
                kept = parsed.addresses.len(),
                "Address book contains malformed entries"
            );
        }

        Ok(parsed.addresses)
    }
}
