//! REST client for a Cosmos SDK node's light client daemon.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument};

use crate::domain::{AppError, NodeApiClient, NodeApiError, NodeStatus, ValidatorSet};

const LATEST_BLOCK_ROUTE: &str = "blocks/latest";
const LATEST_VALIDATOR_SET_ROUTE: &str = "validatorsets/latest";

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct RestClientConfig {
    pub timeout: Duration,
}

impl Default for RestClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// Node REST API client
pub struct RestNodeClient {
    http_client: Client,
    base_url: String,
}

// Every level defaults so partial bodies decode to empty fields instead of
// failing; the extractor rejects the empty values afterwards.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlocksLatest {
    block: BlockEnvelope,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlockEnvelope {
    header: BlockHeader,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BlockHeader {
    height: String,
    time: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValidatorSetsLatest {
    result: ValidatorSetResult,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValidatorSetResult {
    validators: Vec<ValidatorEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ValidatorEntry {
    address: String,
}

impl From<BlocksLatest> for NodeStatus {
    fn from(body: BlocksLatest) -> Self {
        NodeStatus::new(body.block.header.height, body.block.header.time)
    }
}

impl From<ValidatorSetsLatest> for ValidatorSet {
    fn from(body: ValidatorSetsLatest) -> Self {
        ValidatorSet::new(
            body.result
                .validators
                .into_iter()
                .map(|validator| validator.address)
                .collect(),
        )
    }
}

impl RestNodeClient {
    /// Create a new REST client with custom configuration
    pub fn new(base_url: &str, config: RestClientConfig) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::NodeApi(NodeApiError::Connection(e.to_string())))?;
        info!(base_url = %base_url, timeout = ?config.timeout, "Created node API client");
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a new REST client with default configuration
    pub fn with_defaults(base_url: &str) -> Result<Self, AppError> {
        Self::new(base_url, RestClientConfig::default())
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}/{}", self.base_url, route)
    }

    /// GET `route` and decode the JSON body.
    ///
    /// The status code is not checked: whatever the node sends back is
    /// decoded. The body is read to the end before decoding so the
    /// connection goes back to the pool.
    async fn get_json<T: DeserializeOwned>(&self, route: &str) -> Result<T, AppError> {
        let url = self.url(route);
        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(NodeApiError::from)?;

        let status = response.status();
        if !status.is_success() {
            debug!(url = %url, status = %status, "Node API returned non-success status");
        }

        let body = response.bytes().await.map_err(NodeApiError::from)?;
        let decoded = serde_json::from_slice(&body).map_err(NodeApiError::from)?;
        Ok(decoded)
    }
}

#[async_trait]
impl NodeApiClient for RestNodeClient {
    #[instrument(skip(self))]
    async fn latest_block(&self) -> Result<NodeStatus, AppError> {
        let body: BlocksLatest = self.get_json(LATEST_BLOCK_ROUTE).await?;
        Ok(body.into())
    }

    #[instrument(skip(self))]
    async fn validator_set(&self) -> Result<ValidatorSet, AppError> {
        let body: ValidatorSetsLatest = self.get_json(LATEST_VALIDATOR_SET_ROUTE).await?;
        Ok(body.into())
    }
}
