//! HTTP/JSON chain client.
//!
//! Speaks the chain node's REST read API:
//!
//! - `GET {base}/deployments/{address}` → deployment record
//! - `GET {base}/deployments/{address}/groups` → group list
//!
//! Addresses are hex-encoded in paths. A 404 on either endpoint maps to
//! [`ChainError::NotFound`]; other non-success statuses map to
//! [`ChainError::Rpc`] with the body attached for diagnostics.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use dcm_common::types::{Deployment, DeploymentAddress, DeploymentGroup};

use crate::query::{ChainError, ChainQuery};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Chain client backed by a chain node's HTTP read API.
#[derive(Clone)]
pub struct RpcChainQuery {
    base: String,
    client: Client,
}

impl RpcChainQuery {
    /// Build a client against `base` (scheme + host + port, no trailing
    /// slash). Fails only if the underlying HTTP client cannot be built.
    pub fn new(base: impl Into<String>) -> Result<Self, ChainError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(Self {
            base: base.into(),
            client,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: String) -> Result<T, ChainError> {
        debug!(%url, "chain query");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(ChainError::NotFound),
            status if status.is_success() => resp
                .json::<T>()
                .await
                .map_err(|e| ChainError::Decode(e.to_string())),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(ChainError::Rpc(format!("{}: {}", status, body)))
            }
        }
    }
}

#[async_trait]
impl ChainQuery for RpcChainQuery {
    async fn deployment(&self, address: &DeploymentAddress) -> Result<Deployment, ChainError> {
        self.get_json(format!("{}/deployments/{}", self.base, address))
            .await
    }

    async fn deployment_groups(
        &self,
        address: &DeploymentAddress,
    ) -> Result<Vec<DeploymentGroup>, ChainError> {
        self.get_json(format!("{}/deployments/{}/groups", self.base, address))
            .await
    }
}
