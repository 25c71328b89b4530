//! Chain Query Contract
//!
//! [`ChainQuery`] is the read-only interface the provider uses to resolve a
//! deployment address into on-chain records. Implementations must be safe to
//! share across tasks (`Send + Sync`); callers hold them as `Arc<dyn
//! ChainQuery>`.

use async_trait::async_trait;
use thiserror::Error;

use dcm_common::types::{Deployment, DeploymentAddress, DeploymentGroup};

// ════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by chain queries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChainError {
    /// No deployment exists at the queried address.
    #[error("deployment not found")]
    NotFound,

    /// Transport-level failure talking to the chain node.
    #[error("chain rpc error: {0}")]
    Rpc(String),

    /// The chain node answered with something we could not decode.
    #[error("chain response decode error: {0}")]
    Decode(String),

    /// The query was abandoned because its owner is shutting down.
    #[error("chain query cancelled")]
    Cancelled,
}

// ════════════════════════════════════════════════════════════════════════════
// SNAPSHOT
// ════════════════════════════════════════════════════════════════════════════

/// A consistent view of a deployment and its groups, as of one fetch.
///
/// The snapshot is replaced wholesale on re-fetch; the only in-place
/// mutation callers perform is overwriting `deployment.version` when a
/// version update arrives out of band, in which case `groups` may be stale
/// until the next fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSnapshot {
    pub deployment: Deployment,
    pub groups: Vec<DeploymentGroup>,
}

// ════════════════════════════════════════════════════════════════════════════
// QUERY TRAIT
// ════════════════════════════════════════════════════════════════════════════

/// Read-only access to deployment state on chain.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Resolve the deployment record at `address`.
    async fn deployment(&self, address: &DeploymentAddress) -> Result<Deployment, ChainError>;

    /// List the deployment groups declared under `address`.
    ///
    /// An existing deployment with no groups yields an empty vector, not an
    /// error.
    async fn deployment_groups(
        &self,
        address: &DeploymentAddress,
    ) -> Result<Vec<DeploymentGroup>, ChainError>;
}
