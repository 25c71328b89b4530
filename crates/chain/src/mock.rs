//! Mock chain backend for testing.
//!
//! Fully in-memory [`ChainQuery`] implementation — no network calls, no
//! chain node required.
//!
//! # Features
//!
//! - Deterministic behavior for reproducible tests
//! - Injectable deployments and group lists
//! - A failure switch that makes every query return an RPC error
//! - Optional per-query latency (async, non-blocking)
//! - Query counters for asserting fetch behavior
//!
//! # Example
//!
//! ```ignore
//! use dcm_chain::MockChain;
//!
//! let chain = MockChain::new();
//! chain.insert_deployment(deployment.clone());
//! chain.insert_groups(deployment.address, groups);
//! let record = chain.deployment(&deployment.address).await.unwrap();
//! ```

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dcm_common::types::{Deployment, DeploymentAddress, DeploymentGroup};

use crate::query::{ChainError, ChainQuery};

// ════════════════════════════════════════════════════════════════════════════
// MOCK CHAIN
// ════════════════════════════════════════════════════════════════════════════

/// In-memory chain state for tests.
#[derive(Debug, Default)]
pub struct MockChain {
    deployments: RwLock<HashMap<DeploymentAddress, Deployment>>,
    groups: RwLock<HashMap<DeploymentAddress, Vec<DeploymentGroup>>>,
    /// When set, every query fails with `ChainError::Rpc`.
    failing: AtomicBool,
    /// Simulated latency applied before each query resolves.
    latency_ms: u64,
    deployment_calls: AtomicU64,
    group_calls: AtomicU64,
}

impl MockChain {
    /// A clean mock with no latency and no failures.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose every query takes `ms` milliseconds to resolve. Useful
    /// for holding a fetch outstanding while a test races it.
    pub fn with_latency(ms: u64) -> Self {
        Self {
            latency_ms: ms,
            ..Self::default()
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // TEST HELPERS
    // ────────────────────────────────────────────────────────────────────

    /// Insert (or replace) a deployment record.
    pub fn insert_deployment(&self, deployment: Deployment) {
        self.deployments
            .write()
            .insert(deployment.address, deployment);
    }

    /// Insert (or replace) the group list for an address.
    pub fn insert_groups(&self, address: DeploymentAddress, groups: Vec<DeploymentGroup>) {
        self.groups.write().insert(address, groups);
    }

    /// Toggle the failure switch. While set, every query returns
    /// `ChainError::Rpc("injected failure")`.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `deployment` queries served (including failed ones).
    pub fn deployment_calls(&self) -> u64 {
        self.deployment_calls.load(Ordering::SeqCst)
    }

    /// Number of `deployment_groups` queries served (including failed ones).
    pub fn group_calls(&self) -> u64 {
        self.group_calls.load(Ordering::SeqCst)
    }

    async fn simulate(&self) -> Result<(), ChainError> {
        if self.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChainError::Rpc("injected failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainQuery for MockChain {
    async fn deployment(&self, address: &DeploymentAddress) -> Result<Deployment, ChainError> {
        self.deployment_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        self.deployments
            .read()
            .get(address)
            .cloned()
            .ok_or(ChainError::NotFound)
    }

    async fn deployment_groups(
        &self,
        address: &DeploymentAddress,
    ) -> Result<Vec<DeploymentGroup>, ChainError> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate().await?;
        // A deployment may legitimately have no groups yet.
        Ok(self.groups.read().get(address).cloned().unwrap_or_default())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use dcm_common::types::{DeploymentState, DeploymentVersion, GroupId};

    fn addr(seed: u8) -> DeploymentAddress {
        DeploymentAddress::new([seed; 32])
    }

    fn deployment(seed: u8) -> Deployment {
        Deployment {
            address: addr(seed),
            tenant: [0x01; 32],
            version: DeploymentVersion::new(vec![seed]),
            state: DeploymentState::Active,
        }
    }

    #[tokio::test]
    async fn test_insert_and_query_deployment() {
        let chain = MockChain::new();
        chain.insert_deployment(deployment(0x0A));

        let got = chain.deployment(&addr(0x0A)).await.expect("deployment");
        assert_eq!(got, deployment(0x0A));
        assert_eq!(chain.deployment_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_address_is_not_found() {
        let chain = MockChain::new();
        assert_eq!(
            chain.deployment(&addr(0x0B)).await,
            Err(ChainError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_groups_default_to_empty() {
        let chain = MockChain::new();
        chain.insert_deployment(deployment(0x0C));
        let groups = chain.deployment_groups(&addr(0x0C)).await.expect("groups");
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_inserted_groups_are_returned() {
        let chain = MockChain::new();
        let groups = vec![DeploymentGroup {
            id: GroupId {
                address: addr(0x0D),
                seq: 0,
            },
            name: "web".to_string(),
            resources: vec![],
        }];
        chain.insert_groups(addr(0x0D), groups.clone());
        assert_eq!(
            chain.deployment_groups(&addr(0x0D)).await.expect("groups"),
            groups
        );
    }

    #[tokio::test]
    async fn test_failure_switch() {
        let chain = MockChain::new();
        chain.insert_deployment(deployment(0x0E));

        chain.set_failing(true);
        assert!(matches!(
            chain.deployment(&addr(0x0E)).await,
            Err(ChainError::Rpc(_))
        ));

        chain.set_failing(false);
        assert!(chain.deployment(&addr(0x0E)).await.is_ok());
        assert_eq!(chain.deployment_calls(), 2);
    }
}
