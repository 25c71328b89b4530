//! Core Marketplace Types
//!
//! On-chain identities and records shared across the DCM provider stack:
//! deployment addresses, deployment and deployment-group records, resource
//! units, and lease identities.
//!
//! ## Identity Model
//!
//! ```text
//! DeploymentAddress ──┬── Deployment (record, versioned)
//!                     └── GroupId { address, seq } ── DeploymentGroup
//!
//! LeaseId { address, group_seq, order_seq, provider } ── LeaseWon
//! ```
//!
//! All types here are value types: `Clone`, `Debug`, serde-serializable,
//! and free of interior mutability.

use serde::{Deserialize, Serialize};
use std::fmt;

// ════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT ADDRESS
// ════════════════════════════════════════════════════════════════════════════

/// On-chain address identifying a deployment.
///
/// Assigned when the deployment is created on chain; immutable for the
/// deployment's lifetime. Displayed as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeploymentAddress([u8; 32]);

impl DeploymentAddress {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for DeploymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for DeploymentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT VERSION
// ════════════════════════════════════════════════════════════════════════════

/// Opaque version tag of a deployment record.
///
/// The chain bumps this whenever the tenant updates the deployment; the
/// provider treats it as bytes and only ever compares for equality.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct DeploymentVersion(Vec<u8>);

impl DeploymentVersion {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for DeploymentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for DeploymentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT RECORD
// ════════════════════════════════════════════════════════════════════════════

/// Lifecycle state of a deployment on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeploymentState {
    /// Deployment is live and may receive leases and manifests.
    Active,
    /// Deployment has been closed by the tenant or the chain.
    Closed,
}

/// A deployment record as queried from the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// On-chain address of the deployment.
    pub address: DeploymentAddress,
    /// Ed25519 public key of the tenant that owns the deployment.
    pub tenant: [u8; 32],
    /// Current version tag. Bumped by the chain on every tenant update.
    pub version: DeploymentVersion,
    /// Lifecycle state.
    pub state: DeploymentState,
}

// ════════════════════════════════════════════════════════════════════════════
// RESOURCES
// ════════════════════════════════════════════════════════════════════════════

/// Resources for a single workload instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUnit {
    /// CPU in millicores.
    pub cpu: u32,
    /// Memory in bytes.
    pub memory: u64,
    /// Ephemeral storage in bytes.
    pub storage: u64,
}

/// A homogeneous block of resources inside a deployment group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGroup {
    /// Per-instance resources.
    pub unit: ResourceUnit,
    /// Number of instances.
    pub count: u32,
    /// Offered price per block, in the chain's smallest denomination.
    pub price: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT GROUP
// ════════════════════════════════════════════════════════════════════════════

/// Identity of a deployment group: the deployment address plus the group's
/// sequence number within that deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId {
    pub address: DeploymentAddress,
    pub seq: u32,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.seq)
    }
}

/// A subdivision of a deployment's resource requirements.
///
/// Leases are awarded against groups; manifests are validated against the
/// group set of their deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentGroup {
    pub id: GroupId,
    /// Tenant-chosen group name; manifest groups are matched by this name.
    pub name: String,
    /// Resource blocks requested by the group.
    pub resources: Vec<ResourceGroup>,
}

impl DeploymentGroup {
    /// Total CPU (millicores) across all resource blocks.
    pub fn total_cpu(&self) -> u64 {
        self.resources
            .iter()
            .map(|r| u64::from(r.unit.cpu) * u64::from(r.count))
            .sum()
    }

    /// Total memory (bytes) across all resource blocks.
    pub fn total_memory(&self) -> u128 {
        self.resources
            .iter()
            .map(|r| u128::from(r.unit.memory) * u128::from(r.count))
            .sum()
    }

    /// Total storage (bytes) across all resource blocks.
    pub fn total_storage(&self) -> u128 {
        self.resources
            .iter()
            .map(|r| u128::from(r.unit.storage) * u128::from(r.count))
            .sum()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LEASES
// ════════════════════════════════════════════════════════════════════════════

/// Identity of a lease: which group of which deployment, which order filled
/// it, and which provider won it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaseId {
    pub address: DeploymentAddress,
    pub group_seq: u32,
    pub order_seq: u32,
    /// Provider account key that won the order.
    pub provider: [u8; 32],
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.address,
            self.group_seq,
            self.order_seq,
            hex::encode(&self.provider[..4])
        )
    }
}

/// Notification that a lease was awarded to this provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseWon {
    pub id: LeaseId,
    /// The deployment group the lease was awarded against.
    pub group: DeploymentGroup,
    /// Winning price, in the chain's smallest denomination.
    pub price: u64,
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
