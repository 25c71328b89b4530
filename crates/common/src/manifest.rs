//! Workload Manifests
//!
//! The manifest is the concrete workload specification a tenant submits for
//! execution once a lease is won: a set of named groups, each a list of
//! services with per-instance resources. `SubmitManifest` is the wire-level
//! submission — the manifest plus the deployment identity it targets and the
//! tenant's signature over the whole thing.
//!
//! ## Signing
//!
//! The signing message is a Sha3-256 digest over the deployment address, the
//! implied deployment version, and the JSON encoding of the manifest. The
//! signature is Ed25519 by the tenant key recorded in the deployment record;
//! verification lives in [`crate::validation`].

use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::types::{DeploymentAddress, DeploymentVersion};

// ════════════════════════════════════════════════════════════════════════════
// MANIFEST
// ════════════════════════════════════════════════════════════════════════════

/// A single service within a manifest group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Service name, unique within its group.
    pub name: String,
    /// Container image reference.
    pub image: String,
    /// Per-instance resources.
    pub unit: crate::types::ResourceUnit,
    /// Number of instances.
    pub count: u32,
}

/// A manifest group; matched to a deployment group by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestGroup {
    pub name: String,
    pub services: Vec<Service>,
}

impl ManifestGroup {
    /// Total CPU (millicores) requested by the group's services.
    pub fn total_cpu(&self) -> u64 {
        self.services
            .iter()
            .map(|s| u64::from(s.unit.cpu) * u64::from(s.count))
            .sum()
    }

    /// Total memory (bytes) requested by the group's services.
    pub fn total_memory(&self) -> u128 {
        self.services
            .iter()
            .map(|s| u128::from(s.unit.memory) * u128::from(s.count))
            .sum()
    }

    /// Total storage (bytes) requested by the group's services.
    pub fn total_storage(&self) -> u128 {
        self.services
            .iter()
            .map(|s| u128::from(s.unit.storage) * u128::from(s.count))
            .sum()
    }
}

/// A tenant workload manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub groups: Vec<ManifestGroup>,
}

// ════════════════════════════════════════════════════════════════════════════
// SUBMISSION
// ════════════════════════════════════════════════════════════════════════════

/// A signed manifest submission as received from a tenant.
///
/// `version` is the deployment version the tenant signed against; the
/// provider rejects the submission if it no longer matches the deployment
/// record on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitManifest {
    /// Deployment the manifest is for.
    pub address: DeploymentAddress,
    /// Deployment version the submission was built against.
    pub version: DeploymentVersion,
    /// The workload specification itself.
    pub manifest: Manifest,
    /// Tenant Ed25519 signature over [`SubmitManifest::signing_message`].
    pub signature: Vec<u8>,
}

impl SubmitManifest {
    /// The byte string the tenant signs: Sha3-256 over address, version, and
    /// the JSON encoding of the manifest.
    pub fn signing_message(
        address: &DeploymentAddress,
        version: &DeploymentVersion,
        manifest: &Manifest,
    ) -> Vec<u8> {
        let mut hasher = Sha3_256::new();
        hasher.update(address.as_bytes());
        hasher.update(version.as_bytes());
        // serde_json is deterministic for struct types: field order follows
        // the declaration order, no maps involved.
        let body = serde_json::to_vec(manifest).unwrap_or_default();
        hasher.update(&body);
        hasher.finalize().to_vec()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════
