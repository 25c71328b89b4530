//! # DCM Common Crate
//!
//! Shared domain types and rules for DCM (Decentralized Compute Marketplace).
//! Everything here is plain data plus pure functions — no IO, no runtime.
//!
//! ## Modules
//! - `types`: on-chain identities and records (deployments, groups, leases)
//! - `manifest`: tenant workload manifests and signed submissions
//! - `validation`: manifest validation and submission verification rules
//! - `config`: provider configuration (TOML + serde)
//!
//! ## Layering
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │  dcm-chain   │   │ dcm-provider │
//! └──────┬───────┘   └──────┬───────┘
//!        │                  │
//!        └───────┬──────────┘
//!                ▼
//!         ┌──────────────┐
//!         │  dcm-common  │  <- this crate (leaf, no async)
//!         └──────────────┘
//! ```

pub mod config;
pub mod manifest;
pub mod types;
pub mod validation;

pub use config::ProviderConfig;
pub use manifest::{Manifest, ManifestGroup, Service, SubmitManifest};
pub use types::{
    Deployment, DeploymentAddress, DeploymentGroup, DeploymentState, DeploymentVersion, GroupId,
    LeaseId, LeaseWon, ResourceGroup, ResourceUnit,
};
pub use validation::{
    validate_manifest_with_groups, verify_submission, ValidationError, VerificationError,
};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
