//! Manifest coordination.
//!
//! The parent provider runtime creates one [`ManifestCoordinator`] per
//! deployment address and routes lease awards, lease removals, tenant
//! manifest submissions, and version updates to it. The coordinator owns
//! all per-deployment state and announces its own termination back to the
//! parent when it is shut down or its idle linger expires.

pub mod coordinator;
pub mod error;

pub use coordinator::{ManifestCoordinator, ShutdownReason, Termination};
pub use error::ManifestError;
