//! # DCM Provider Crate
//!
//! Provider-side reconciliation for DCM (Decentralized Compute
//! Marketplace): for every deployment a tenant has leased from this
//! provider, a dedicated coordinator correlates on-chain state with
//! tenant-submitted workload manifests and decides when a manifest is valid
//! and ready to hand to the execution layer.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        PROVIDER RUNTIME                         │
//! │                                                                 │
//! │   lease events      manifest submissions     version updates    │
//! │        │                     │                     │            │
//! │        └──────────┬──────────┴─────────────────────┘            │
//! │                   ▼                                             │
//! │     ┌──────────────────────────┐        ┌──────────────────┐    │
//! │     │   ManifestCoordinator    │ fetch  │    ChainQuery    │    │
//! │     │  (one per deployment)    │───────▶│   (dcm-chain)    │    │
//! │     └────────────┬─────────────┘        └──────────────────┘    │
//! │                  │ ManifestReceived                             │
//! │                  ▼                                              │
//! │     ┌──────────────────────────┐                                │
//! │     │         EventBus         │──▶ execution layer, tooling    │
//! │     └──────────────────────────┘                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - `event`: the provider event bus contract and in-memory implementation
//! - `manifest`: the per-deployment manifest coordinator

pub mod event;
pub mod manifest;

pub use event::{BusError, EventBus, ManifestReceived, MemoryBus};
pub use manifest::{ManifestCoordinator, ManifestError, ShutdownReason, Termination};
