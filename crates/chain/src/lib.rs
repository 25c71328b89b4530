//! # DCM Chain Crate
//!
//! Read-side chain access for DCM providers. The provider never writes to
//! the chain from this crate — it only resolves deployment addresses into
//! deployment and deployment-group records.
//!
//! ## Modules
//! - `query`: the [`ChainQuery`] trait, [`ChainSnapshot`], and [`ChainError`]
//! - `rpc`: HTTP/JSON implementation against a chain RPC node
//! - `mock`: fully in-memory implementation for testing
//!
//! ```text
//! ┌─────────────────┐
//! │   ChainQuery    │  <- abstract trait
//! └────────┬────────┘
//!          │
//!    ┌─────┴──────┐
//!    │            │
//! ┌──▼───────┐ ┌──▼────────┐
//! │ RpcChain │ │ MockChain │
//! └──────────┘ └───────────┘
//! ```

pub mod mock;
pub mod query;
pub mod rpc;

pub use mock::MockChain;
pub use query::{ChainError, ChainQuery, ChainSnapshot};
pub use rpc::RpcChainQuery;
