//! Provider configuration loader using TOML and serde.
//! Fields are optional in the file; accessor methods resolve defaults so the
//! rest of the stack never sees an `Option`.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Linger applied to idle manifest coordinators when the file says nothing.
const DEFAULT_MANIFEST_LINGER_SECS: u64 = 300;

/// Default capacity of the in-memory event bus.
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ProviderConfig {
    /// Chain RPC endpoint (e.g., "http://127.0.0.1:26657").
    pub chain_rpc_url: Option<String>,

    /// Seconds an idle manifest coordinator lingers before self-terminating.
    pub manifest_linger_secs: Option<u64>,

    /// Capacity of the in-memory event bus.
    pub event_capacity: Option<usize>,
}

impl ProviderConfig {
    /// Linger duration for idle manifest coordinators.
    pub fn manifest_linger(&self) -> Duration {
        Duration::from_secs(
            self.manifest_linger_secs
                .unwrap_or(DEFAULT_MANIFEST_LINGER_SECS),
        )
    }

    /// Event bus capacity.
    pub fn event_capacity(&self) -> usize {
        self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY)
    }
}

/// Load config from a TOML file path.
/// If the file is missing or fails to parse, an error is returned.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<ProviderConfig> {
    let s = fs::read_to_string(path.as_ref())?;
    let cfg: ProviderConfig = toml::from_str(&s)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = ProviderConfig::default();
        assert_eq!(cfg.manifest_linger(), Duration::from_secs(300));
        assert_eq!(cfg.event_capacity(), 64);
        assert!(cfg.chain_rpc_url.is_none());
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        use std::io::Write;
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let toml = r#"
            chain_rpc_url = "http://127.0.0.1:26657"
            manifest_linger_secs = 30
            event_capacity = 128
        "#;
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "{}", toml).expect("write");
        let cfg = load_from_file(tmp.path()).expect("load");
        assert_eq!(cfg.chain_rpc_url.as_deref(), Some("http://127.0.0.1:26657"));
        assert_eq!(cfg.manifest_linger(), Duration::from_secs(30));
        assert_eq!(cfg.event_capacity(), 128);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        use std::io::Write;
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "manifest_linger_secs = 5").expect("write");
        let cfg = load_from_file(tmp.path()).expect("load");
        assert_eq!(cfg.manifest_linger(), Duration::from_secs(5));
        assert_eq!(cfg.event_capacity(), 64);
    }

    #[test]
    fn test_invalid_toml_is_error() {
        use std::io::Write;
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "manifest_linger_secs = \"not a number\"").expect("write");
        assert!(load_from_file(tmp.path()).is_err());
    }
}
