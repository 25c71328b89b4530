//! Provider Event Bus
//!
//! The bus is the provider's internal fan-out path: components publish
//! domain events, interested subsystems (deployment runners, operator
//! tooling) subscribe. Publishing is best-effort and non-blocking — a
//! publisher's own correctness never depends on delivery.
//!
//! [`EventBus`] is the contract; [`MemoryBus`] is the in-process
//! implementation backed by `tokio::sync::broadcast`.

use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

use dcm_common::manifest::Manifest;
use dcm_common::types::{Deployment, DeploymentGroup, LeaseId};

// ════════════════════════════════════════════════════════════════════════════
// EVENTS
// ════════════════════════════════════════════════════════════════════════════

/// A fully-correlated "manifest received" notification.
///
/// Emitted once per tracked lease when chain data, at least one lease, and
/// an accepted manifest all exist for a deployment. Carries everything the
/// execution layer needs to act on the lease without further lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestReceived {
    /// The lease this notification is for.
    pub lease_id: LeaseId,
    /// The deployment group the lease was awarded against.
    pub group: DeploymentGroup,
    /// The accepted workload manifest.
    pub manifest: Manifest,
    /// The deployment record as last fetched (version may have been
    /// overwritten by an out-of-band update).
    pub deployment: Deployment,
}

impl fmt::Display for ManifestReceived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manifest received for lease {}", self.lease_id)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// BUS CONTRACT
// ════════════════════════════════════════════════════════════════════════════

/// Errors surfaced by event publication.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BusError {
    /// Nobody is listening; the event was dropped.
    #[error("event bus has no subscribers")]
    NoSubscribers,
}

/// Best-effort event publication.
///
/// Implementations must be non-blocking: `publish` is called from latency-
/// sensitive loops and may not await.
pub trait EventBus: Send + Sync {
    fn publish(&self, event: ManifestReceived) -> Result<(), BusError>;
}

// ════════════════════════════════════════════════════════════════════════════
// MEMORY BUS
// ════════════════════════════════════════════════════════════════════════════

/// In-process bus backed by a broadcast channel.
///
/// Slow subscribers that fall more than the configured capacity behind lose
/// the oldest events (broadcast lag semantics); publication itself never
/// blocks.
#[derive(Debug)]
pub struct MemoryBus {
    tx: broadcast::Sender<ManifestReceived>,
}

impl MemoryBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to all events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ManifestReceived> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventBus for MemoryBus {
    fn publish(&self, event: ManifestReceived) -> Result<(), BusError> {
        self.tx.send(event).map(|_| ()).map_err(|_| BusError::NoSubscribers)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use dcm_common::types::{
        DeploymentAddress, DeploymentState, DeploymentVersion, GroupId,
    };

    fn event(seed: u8) -> ManifestReceived {
        let address = DeploymentAddress::new([seed; 32]);
        ManifestReceived {
            lease_id: LeaseId {
                address,
                group_seq: 0,
                order_seq: 0,
                provider: [0x05; 32],
            },
            group: DeploymentGroup {
                id: GroupId { address, seq: 0 },
                name: "web".to_string(),
                resources: vec![],
            },
            manifest: Manifest { groups: vec![] },
            deployment: Deployment {
                address,
                tenant: [0x06; 32],
                version: DeploymentVersion::new(vec![seed]),
                state: DeploymentState::Active,
            },
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = MemoryBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(event(0x01)).expect("publish");
        let got = rx.recv().await.expect("recv");
        assert_eq!(got, event(0x01));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_fails() {
        let bus = MemoryBus::new(8);
        assert_eq!(bus.publish(event(0x02)), Err(BusError::NoSubscribers));
    }

    #[tokio::test]
    async fn test_all_subscribers_see_every_event() {
        let bus = MemoryBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.publish(event(0x03)).expect("publish");
        assert_eq!(a.recv().await.expect("a"), event(0x03));
        assert_eq!(b.recv().await.expect("b"), event(0x03));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        // Construction must not panic even with a degenerate capacity.
        let bus = MemoryBus::new(0);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
