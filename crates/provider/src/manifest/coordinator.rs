//! Per-Deployment Manifest Coordinator
//!
//! One coordinator exists per deployment address. It is the single component
//! that knows both which leases were awarded for the deployment and which
//! manifest, if any, was accepted for it — and it alone decides when to emit
//! the correlated "manifest received" event and when to retire itself.
//!
//! ## Ownership Model
//!
//! All mutable state lives inside one spawned task (the actor). External
//! callers hold a cheap-to-clone [`ManifestCoordinator`] handle and interact
//! purely through channels — there are no locks anywhere on this path.
//!
//! ```text
//!  callers                    actor task                 collaborators
//! ┌──────────┐  lease/rm   ┌──────────────┐   fetch    ┌─────────────┐
//! │ handle   │────────────▶│              │───────────▶│ ChainQuery  │
//! │ (Clone)  │  manifest   │  event loop  │            └─────────────┘
//! │          │────────────▶│  + state     │   publish  ┌─────────────┐
//! │          │  version    │              │───────────▶│  EventBus   │
//! └──────────┘────────────▶└──────┬───────┘            └─────────────┘
//!                                 │ Termination
//!                                 ▼
//!                               parent
//! ```
//!
//! ## Shutdown
//!
//! Termination is cooperative: a shutdown request (or linger expiry) breaks
//! the loop, the `shutting_down` watch flips so gateway handshakes stop
//! blocking, every queued manifest request is answered `NotRunning`, an
//! outstanding fetch is cancelled and its result drained, and the parent is
//! told exactly once via the termination channel.
//!
//! ## Response Guarantee
//!
//! Every manifest submission receives exactly one outcome on its own oneshot
//! channel — on validation, on gateway refusal, and on shutdown drain alike.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep, Sleep};
use tracing::{debug, error, info};

use dcm_chain::{ChainError, ChainQuery, ChainSnapshot};
use dcm_common::manifest::{Manifest, SubmitManifest};
use dcm_common::types::{DeploymentAddress, DeploymentVersion, LeaseId, LeaseWon};
use dcm_common::validation::{validate_manifest_with_groups, verify_submission};
use dcm_common::ProviderConfig;

use crate::event::{EventBus, ManifestReceived};
use crate::manifest::error::ManifestError;

type FetchOutcome = Result<ChainSnapshot, ChainError>;

// ════════════════════════════════════════════════════════════════════════════
// TERMINATION
// ════════════════════════════════════════════════════════════════════════════

/// Why a coordinator stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// `shutdown()` was called, or every handle was dropped.
    Requested,
    /// The idle linger timer expired.
    LingerExpired,
}

/// Announcement a coordinator sends its parent exactly once as it exits.
///
/// The parent uses this to deregister the coordinator; `reason` lets it tell
/// a linger death apart from a requested stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Termination {
    pub address: DeploymentAddress,
    pub reason: ShutdownReason,
}

// ════════════════════════════════════════════════════════════════════════════
// REQUESTS
// ════════════════════════════════════════════════════════════════════════════

/// A queued manifest submission plus its single-use response channel.
struct ManifestRequest {
    submission: SubmitManifest,
    reply: oneshot::Sender<Result<(), ManifestError>>,
}

impl ManifestRequest {
    fn respond(self, outcome: Result<(), ManifestError>) {
        // The submitter may have gone away; that is its problem, not ours.
        let _ = self.reply.send(outcome);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HANDLE
// ════════════════════════════════════════════════════════════════════════════

/// Handle to a running per-deployment coordinator.
///
/// Cloning is cheap; all clones talk to the same actor. Lease, removal, and
/// version submissions are fire-and-forget: if the coordinator is shutting
/// down they are dropped with a logged error. Manifest submissions always
/// receive exactly one outcome on the returned channel.
#[derive(Clone)]
pub struct ManifestCoordinator {
    address: DeploymentAddress,
    leasech: mpsc::Sender<LeaseWon>,
    rmleasech: mpsc::Sender<LeaseId>,
    manifestch: mpsc::Sender<ManifestRequest>,
    updatech: mpsc::Sender<DeploymentVersion>,
    shutdownch: mpsc::Sender<()>,
    shutting_down: watch::Receiver<bool>,
}

impl ManifestCoordinator {
    /// Spawn a coordinator for `address` and return its handle.
    ///
    /// `done` receives the coordinator's [`Termination`] announcement; the
    /// parent owns the receiving side and deregisters on receipt.
    pub fn spawn(
        address: DeploymentAddress,
        config: &ProviderConfig,
        chain: Arc<dyn ChainQuery>,
        bus: Arc<dyn EventBus>,
        done: mpsc::UnboundedSender<Termination>,
    ) -> Self {
        let (lease_tx, leasech) = mpsc::channel(1);
        let (rmlease_tx, rmleasech) = mpsc::channel(1);
        let (manifest_tx, manifestch) = mpsc::channel(1);
        let (update_tx, updatech) = mpsc::channel(1);
        let (shutdown_tx, shutdownch) = mpsc::channel(1);
        let (shutting_down_tx, shutting_down) = watch::channel(false);

        let actor = Coordinator {
            address,
            linger_duration: config.manifest_linger(),
            chain,
            bus,
            leasech,
            rmleasech,
            manifestch,
            updatech,
            shutdownch,
            shutting_down: shutting_down_tx,
            done,
            data: None,
            requests: Vec::new(),
            leases: Vec::new(),
            manifests: Vec::new(),
            linger: None,
        };
        tokio::spawn(actor.run());

        Self {
            address,
            leasech: lease_tx,
            rmleasech: rmlease_tx,
            manifestch: manifest_tx,
            updatech: update_tx,
            shutdownch: shutdown_tx,
            shutting_down,
        }
    }

    /// The deployment this coordinator serves.
    pub fn address(&self) -> DeploymentAddress {
        self.address
    }

    /// Hand a won lease to the coordinator. Fire-and-forget.
    pub async fn submit_lease(&self, lease: LeaseWon) {
        let mut shutting_down = self.shutting_down.clone();
        tokio::select! {
            permit = self.leasech.reserve() => match permit {
                Ok(permit) => permit.send(lease),
                Err(_) => error!(deployment = %self.address, "not running: submit lease"),
            },
            _ = shutting_down.wait_for(|stop| *stop) => {
                error!(deployment = %self.address, lease = %lease.id, "not running: submit lease");
            }
        }
    }

    /// Tell the coordinator a lease is gone. Fire-and-forget; removing an
    /// unknown lease id is a no-op.
    pub async fn remove_lease(&self, id: LeaseId) {
        let mut shutting_down = self.shutting_down.clone();
        tokio::select! {
            permit = self.rmleasech.reserve() => match permit {
                Ok(permit) => permit.send(id),
                Err(_) => error!(deployment = %self.address, "not running: remove lease"),
            },
            _ = shutting_down.wait_for(|stop| *stop) => {
                error!(deployment = %self.address, lease = %id, "not running: remove lease");
            }
        }
    }

    /// Submit a manifest. The returned channel yields the submission's one
    /// and only outcome, even if the coordinator shuts down first.
    pub async fn submit_manifest(
        &self,
        submission: SubmitManifest,
    ) -> oneshot::Receiver<Result<(), ManifestError>> {
        let (reply, response) = oneshot::channel();
        let mut shutting_down = self.shutting_down.clone();
        tokio::select! {
            permit = self.manifestch.reserve() => match permit {
                Ok(permit) => permit.send(ManifestRequest { submission, reply }),
                Err(_) => {
                    error!(deployment = %self.address, "not running: submit manifest");
                    let _ = reply.send(Err(ManifestError::NotRunning));
                }
            },
            _ = shutting_down.wait_for(|stop| *stop) => {
                error!(deployment = %self.address, "not running: submit manifest");
                let _ = reply.send(Err(ManifestError::NotRunning));
            }
        }
        response
    }

    /// Deliver an out-of-band deployment version update. Fire-and-forget.
    pub async fn submit_version_update(&self, version: DeploymentVersion) {
        let mut shutting_down = self.shutting_down.clone();
        tokio::select! {
            permit = self.updatech.reserve() => match permit {
                Ok(permit) => permit.send(version),
                Err(_) => error!(deployment = %self.address, "not running: version update"),
            },
            _ = shutting_down.wait_for(|stop| *stop) => {
                error!(deployment = %self.address, %version, "not running: version update");
            }
        }
    }

    /// Request graceful termination. Idempotent; completion is observed on
    /// the parent's termination channel.
    pub fn shutdown(&self) {
        let _ = self.shutdownch.try_send(());
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ACTOR
// ════════════════════════════════════════════════════════════════════════════

struct Coordinator {
    address: DeploymentAddress,
    linger_duration: Duration,
    chain: Arc<dyn ChainQuery>,
    bus: Arc<dyn EventBus>,

    leasech: mpsc::Receiver<LeaseWon>,
    rmleasech: mpsc::Receiver<LeaseId>,
    manifestch: mpsc::Receiver<ManifestRequest>,
    updatech: mpsc::Receiver<DeploymentVersion>,
    shutdownch: mpsc::Receiver<()>,
    shutting_down: watch::Sender<bool>,
    done: mpsc::UnboundedSender<Termination>,

    /// Chain snapshot; `None` until the first successful fetch.
    data: Option<ChainSnapshot>,
    /// Manifest requests waiting for chain data.
    requests: Vec<ManifestRequest>,
    /// Active leases, equality-keyed by lease id.
    leases: Vec<LeaseWon>,
    /// Accepted manifests; correlation uses the most recent entry.
    manifests: Vec<Manifest>,
    /// Idle countdown; present exactly while the coordinator is idle.
    linger: Option<Pin<Box<Sleep>>>,
}

impl Coordinator {
    async fn run(mut self) {
        debug!(deployment = %self.address, "manifest coordinator started");

        // At most one fetch outstanding; this is its pending result.
        let mut fetch: Option<oneshot::Receiver<FetchOutcome>> = None;

        // A coordinator is born idle: the countdown starts immediately.
        self.reconcile_linger();

        let reason = loop {
            tokio::select! {
                _ = self.shutdownch.recv() => {
                    break ShutdownReason::Requested;
                }

                _ = linger_wait(&mut self.linger) => {
                    error!(deployment = %self.address, "linger timer expired");
                    break ShutdownReason::LingerExpired;
                }

                Some(lease) = self.leasech.recv() => {
                    info!(deployment = %self.address, lease = %lease.id, "new lease");

                    self.leases.push(lease);
                    self.validate_requests();
                    self.emit_received_events();
                    self.reconcile_linger();
                    fetch = self.maybe_fetch_data(fetch);
                }

                Some(id) = self.rmleasech.recv() => {
                    info!(deployment = %self.address, lease = %id, "lease removed");

                    self.leases.retain(|lease| lease.id != id);
                    self.validate_requests();
                    self.emit_received_events();
                    self.reconcile_linger();
                    fetch = self.maybe_fetch_data(fetch);
                }

                Some(request) = self.manifestch.recv() => {
                    info!(deployment = %self.address, "manifest received");

                    self.requests.push(request);
                    self.validate_requests();
                    self.emit_received_events();
                    self.reconcile_linger();
                    fetch = self.maybe_fetch_data(fetch);
                }

                Some(version) = self.updatech.recv() => {
                    info!(deployment = %self.address, %version, "received version");

                    // Overwrites the cached record in place. Cached groups
                    // are not invalidated and accepted manifests are not
                    // re-validated; groups may be stale until the next fetch.
                    if let Some(data) = self.data.as_mut() {
                        data.deployment.version = version;
                    }
                }

                result = fetch_wait(&mut fetch) => {
                    fetch = None;
                    match result {
                        Ok(Ok(snapshot)) => {
                            info!(
                                deployment = %self.address,
                                version = %snapshot.deployment.version,
                                "deployment data received",
                            );
                            self.data = Some(snapshot);
                            self.validate_requests();
                            self.emit_received_events();
                            self.reconcile_linger();
                        }
                        Ok(Err(err)) => {
                            // No automatic retry: the next lease, removal, or
                            // manifest event while the snapshot is absent
                            // starts a fresh fetch.
                            error!(deployment = %self.address, %err, "error fetching deployment data");
                        }
                        Err(_) => {
                            error!(deployment = %self.address, "fetch task dropped without a result");
                        }
                    }
                }
            }
        };

        self.finalize(reason, fetch).await;
    }

    /// Cooperative shutdown: flip the shutting-down watch, answer every
    /// queued request, drop the linger timer, drain the outstanding fetch,
    /// and announce termination to the parent.
    async fn finalize(mut self, reason: ShutdownReason, fetch: Option<oneshot::Receiver<FetchOutcome>>) {
        let _ = self.shutting_down.send(true);

        // Exactly-once: requests queued in the loop and requests still in
        // flight through the channel (including ones sent on a permit won
        // just before the watch flipped) all get their NotRunning outcome.
        // After close(), recv() yields None once the channel is fully
        // drained, so this cannot miss a request or hang on live senders.
        self.manifestch.close();
        for request in self.requests.drain(..) {
            request.respond(Err(ManifestError::NotRunning));
        }
        while let Some(request) = self.manifestch.recv().await {
            request.respond(Err(ManifestError::NotRunning));
        }

        self.linger = None;

        // The fetch task always delivers exactly one value once cancelled;
        // wait for it so the task never outlives the coordinator.
        if let Some(rx) = fetch {
            let _ = rx.await;
        }

        info!(deployment = %self.address, ?reason, "manifest coordinator stopped");
        let _ = self.done.send(Termination {
            address: self.address,
            reason,
        });
    }

    // ────────────────────────────────────────────────────────────────────
    // RECONCILIATION
    // ────────────────────────────────────────────────────────────────────

    /// Drain queued requests against the chain snapshot, in arrival order.
    ///
    /// No-op until chain data is present. Each request gets its own outcome;
    /// a failure never aborts the rest of the batch. Every valid request is
    /// answered with success, but only the batch's first manifest becomes
    /// the active one — manifests do not support multi-version coexistence.
    fn validate_requests(&mut self) {
        if self.requests.is_empty() {
            return;
        }
        let Some(data) = self.data.as_ref() else {
            return;
        };

        let mut accepted: Vec<Manifest> = Vec::new();
        for request in std::mem::take(&mut self.requests) {
            match validate_request(&request.submission, data) {
                Err(err) => {
                    error!(deployment = %self.address, %err, "invalid manifest");
                    request.respond(Err(err));
                }
                Ok(()) => {
                    accepted.push(request.submission.manifest.clone());
                    request.respond(Ok(()));
                }
            }
        }

        debug!(deployment = %self.address, accepted = accepted.len(), "requests validated");

        if let Some(first) = accepted.into_iter().next() {
            self.manifests.push(first);
        }
    }

    /// Publish one correlated notification per tracked lease.
    ///
    /// No-op until chain data, at least one lease, and at least one accepted
    /// manifest all exist. Uses the most recently accepted manifest. A
    /// publish failure is logged per-lease and aborts nothing; a later state
    /// change re-notifies every tracked lease.
    fn emit_received_events(&self) {
        let Some(data) = self.data.as_ref() else {
            return;
        };
        let Some(manifest) = self.manifests.last() else {
            return;
        };
        if self.leases.is_empty() {
            return;
        }

        debug!(deployment = %self.address, leases = self.leases.len(), "publishing manifest received");

        for lease in &self.leases {
            let event = ManifestReceived {
                lease_id: lease.id,
                group: lease.group.clone(),
                manifest: manifest.clone(),
                deployment: data.deployment.clone(),
            };
            if let Err(err) = self.bus.publish(event) {
                error!(deployment = %self.address, lease = %lease.id, %err, "publishing event");
            }
        }
    }

    /// Keep the linger timer aligned with the idle state: running exactly
    /// while there are no leases and no accepted manifests. Entering idle
    /// starts a fresh countdown; leaving idle cancels it.
    fn reconcile_linger(&mut self) {
        let idle = self.leases.is_empty() && self.manifests.is_empty();
        if !idle {
            if self.linger.take().is_some() {
                info!(deployment = %self.address, "stopping linger timer");
            }
            return;
        }
        if self.linger.is_none() {
            info!(deployment = %self.address, linger = ?self.linger_duration, "starting linger timer");
            self.linger = Some(Box::pin(sleep(self.linger_duration)));
        }
    }

    /// Start a fetch iff the snapshot is absent and none is outstanding.
    fn maybe_fetch_data(
        &self,
        fetch: Option<oneshot::Receiver<FetchOutcome>>,
    ) -> Option<oneshot::Receiver<FetchOutcome>> {
        if self.data.is_none() && fetch.is_none() {
            return Some(self.spawn_fetch());
        }
        fetch
    }

    /// Spawn the one-shot fetch task. It resolves the deployment and its
    /// groups, races coordinator shutdown, and always delivers exactly one
    /// outcome on the returned channel.
    fn spawn_fetch(&self) -> oneshot::Receiver<FetchOutcome> {
        let (tx, rx) = oneshot::channel();
        let chain = Arc::clone(&self.chain);
        let address = self.address;
        let mut shutting_down = self.shutting_down.subscribe();

        debug!(deployment = %address, "fetching deployment data");
        tokio::spawn(async move {
            let outcome = tokio::select! {
                outcome = fetch_snapshot(chain, address) => outcome,
                _ = shutting_down.wait_for(|stop| *stop) => Err(ChainError::Cancelled),
            };
            let _ = tx.send(outcome);
        });
        rx
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SUPPORT
// ════════════════════════════════════════════════════════════════════════════

async fn fetch_snapshot(
    chain: Arc<dyn ChainQuery>,
    address: DeploymentAddress,
) -> FetchOutcome {
    let deployment = chain.deployment(&address).await?;
    let groups = chain.deployment_groups(&address).await?;
    Ok(ChainSnapshot { deployment, groups })
}

fn validate_request(submission: &SubmitManifest, data: &ChainSnapshot) -> Result<(), ManifestError> {
    validate_manifest_with_groups(&submission.manifest, &data.groups)?;
    verify_submission(submission, &data.deployment)?;
    Ok(())
}

/// Resolves when the linger timer fires; pends forever while no timer runs.
async fn linger_wait(linger: &mut Option<Pin<Box<Sleep>>>) {
    match linger.as_mut() {
        Some(timer) => timer.await,
        None => pending().await,
    }
}

/// Resolves with the fetch outcome; pends forever while no fetch is out.
async fn fetch_wait(
    fetch: &mut Option<oneshot::Receiver<FetchOutcome>>,
) -> Result<FetchOutcome, oneshot::error::RecvError> {
    match fetch.as_mut() {
        Some(rx) => rx.await,
        None => pending().await,
    }
}
