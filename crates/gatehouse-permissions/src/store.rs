//! The permission cache and its load protocol.
//!
//! ```text
//!   invalidate(next) ──→ { identity: next, set: ∅, loaded: false, gen+1 }
//!   load(id) begins  ──→ { loaded: false, gen+1 }            (set kept)
//!   load(id) answers ──→ applied only if (id, gen) still current
//! ```

use gatehouse_protocol::{Capability, Identity, PermissionSet};
use gatehouse_session::Invalidate;
use gatehouse_transport::PermissionEndpoint;
use tokio::sync::watch;
use tokio::time;

use crate::config::whole_millis;
use crate::{PermissionConfig, PermissionError};

// ---------------------------------------------------------------------------
// PermissionSnapshot
// ---------------------------------------------------------------------------

/// What the store currently knows.
///
/// `loaded` is `false` before the first fetch, while a fetch is in flight,
/// and after a failed fetch. Capability checks only consult `set` when it
/// is `true`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSnapshot {
    identity: Option<Identity>,
    set: PermissionSet,
    loaded: bool,
    generation: u64,
}

impl PermissionSnapshot {
    /// The identity this snapshot belongs to.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// The last successfully fetched set. May be from an earlier load of the
    /// same identity when `loaded` is `false`.
    pub fn set(&self) -> &PermissionSet {
        &self.set
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Bumped by every invalidation and every load start.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fail-closed capability check.
    pub fn has(&self, capability: Capability) -> bool {
        self.loaded && self.set.get(capability)
    }
}

/// How a successful call to [`PermissionStore::load`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No real identity: nothing was requested.
    Skipped,
    /// The fetched set is now current.
    Applied,
    /// The identity changed or a newer load started before the answer
    /// arrived, so the answer was dropped.
    Discarded,
}

// ---------------------------------------------------------------------------
// PermissionStore
// ---------------------------------------------------------------------------

/// Capability cache for the current identity.
///
/// The store is the only writer of its [`PermissionSnapshot`]. The identity
/// it serves is set through [`Invalidate::invalidate`], which the
/// authenticator calls on every login and logout; a load requested for any
/// other identity is discarded without a request.
pub struct PermissionStore<P> {
    endpoint: P,
    config: PermissionConfig,
    state: watch::Sender<PermissionSnapshot>,
}

impl<P: PermissionEndpoint> PermissionStore<P> {
    /// Creates an empty store serving `identity` (the boot session's user).
    pub fn new(endpoint: P, identity: Option<Identity>, config: PermissionConfig) -> Self {
        let (state, _) = watch::channel(PermissionSnapshot {
            identity: identity.filter(|i| !i.is_guest()),
            ..PermissionSnapshot::default()
        });
        Self {
            endpoint,
            config,
            state,
        }
    }

    pub fn config(&self) -> &PermissionConfig {
        &self.config
    }

    pub fn snapshot(&self) -> PermissionSnapshot {
        self.state.borrow().clone()
    }

    /// A receiver that observes every invalidation, load start and applied
    /// load.
    pub fn subscribe(&self) -> watch::Receiver<PermissionSnapshot> {
        self.state.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    /// `true` only when a set is loaded for the current identity and grants
    /// `capability`.
    pub fn has(&self, capability: Capability) -> bool {
        self.state.borrow().has(capability)
    }

    /// Like [`has`](Self::has), by wire name. Unknown names are denied.
    pub fn has_named(&self, name: &str) -> bool {
        match Capability::from_name(name) {
            Some(capability) => self.has(capability),
            None => {
                tracing::debug!(name, "unknown capability checked");
                false
            }
        }
    }

    /// Fetches the capability set of `identity` and, if it is still current
    /// when the answer arrives, makes it the store's set.
    ///
    /// # Errors
    /// [`PermissionError::FetchFailed`] or [`PermissionError::Timeout`] when
    /// the fetch for the current identity failed. The previous set is kept
    /// and `has` stays `false` until a later load succeeds.
    pub async fn load(&self, identity: Option<&Identity>) -> Result<LoadOutcome, PermissionError> {
        let Some(identity) = identity.filter(|i| !i.is_guest()) else {
            return Ok(LoadOutcome::Skipped);
        };
        let Some(generation) = self.begin(identity) else {
            tracing::debug!(%identity, "permission load requested for a stale identity");
            return Ok(LoadOutcome::Discarded);
        };

        let fetched = time::timeout(
            self.config.request_timeout,
            self.endpoint.get_permissions(identity.reference()),
        )
        .await;

        let error = match fetched {
            Ok(Ok(set)) => {
                if self.finish(identity, generation, set) {
                    tracing::info!(%identity, generation, "permissions loaded");
                    return Ok(LoadOutcome::Applied);
                }
                tracing::debug!(%identity, generation, "stale permission response discarded");
                return Ok(LoadOutcome::Discarded);
            }
            Ok(Err(e)) => PermissionError::FetchFailed {
                identity: identity.to_string(),
                reason: e.to_string(),
            },
            Err(_) => PermissionError::Timeout {
                identity: identity.to_string(),
            },
        };

        if !self.is_current(identity, generation) {
            tracing::debug!(%identity, generation, error = %error, "stale permission failure ignored");
            return Ok(LoadOutcome::Discarded);
        }
        tracing::warn!(%identity, error = %error, "permission load failed, capabilities denied");
        Err(error)
    }

    /// [`load`](Self::load) with exponential backoff between failed
    /// attempts. Stops as soon as a load is applied, skipped or discarded.
    pub async fn load_with_retry(
        &self,
        identity: Option<&Identity>,
    ) -> Result<LoadOutcome, PermissionError> {
        let retry = &self.config.retry;
        let mut attempt = 1;
        loop {
            match self.load(identity).await {
                Err(e) if attempt < retry.max_attempts => {
                    let delay = retry.delay(attempt);
                    tracing::debug!(attempt, delay_ms = whole_millis(delay), error = %e, "retrying permission load");
                    time::sleep(delay).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Marks a load of `identity` as started. `None` when the store serves a
    /// different identity.
    fn begin(&self, identity: &Identity) -> Option<u64> {
        let mut generation = None;
        self.state.send_if_modified(|snap| {
            if snap.identity.as_ref() != Some(identity) {
                return false;
            }
            snap.generation += 1;
            snap.loaded = false;
            generation = Some(snap.generation);
            true
        });
        generation
    }

    fn finish(&self, identity: &Identity, generation: u64, set: PermissionSet) -> bool {
        self.state.send_if_modified(|snap| {
            if snap.generation != generation || snap.identity.as_ref() != Some(identity) {
                return false;
            }
            snap.set = set;
            snap.loaded = true;
            true
        })
    }

    fn is_current(&self, identity: &Identity, generation: u64) -> bool {
        let snap = self.state.borrow();
        snap.generation == generation && snap.identity.as_ref() == Some(identity)
    }
}

impl<P: PermissionEndpoint> Invalidate for PermissionStore<P> {
    /// Drops every cached capability and starts serving `next`.
    fn invalidate(&self, next: Option<&Identity>) {
        self.state.send_modify(|snap| {
            snap.identity = next.filter(|i| !i.is_guest()).cloned();
            snap.set = PermissionSet::new();
            snap.loaded = false;
            snap.generation += 1;
        });
        tracing::debug!(next = ?next.map(Identity::reference), "permissions invalidated");
    }
}
