// ── Optimistic switch ──
//
// Presentation-only override for one camera: shows the requested value
// the moment a command is issued, then hands back to the coordinator's
// merged view once the command is confirmed or a grace period runs out.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use frigatectl_api::NvrClient;

use crate::config::RevertPolicy;
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{CoordinatorEvent, ViewSource};
use crate::source::CameraSource;

/// A short-lived displayed value that bypasses the merged view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assumed {
    pub enabled: bool,
    pub since: DateTime<Utc>,
}

/// Everything a UI needs to draw the switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitchState {
    pub camera: String,
    /// Displayed value. `None` when the camera has no value at all.
    pub is_on: Option<bool>,
    pub available: bool,
    pub assumed: Option<Assumed>,
}

/// An enable/disable control for one camera with optimistic display.
///
/// The assumed value belongs to this switch alone; the coordinator's
/// pending intents are unaffected by it.
pub struct OptimisticSwitch<S: CameraSource = NvrClient> {
    coordinator: Coordinator<S>,
    camera: String,
    grace: Duration,
    revert: RevertPolicy,
    inner: Arc<SwitchInner>,
}

impl<S: CameraSource> Clone for OptimisticSwitch<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            camera: self.camera.clone(),
            grace: self.grace,
            revert: self.revert,
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SwitchInner {
    slot: Mutex<AssumedSlot>,
    revision: watch::Sender<u64>,
}

#[derive(Default)]
struct AssumedSlot {
    value: Option<Assumed>,
    /// Bumped by every command so stale completions and timers can tell
    /// they have been superseded.
    generation: u64,
    decay: Option<CancellationToken>,
}

impl SwitchInner {
    fn lock(&self) -> MutexGuard<'_, AssumedSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    /// Drop the assumed value if `generation` still owns it.
    fn expire(&self, generation: u64) {
        let mut slot = self.lock();
        if slot.generation != generation || slot.value.is_none() {
            return;
        }
        slot.value = None;
        slot.decay = None;
        drop(slot);
        self.bump();
    }
}

impl<S: CameraSource> OptimisticSwitch<S> {
    /// Grace period and revert rule come from the coordinator's config.
    pub fn new(coordinator: Coordinator<S>, camera: impl Into<String>) -> Self {
        let grace = coordinator.config().assumed_state_grace;
        let revert = coordinator.config().revert_policy;
        let (revision, _) = watch::channel(0u64);
        Self {
            coordinator,
            camera: camera.into(),
            grace,
            revert,
            inner: Arc::new(SwitchInner {
                slot: Mutex::new(AssumedSlot::default()),
                revision,
            }),
        }
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    // ── Reads ────────────────────────────────────────────────────

    /// The assumed value while one is live, else the merged view.
    pub fn is_on(&self) -> Option<bool> {
        self.assumed()
            .map(|a| a.enabled)
            .or_else(|| self.coordinator.view(&self.camera).map(|v| v.enabled))
    }

    pub fn is_available(&self) -> bool {
        self.coordinator.is_available(&self.camera)
    }

    pub fn assumed(&self) -> Option<Assumed> {
        self.inner.lock().value
    }

    pub fn state(&self) -> SwitchState {
        SwitchState {
            camera: self.camera.clone(),
            is_on: self.is_on(),
            available: self.is_available(),
            assumed: self.assumed(),
        }
    }

    /// Bumped whenever the assumed value appears, reverts, or expires.
    /// Merged-view changes arrive through [`Coordinator::subscribe`].
    pub fn changed(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    // ── Commands ─────────────────────────────────────────────────

    pub async fn turn_on(&self) -> Result<(), CoreError> {
        self.set(true).await
    }

    pub async fn turn_off(&self) -> Result<(), CoreError> {
        self.set(false).await
    }

    async fn set(&self, desired: bool) -> Result<(), CoreError> {
        let (generation, prior) = {
            let mut slot = self.inner.lock();
            let prior = slot
                .value
                .map(|a| a.enabled)
                .or_else(|| self.coordinator.view(&self.camera).map(|v| v.enabled));
            if let Some(token) = slot.decay.take() {
                token.cancel();
            }
            slot.generation += 1;
            slot.value = Some(Assumed {
                enabled: desired,
                since: Utc::now(),
            });
            (slot.generation, prior)
        };
        self.inner.bump();
        trace!(camera = %self.camera, desired, "assumed state set");

        // Subscribed before the command goes out, so a settle that lands
        // before the decay task starts is still seen.
        let events = self.coordinator.subscribe();
        let result = self.coordinator.execute(&self.camera, desired).await;

        if result.is_err() {
            let mut slot = self.inner.lock();
            if slot.generation == generation {
                let reverted = match self.revert {
                    RevertPolicy::PreCommand => prior,
                    RevertPolicy::Opposite => Some(!desired),
                };
                slot.value = reverted.map(|enabled| Assumed {
                    enabled,
                    since: Utc::now(),
                });
                drop(slot);
                self.inner.bump();
                debug!(camera = %self.camera, ?reverted, "assumed state reverted");
            }
        }

        self.start_decay(generation, events);
        result
    }

    /// Expire the assumed value after the grace period, or earlier once
    /// the coordinator settles a command and its view already agrees.
    fn start_decay(
        &self,
        generation: u64,
        mut events: broadcast::Receiver<Arc<CoordinatorEvent>>,
    ) {
        let token = CancellationToken::new();
        {
            let mut slot = self.inner.lock();
            // A newer command owns the timer now.
            if slot.generation != generation {
                return;
            }
            if let Some(old) = slot.decay.replace(token.clone()) {
                old.cancel();
            }
        }

        let inner = Arc::clone(&self.inner);
        let coordinator = self.coordinator.clone();
        let camera = self.camera.clone();
        let grace = self.grace;

        tokio::spawn(async move {
            let deadline = tokio::time::sleep(grace);
            tokio::pin!(deadline);
            let mut events_open = true;

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return,
                    () = &mut deadline => break,
                    event = events.recv(), if events_open => match event {
                        Ok(event) => {
                            if confirms(&event, &camera, &coordinator, &inner) {
                                debug!(camera = %camera, "assumed state confirmed early");
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => events_open = false,
                    },
                }
            }

            inner.expire(generation);
        });
    }
}

/// `event` settles a command for `camera` and the observed value now
/// matches what the switch is assuming.
fn confirms<S: CameraSource>(
    event: &CoordinatorEvent,
    camera: &str,
    coordinator: &Coordinator<S>,
    inner: &SwitchInner,
) -> bool {
    if !matches!(event, CoordinatorEvent::CommandSettled { .. }) || event.camera() != Some(camera) {
        return false;
    }
    let Some(assumed) = inner.lock().value else {
        return false;
    };
    coordinator
        .view(camera)
        .is_some_and(|v| v.source == ViewSource::Observed && v.enabled == assumed.enabled)
}
