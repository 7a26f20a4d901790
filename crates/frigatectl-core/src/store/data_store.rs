// ── Merged-view store ──
//
// Owns the observed cache and the pending-intent tracker, and derives
// the merged camera view from them on every read.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use super::observed::{ObservedSnapshot, ObservedState};
use super::pending::{IntentTicket, PendingIntents};
use crate::model::{CameraView, ViewChange, ViewSource};

/// Central store behind the `Coordinator`.
///
/// Reads never take a lock: the observed side is an `ArcSwap` snapshot
/// and the pending side a `DashMap`. Writes that can change the merged
/// view go through one short-lived mutex so the before/after diff they
/// report is exact.
pub struct DataStore {
    observed: ObservedState,
    pending: PendingIntents,
    write_lock: Mutex<()>,
    revision: watch::Sender<u64>,
}

impl DataStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0u64);
        Self {
            observed: ObservedState::new(),
            pending: PendingIntents::new(),
            write_lock: Mutex::new(()),
            revision,
        }
    }

    pub fn observed(&self) -> &ObservedState {
        &self.observed
    }

    pub fn pending(&self) -> &PendingIntents {
        &self.pending
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Merged view for one camera.
    ///
    /// A live pending intent wins over the observed value. `None` means
    /// the camera was never observed (or a later poll dropped it) and no
    /// command is in flight for it.
    pub fn view(&self, camera: &str) -> Option<CameraView> {
        // Pending is read before observed. A command that completes in
        // between then shows its settled observed value, never a stale one.
        let pending = self.pending.get(camera);
        let observed = self.observed.snapshot();
        merge(camera, pending, &observed)
    }

    /// Merged views for every camera that is observed or pending, by name.
    pub fn views(&self) -> Vec<CameraView> {
        self.view_map().into_values().collect()
    }

    pub fn is_available(&self, camera: &str) -> bool {
        self.observed.snapshot().is_available(camera)
    }

    /// Bumped once per mutation that changed at least one view.
    pub fn revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn view_map(&self) -> BTreeMap<String, CameraView> {
        let pending = self.pending.snapshot();
        let observed = self.observed.snapshot();

        let names: BTreeSet<&str> = pending
            .keys()
            .map(String::as_str)
            .chain(observed.names())
            .collect();

        names
            .into_iter()
            .filter_map(|name| {
                let intent = pending.get(name).map(|p| p.desired);
                merge(name, intent, &observed).map(|v| (name.to_owned(), v))
            })
            .collect()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Install a successful poll result.
    pub(crate) fn apply_poll(&self, cameras: HashMap<String, bool>) -> Vec<ViewChange> {
        self.mutate(|store| store.observed.replace(cameras)).1
    }

    /// Record a failed poll. Values stay; availability drops.
    pub(crate) fn record_poll_failure(&self) -> (u32, Vec<ViewChange>) {
        self.mutate(|store| store.observed.mark_failed())
    }

    pub(crate) fn set_intent(&self, camera: &str, desired: bool) -> (IntentTicket, Vec<ViewChange>) {
        self.mutate(|store| store.pending.set(camera, desired))
    }

    /// Clear `camera`'s intent if `ticket` still owns it.
    pub(crate) fn clear_intent_if(&self, camera: &str, ticket: IntentTicket) -> (bool, Vec<ViewChange>) {
        self.mutate(|store| store.pending.clear_if(camera, ticket))
    }

    /// Drop every pending intent, falling back to observed values.
    pub(crate) fn clear_all_intents(&self) -> Vec<ViewChange> {
        self.mutate(|store| {
            for name in store.pending.names() {
                store.pending.clear(&name);
            }
        })
        .1
    }

    fn mutate<T>(&self, f: impl FnOnce(&Self) -> T) -> (T, Vec<ViewChange>) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let before = self.view_map();
        let out = f(self);
        let after = self.view_map();

        let changes = diff(&before, &after);
        if !changes.is_empty() {
            self.revision.send_modify(|r| *r += 1);
        }
        (out, changes)
    }
}

impl Default for DataStore {
    fn default() -> Self {
        Self::new()
    }
}

fn merge(camera: &str, pending: Option<bool>, observed: &ObservedSnapshot) -> Option<CameraView> {
    let (enabled, source) = match pending {
        Some(desired) => (desired, ViewSource::Pending),
        None => (observed.get(camera)?, ViewSource::Observed),
    };
    Some(CameraView {
        name: camera.to_owned(),
        enabled,
        source,
        available: observed.is_available(camera),
    })
}

fn diff(
    before: &BTreeMap<String, CameraView>,
    after: &BTreeMap<String, CameraView>,
) -> Vec<ViewChange> {
    let names: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    names
        .into_iter()
        .filter_map(|name| {
            let old = before.get(name);
            let new = after.get(name);
            (old != new).then(|| ViewChange {
                camera: name.clone(),
                before: old.cloned(),
                after: new.cloned(),
            })
        })
        .collect()
}
