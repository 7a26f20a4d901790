// ── Observed-state cache ──
//
// The literal result of the last successful poll, plus freshness
// bookkeeping. Swapped wholesale through `ArcSwap`, so readers always
// see exactly one poll generation.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Poll health as seen by the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Freshness {
    /// The most recent poll succeeded. `false` before the first poll.
    pub last_poll_ok: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
}

/// One immutable poll generation.
#[derive(Debug, Clone, Default)]
pub struct ObservedSnapshot {
    cameras: Arc<HashMap<String, bool>>,
    generation: u64,
    freshness: Freshness,
}

impl ObservedSnapshot {
    pub fn get(&self, camera: &str) -> Option<bool> {
        self.cameras.get(camera).copied()
    }

    pub fn contains(&self, camera: &str) -> bool {
        self.cameras.contains_key(camera)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cameras.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Number of successful polls applied so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// `lastPollSucceeded AND camera ∈ snapshot`.
    pub fn is_available(&self, camera: &str) -> bool {
        self.freshness.last_poll_ok && self.contains(camera)
    }
}

/// Holds the last successfully polled state for every known camera.
///
/// Only the poller writes here. Cameras missing from a successful poll
/// are gone, not defaulted. A failed poll leaves the mapping alone and
/// only updates `Freshness`.
pub struct ObservedState {
    current: ArcSwap<ObservedSnapshot>,
}

impl ObservedState {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(ObservedSnapshot::default()),
        }
    }

    /// Current generation (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<ObservedSnapshot> {
        self.current.load_full()
    }

    pub fn get(&self, camera: &str) -> Option<bool> {
        self.current.load().get(camera)
    }

    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        self.current.load().freshness.last_success
    }

    pub fn freshness(&self) -> Freshness {
        self.current.load().freshness
    }

    /// Install a new poll result, replacing the previous one entirely.
    pub(crate) fn replace(&self, cameras: HashMap<String, bool>) {
        let now = Utc::now();
        let cameras = Arc::new(cameras);
        self.current.rcu(|prev| ObservedSnapshot {
            cameras: Arc::clone(&cameras),
            generation: prev.generation + 1,
            freshness: Freshness {
                last_poll_ok: true,
                last_success: Some(now),
                last_failure: prev.freshness.last_failure,
                consecutive_failures: 0,
            },
        });
    }

    /// Record a failed poll. Returns the consecutive failure count.
    pub(crate) fn mark_failed(&self) -> u32 {
        let now = Utc::now();
        let replaced = self.current.rcu(|prev| ObservedSnapshot {
            cameras: Arc::clone(&prev.cameras),
            generation: prev.generation,
            freshness: Freshness {
                last_poll_ok: false,
                last_failure: Some(now),
                consecutive_failures: prev.freshness.consecutive_failures.saturating_add(1),
                ..prev.freshness
            },
        });
        // `rcu` hands back the value it replaced.
        replaced.freshness.consecutive_failures.saturating_add(1)
    }
}

impl Default for ObservedState {
    fn default() -> Self {
        Self::new()
    }
}
