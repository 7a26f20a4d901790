// ── Pending-intent tracker ──
//
// At most one in-flight desired value per camera. A new command
// overwrites the old one (last write wins); nothing queues.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;

/// Identifies the command that created a pending intent.
///
/// Tickets only ever increase, so a later command always carries a
/// larger ticket than an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IntentTicket(u64);

/// A command's requested value, held until its exchange completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingIntent {
    pub desired: bool,
    pub created_at: DateTime<Utc>,
    pub ticket: IntentTicket,
}

/// Per-camera in-flight desired state.
///
/// Backed by `DashMap`, so commands for different cameras never contend
/// on the same shard lock for long.
pub struct PendingIntents {
    entries: DashMap<String, PendingIntent>,
    next_ticket: AtomicU64,
}

impl PendingIntents {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Record `desired` for `camera`, overwriting any existing entry.
    pub(crate) fn set(&self, camera: &str, desired: bool) -> IntentTicket {
        let ticket = IntentTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        self.entries.insert(
            camera.to_owned(),
            PendingIntent {
                desired,
                created_at: Utc::now(),
                ticket,
            },
        );
        ticket
    }

    /// Remove the entry for `camera`. Clearing an absent entry is a no-op.
    pub(crate) fn clear(&self, camera: &str) -> Option<PendingIntent> {
        self.entries.remove(camera).map(|(_, intent)| intent)
    }

    /// Remove the entry only if it still belongs to `ticket`.
    ///
    /// Returns `false` when the entry is absent or a newer command has
    /// replaced it.
    pub(crate) fn clear_if(&self, camera: &str, ticket: IntentTicket) -> bool {
        self.entries
            .remove_if(camera, |_, intent| intent.ticket == ticket)
            .is_some()
    }

    pub fn get(&self, camera: &str) -> Option<bool> {
        self.entries.get(camera).map(|e| e.desired)
    }

    pub fn entry(&self, camera: &str) -> Option<PendingIntent> {
        self.entries.get(camera).map(|e| *e.value())
    }

    pub fn contains(&self, camera: &str) -> bool {
        self.entries.contains_key(camera)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    /// Point-in-time copy of every entry.
    pub fn snapshot(&self) -> HashMap<String, PendingIntent> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PendingIntents {
    fn default() -> Self {
        Self::new()
    }
}
