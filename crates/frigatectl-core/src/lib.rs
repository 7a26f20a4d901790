//! State reconciliation between camera commands and NVR polls.
//!
//! The NVR applies enable/disable commands asynchronously, so a poll
//! taken right after a command can still report the old value. This
//! crate keeps the displayed state honest across that gap:
//!
//! - **[`Coordinator`]**: Central facade. [`start()`](Coordinator::start)
//!   runs the first poll and spawns the periodic poll loop;
//!   [`execute()`](Coordinator::execute) registers a pending intent, sends
//!   the command, and schedules a settle poll.
//!   [`Coordinator::oneshot()`](Coordinator::oneshot) suits single CLI runs.
//!
//! - **[`DataStore`]**: Owns the [`ObservedState`] cache (`ArcSwap`
//!   snapshots) and the [`PendingIntents`] tracker (`DashMap`). Derives the
//!   merged [`CameraView`] on every read; a pending intent always wins.
//!
//! - **[`OptimisticSwitch`]**: Per-camera control that shows the requested
//!   value instantly, reverts it on failure, and hands back to the merged
//!   view after confirmation or a grace period.
//!
//! - **[`CameraSource`]**: The poll/command seam. Implemented for
//!   [`frigatectl_api::NvrClient`].

pub mod config;
pub mod coordinator;
pub mod error;
pub mod model;
pub mod projector;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CoordinatorConfig, RevertPolicy, TlsVerification};
pub use coordinator::{Coordinator, CoordinatorState};
pub use error::CoreError;
pub use model::{CameraView, CoordinatorEvent, ViewChange, ViewSource};
pub use projector::{Assumed, OptimisticSwitch, SwitchState};
pub use source::CameraSource;
pub use store::{DataStore, Freshness, IntentTicket, ObservedState, PendingIntent, PendingIntents};
