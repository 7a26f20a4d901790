// ── Coordinator events ──

use serde::Serialize;

use super::view::CameraView;

/// Push notifications broadcast by the `Coordinator`.
///
/// `ViewChanged` is the one UI observers care about; the rest describe
/// the poll and command lifecycle for logging and early decay of
/// optimistic values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoordinatorEvent {
    /// The merged view or availability of a camera changed.
    ViewChanged {
        camera: String,
        view: Option<CameraView>,
    },
    /// A poll succeeded.
    Refreshed { cameras: usize },
    /// A poll failed; cached values are untouched.
    PollFailed {
        reason: String,
        consecutive_failures: u32,
    },
    /// A command was registered and is about to be sent.
    CommandIssued { camera: String, desired: bool },
    /// The NVR rejected a command, or it never arrived.
    CommandFailed {
        camera: String,
        desired: bool,
        reason: String,
    },
    /// A command's settle poll has run and its intent has been released.
    CommandSettled {
        camera: String,
        desired: bool,
        acknowledged: bool,
    },
}

impl CoordinatorEvent {
    /// The camera this event concerns, if it concerns exactly one.
    pub fn camera(&self) -> Option<&str> {
        match self {
            Self::ViewChanged { camera, .. }
            | Self::CommandIssued { camera, .. }
            | Self::CommandFailed { camera, .. }
            | Self::CommandSettled { camera, .. } => Some(camera),
            Self::Refreshed { .. } | Self::PollFailed { .. } => None,
        }
    }
}
