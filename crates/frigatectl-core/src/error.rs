// ── Core error types ──
//
// User-facing errors from frigatectl-core. Poll failures and command
// failures are kept apart because the coordinator treats them
// differently: one is swallowed by the loop, the other goes back to
// the caller.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote failures ──────────────────────────────────────────────
    #[error("Poll of {url} failed: {reason}")]
    PollFailed {
        url: String,
        reason: String,
        timed_out: bool,
    },

    #[error("Command to {action} camera '{camera}' failed: {reason}")]
    CommandFailed {
        camera: String,
        action: &'static str,
        reason: String,
        timed_out: bool,
    },

    // ── Data errors ──────────────────────────────────────────────────
    #[error("Camera not found: {camera}")]
    CameraNotFound { camera: String },

    #[error("NVR at {url} reported no cameras")]
    NoCameras { url: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Coordinator is not running")]
    NotRunning,

    // ── Configuration / setup ────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Failed to build NVR client: {0}")]
    Client(#[from] frigatectl_api::Error),
}

impl CoreError {
    pub(crate) fn poll(url: &url::Url, err: &frigatectl_api::Error) -> Self {
        Self::PollFailed {
            url: url.to_string(),
            reason: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    pub(crate) fn command(camera: &str, desired: bool, err: &frigatectl_api::Error) -> Self {
        Self::CommandFailed {
            camera: camera.to_owned(),
            action: if desired { "enable" } else { "disable" },
            reason: err.to_string(),
            timed_out: err.is_timeout(),
        }
    }

    /// Returns `true` if the underlying request hit its deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::PollFailed {
                timed_out: true,
                ..
            } | Self::CommandFailed {
                timed_out: true,
                ..
            }
        )
    }
}
