// ── Merged camera view ──

use serde::{Deserialize, Serialize};
use strum::Display;

/// Which container supplied a view's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViewSource {
    /// An in-flight command's requested value.
    Pending,
    /// The last successful poll.
    Observed,
}

/// The authoritative "is this camera on" answer for one camera.
///
/// Never stored: `DataStore` derives it from the pending intent (if any)
/// and the observed snapshot every time it is asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraView {
    pub name: String,
    pub enabled: bool,
    pub source: ViewSource,
    /// Last poll succeeded and reported this camera.
    pub available: bool,
}

impl CameraView {
    pub fn is_pending(&self) -> bool {
        self.source == ViewSource::Pending
    }
}

/// A camera whose view differs before and after a store mutation.
///
/// `None` on either side means the camera had no value at all
/// (never observed, or dropped by a poll, and no pending command).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewChange {
    pub camera: String,
    pub before: Option<CameraView>,
    pub after: Option<CameraView>,
}
