// NVR wire types
//
// Two response shapes carry camera enable flags: the full NVR config
// document (`GET /api/config`) and a flat `{name: bool}` status map.
// Both decode into the same `name -> enabled` mapping.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Body of a poll response.
///
/// `Flat` is tried first: a config document never decodes as a map of
/// booleans, whereas a flat map would silently decode as a config
/// document with no `cameras` key.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusDocument {
    Flat(HashMap<String, bool>),
    Config(NvrConfig),
}

impl StatusDocument {
    /// Collapse either shape into `camera name -> enabled`.
    pub fn into_states(self) -> HashMap<String, bool> {
        match self {
            Self::Flat(states) => states,
            Self::Config(config) => config.camera_states(),
        }
    }
}

/// The subset of the NVR configuration document we care about.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NvrConfig {
    /// `null` and a missing key both mean "no cameras".
    #[serde(default)]
    pub cameras: Option<HashMap<String, CameraConfig>>,
}

impl NvrConfig {
    pub fn camera_states(&self) -> HashMap<String, bool> {
        self.cameras
            .iter()
            .flatten()
            .map(|(name, camera)| (name.clone(), camera.enabled))
            .collect()
    }
}

/// Per-camera section of the NVR configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    /// The NVR omits `enabled` for cameras that were never toggled.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,

    /// Everything else (ffmpeg inputs, detect settings, ...), untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn enabled_by_default() -> bool {
    true
}
