// ── Camera source seam ──
//
// The two remote operations the coordinator needs. `NvrClient` is the
// production implementation; tests plug in scripted sources.

use std::collections::HashMap;
use std::future::Future;

use frigatectl_api::NvrClient;

/// Something that can report and change camera enabled state.
pub trait CameraSource: Send + Sync + 'static {
    /// Fetch the enabled flag of every camera the NVR knows about.
    fn poll(&self) -> impl Future<Output = Result<HashMap<String, bool>, frigatectl_api::Error>> + Send;

    /// Ask the NVR to enable or disable one camera.
    fn set_state(
        &self,
        camera: &str,
        enabled: bool,
    ) -> impl Future<Output = Result<(), frigatectl_api::Error>> + Send;
}

impl CameraSource for NvrClient {
    fn poll(&self) -> impl Future<Output = Result<HashMap<String, bool>, frigatectl_api::Error>> + Send {
        NvrClient::poll(self)
    }

    fn set_state(
        &self,
        camera: &str,
        enabled: bool,
    ) -> impl Future<Output = Result<(), frigatectl_api::Error>> + Send {
        NvrClient::set_state(self, camera, enabled)
    }
}
