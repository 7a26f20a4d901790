// ── Domain model ──
//
// Camera views as observers see them, and the events the coordinator
// pushes when they change.

pub mod event;
pub mod view;

pub use event::CoordinatorEvent;
pub use view::{CameraView, ViewChange, ViewSource};
