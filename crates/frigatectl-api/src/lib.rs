// frigatectl-api: Async Rust client for the Frigate NVR camera control API

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::NvrClient;
pub use error::Error;
pub use models::{CameraConfig, NvrConfig, StatusDocument};
pub use transport::{TlsMode, TransportConfig};
