// ── Runtime coordinator configuration ──
//
// These types describe *how* to reach an NVR and how the coordinator
// paces itself. They never touch disk: `frigatectl-config` or the CLI
// builds a `CoordinatorConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use crate::error::CoreError;

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Default wait between a command acknowledgment and its confirming poll.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Default lifetime of an optimistic (assumed) value after completion.
pub const DEFAULT_ASSUMED_STATE_GRACE: Duration = Duration::from_secs(5);
/// Default request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default NVR API port.
pub const DEFAULT_PORT: u16 = 5000;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict). Plain `http` NVRs never reach this.
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed reverse proxies).
    DangerAcceptInvalid,
}

/// What an optimistic switch shows after its command fails.
///
/// The two rules differ when the requested value equals the one already
/// on display.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RevertPolicy {
    /// Show whatever was displayed just before the command was issued.
    #[default]
    PreCommand,
    /// Show the opposite of the value that was requested.
    Opposite,
}

/// Configuration for reconciling a single NVR.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// API base URL (e.g., `http://nvr.local:5000/api`).
    pub url: Url,
    /// Path polled for camera state, relative to `url`.
    pub status_path: String,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Deadline for each poll and command request.
    pub timeout: Duration,
    /// Poll cadence. `Duration::ZERO` disables the background loop.
    pub poll_interval: Duration,
    /// Wait after a command before the confirming poll.
    pub settle_delay: Duration,
    /// How long an optimistic switch keeps its assumed value.
    pub assumed_state_grace: Duration,
    /// Failure revert rule for optimistic switches.
    pub revert_policy: RevertPolicy,
}

impl CoordinatorConfig {
    /// Config for `http://{host}:{port}/api` with every tunable at its default.
    pub fn for_host(host: &str, port: u16) -> Result<Self, CoreError> {
        let raw = format!("http://{host}:{port}/api");
        let url = Url::parse(&raw).map_err(|e| CoreError::Config {
            message: format!("invalid NVR address '{raw}': {e}"),
        })?;
        Ok(Self::for_url(url))
    }

    /// Config for an explicit API base URL.
    pub fn for_url(url: Url) -> Self {
        Self {
            url,
            status_path: frigatectl_api::client::DEFAULT_STATUS_PATH.to_owned(),
            tls: TlsVerification::default(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            settle_delay: DEFAULT_SETTLE_DELAY,
            assumed_state_grace: DEFAULT_ASSUMED_STATE_GRACE,
            revert_policy: RevertPolicy::default(),
        }
    }

    /// `host:port` of the NVR, used as its identity in logs and profiles.
    pub fn authority(&self) -> String {
        match (self.url.host_str(), self.url.port_or_known_default()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_owned(),
            _ => self.url.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn for_host_uses_defaults() {
        let cfg = CoordinatorConfig::for_host("localhost", DEFAULT_PORT).unwrap();
        assert_eq!(cfg.url.as_str(), "http://localhost:5000/api");
        assert_eq!(cfg.status_path, "config");
        assert_eq!(cfg.poll_interval, Duration::from_secs(30));
        assert_eq!(cfg.settle_delay, Duration::from_secs(2));
        assert_eq!(cfg.authority(), "localhost:5000");
    }

    #[test]
    fn for_host_rejects_garbage() {
        assert!(CoordinatorConfig::for_host("bad host", 5000).is_err());
    }

    #[test]
    fn revert_policy_round_trips_as_kebab_case() {
        assert_eq!(RevertPolicy::PreCommand.to_string(), "pre-command");
        assert_eq!(
            RevertPolicy::from_str("opposite").unwrap(),
            RevertPolicy::Opposite
        );
    }
}
