//! Shared configuration for frigatectl.
//!
//! TOML profiles (one per NVR), layered loading through figment, and
//! translation to `frigatectl_core::CoordinatorConfig`. The CLI adds
//! `GlobalOpts`-aware overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use frigatectl_core::config::{DEFAULT_PORT, DEFAULT_TIMEOUT};
use frigatectl_core::{CoordinatorConfig, RevertPolicy, TlsVerification};

/// Environment variable prefix; nested keys split on `__`
/// (e.g. `FRIGATECTL_DEFAULTS__TIMEOUT=5`).
pub const ENV_PREFIX: &str = "FRIGATECTL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("{authority} is already configured as profile '{existing}'")]
    DuplicateEndpoint { authority: String, existing: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named NVR profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

/// Settings shared by every profile unless the profile overrides them.
/// Durations are whole seconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    #[serde(default = "default_settle_delay")]
    pub settle_delay: u64,

    #[serde(default = "default_assumed_state_grace")]
    pub assumed_state_grace: u64,

    #[serde(default)]
    pub revert_policy: RevertPolicy,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            settle_delay: default_settle_delay(),
            assumed_state_grace: default_assumed_state_grace(),
            revert_policy: RevertPolicy::default(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}
fn default_poll_interval() -> u64 {
    30
}
fn default_settle_delay() -> u64 {
    2
}
fn default_assumed_state_grace() -> u64 {
    5
}

/// A named NVR profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Profile {
    /// NVR host name or IP address.
    pub host: String,

    /// NVR API port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Talk HTTPS instead of plain HTTP (reverse-proxied NVRs).
    #[serde(default)]
    pub tls: bool,

    /// Path to custom CA certificate (HTTPS only).
    pub ca_cert: Option<PathBuf>,

    /// Skip certificate verification (HTTPS only).
    pub insecure: Option<bool>,

    /// Poll path relative to `/api` (default `config`).
    pub status_path: Option<String>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override poll interval (0 disables background polling).
    pub poll_interval: Option<u64>,

    /// Override settle delay.
    pub settle_delay: Option<u64>,

    /// Override optimistic-state grace period.
    pub assumed_state_grace: Option<u64>,

    /// Override failure revert rule.
    pub revert_policy: Option<RevertPolicy>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Profile {
    /// A plain-HTTP profile with every override unset.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
            ca_cert: None,
            insecure: None,
            status_path: None,
            timeout: None,
            poll_interval: None,
            settle_delay: None,
            assumed_state_grace: None,
            revert_policy: None,
        }
    }

    /// `host:port`, the identity of the NVR this profile points at.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host.to_ascii_lowercase(), self.port)
    }

    /// API base URL, e.g. `http://nvr.local:5000/api`.
    pub fn base_url(&self) -> Result<url::Url, ConfigError> {
        let scheme = if self.tls { "https" } else { "http" };
        let raw = format!("{scheme}://{}:{}/api", self.host, self.port);
        raw.parse().map_err(|e| ConfigError::Validation {
            field: "host".into(),
            reason: format!("invalid NVR address '{raw}': {e}"),
        })
    }
}

impl Config {
    /// Look up a profile by name, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, p)| (k.as_str(), p))
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    /// Add or replace `name`, rejecting a second profile for the same NVR.
    ///
    /// The first profile registered becomes the default.
    pub fn register_profile(
        &mut self,
        name: impl Into<String>,
        profile: Profile,
    ) -> Result<(), ConfigError> {
        let name = name.into();
        let authority = profile.authority();
        if let Some((existing, _)) = self
            .profiles
            .iter()
            .find(|(n, p)| **n != name && p.authority() == authority)
        {
            return Err(ConfigError::DuplicateEndpoint {
                authority,
                existing: existing.clone(),
            });
        }

        let default_is_dangling = self
            .default_profile
            .as_ref()
            .is_none_or(|d| !self.profiles.contains_key(d));
        if default_is_dangling {
            self.default_profile = Some(name.clone());
        }
        self.profiles.insert(name, profile);
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("", "", "frigatectl").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("frigatectl");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load defaults, then `path` (if it exists), then `FRIGATECTL_*` env vars.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `CoordinatorConfig` from a profile, falling back to `defaults`
/// for anything the profile leaves unset.
pub fn profile_to_coordinator_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<CoordinatorConfig, ConfigError> {
    let url = profile.base_url()?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let secs = |value: Option<u64>, fallback: u64| Duration::from_secs(value.unwrap_or(fallback));

    let mut cfg = CoordinatorConfig::for_url(url);
    cfg.tls = tls;
    cfg.timeout = secs(profile.timeout, defaults.timeout);
    cfg.poll_interval = secs(profile.poll_interval, defaults.poll_interval);
    cfg.settle_delay = secs(profile.settle_delay, defaults.settle_delay);
    cfg.assumed_state_grace = secs(profile.assumed_state_grace, defaults.assumed_state_grace);
    cfg.revert_policy = profile.revert_policy.unwrap_or(defaults.revert_policy);
    if let Some(ref path) = profile.status_path {
        cfg.status_path.clone_from(path);
    }

    if cfg.timeout.is_zero() {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }
    Ok(cfg)
}
