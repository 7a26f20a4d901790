//! CLI configuration -- thin wrapper around `frigatectl_config` shared types.
//!
//! Re-exports the shared types and adds CLI-specific resolution that
//! respects `GlobalOpts` flag overrides (--host, --port, --timeout).

use clap::ValueEnum;

use frigatectl_core::CoordinatorConfig;
use frigatectl_core::config::DEFAULT_PORT;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use frigatectl_config::{
    Config, Profile, config_path, load_config_or_default, profile_to_coordinator_config,
    save_config,
};

/// Host used when neither a profile nor `--host` names an NVR.
const FALLBACK_HOST: &str = "localhost";

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// `--output`, else `defaults.output` from the config file, else table.
pub fn output_format(global: &GlobalOpts, config: &Config) -> OutputFormat {
    global.output.unwrap_or_else(|| {
        OutputFormat::from_str(&config.defaults.output, true).unwrap_or(OutputFormat::Table)
    })
}

/// Comma-separated profile names for help text.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Apply `--host`, `--port` and `--timeout` on top of a profile.
pub fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(port) = global.port {
        profile.port = port;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}

/// Build the `CoordinatorConfig` for this invocation.
///
/// A named profile that does not exist is an error when it was asked for
/// explicitly. Otherwise a missing profile falls back to the flags alone,
/// with `localhost:5000` filling any gap.
pub fn resolve_coordinator_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<CoordinatorConfig, CliError> {
    let name = active_profile_name(global, config);

    let profile = match config.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name,
                available: available_profiles(config),
            });
        }
        None => Profile::new(FALLBACK_HOST, DEFAULT_PORT),
    };

    let profile = apply_overrides(profile, global);
    tracing::debug!(profile = %name, nvr = %profile.authority(), "resolved NVR profile");
    Ok(profile_to_coordinator_config(&profile, &config.defaults)?)
}
