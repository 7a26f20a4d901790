//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use frigatectl_config::ConfigError;
use frigatectl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the NVR at {url}")]
    #[diagnostic(
        code(frigatectl::connection_failed),
        help(
            "Check that Frigate is running and its API port is reachable.\n\
             Reason: {reason}\n\
             Try: frigatectl --host <addr> --port <port> cameras list"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(frigatectl::timeout),
        help("{detail}\nIncrease the timeout with --timeout or check NVR responsiveness.")
    )]
    Timeout { detail: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("NVR refused to {action} camera '{camera}'")]
    #[diagnostic(
        code(frigatectl::command_rejected),
        help("{reason}\nThe displayed state was left unchanged.")
    )]
    CommandRejected {
        camera: String,
        action: &'static str,
        reason: String,
    },

    // ── Resources ────────────────────────────────────────────────────
    #[error("Camera '{camera}' not found")]
    #[diagnostic(
        code(frigatectl::not_found),
        help("Run: frigatectl cameras list to see available cameras")
    )]
    NotFound { camera: String },

    #[error("NVR at {url} has no cameras configured")]
    #[diagnostic(
        code(frigatectl::no_cameras),
        help("Add cameras to the Frigate config, or check --status-path for this profile.")
    )]
    NoCameras { url: String },

    #[error("Coordinator is not running")]
    #[diagnostic(code(frigatectl::not_running))]
    NotRunning,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(frigatectl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(frigatectl::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: frigatectl --host <addr> config init --name {name}"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("{authority} is already configured as profile '{existing}'")]
    #[diagnostic(
        code(frigatectl::duplicate_profile),
        help("Edit or reuse profile '{existing}' instead of adding a second one.")
    )]
    DuplicateProfile { authority: String, existing: String },

    #[error(transparent)]
    #[diagnostic(code(frigatectl::config))]
    Config(ConfigError),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::DuplicateProfile { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        if err.is_timeout() {
            return CliError::Timeout {
                detail: err.to_string(),
            };
        }

        match err {
            CoreError::PollFailed { url, reason, .. } => CliError::ConnectionFailed { url, reason },

            CoreError::CommandFailed {
                camera,
                action,
                reason,
                ..
            } => CliError::CommandRejected {
                camera,
                action,
                reason,
            },

            CoreError::CameraNotFound { camera } => CliError::NotFound { camera },

            CoreError::NoCameras { url } => CliError::NoCameras { url },

            CoreError::NotRunning => CliError::NotRunning,

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Client(e) => CliError::Validation {
                field: "nvr".into(),
                reason: e.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::DuplicateEndpoint {
                authority,
                existing,
            } => CliError::DuplicateProfile {
                authority,
                existing,
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other),
        }
    }
}
