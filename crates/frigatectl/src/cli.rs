//! Clap derive structures for the `frigatectl` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// frigatectl -- enable and disable Frigate NVR cameras
#[derive(Debug, Parser)]
#[command(
    name = "frigatectl",
    version,
    about = "Enable and disable Frigate NVR cameras from the command line",
    long_about = "Control which cameras a Frigate NVR is processing.\n\n\
        Commands are sent to the NVR's camera API and confirmed by a\n\
        follow-up poll once the NVR has had time to apply them.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// NVR profile to use
    #[arg(long, short = 'p', env = "FRIGATECTL_PROFILE", global = true)]
    pub profile: Option<String>,

    /// NVR host (overrides profile)
    #[arg(long, env = "FRIGATECTL_HOST", global = true)]
    pub host: Option<String>,

    /// NVR API port (overrides profile)
    #[arg(long, env = "FRIGATECTL_PORT", global = true)]
    pub port: Option<u16>,

    /// Output format [default: table, or `defaults.output` from config]
    #[arg(long, short = 'o', env = "FRIGATECTL_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "FRIGATECTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List cameras and change their enabled state
    #[command(alias = "cam", alias = "c")]
    Cameras(CamerasArgs),

    /// Follow camera state changes until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage NVR profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Cameras ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CamerasArgs {
    #[command(subcommand)]
    pub command: CamerasCommand,
}

#[derive(Debug, Subcommand)]
pub enum CamerasCommand {
    /// List every camera the NVR reports
    #[command(alias = "ls")]
    List,

    /// Show one camera
    Get {
        /// Camera name as configured on the NVR
        name: String,
    },

    /// Enable a camera
    #[command(alias = "on")]
    Enable(SetStateArgs),

    /// Disable a camera
    #[command(alias = "off")]
    Disable(SetStateArgs),
}

#[derive(Debug, Args)]
pub struct SetStateArgs {
    /// Camera name as configured on the NVR
    pub name: String,

    /// Return as soon as the NVR acknowledges, without the confirming poll
    #[arg(long)]
    pub no_wait: bool,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Poll interval in seconds (overrides profile)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,

    /// Only report this camera (NVR-wide events are always shown)
    #[arg(long, short = 'c')]
    pub camera: Option<String>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Register an NVR profile from --host / --port
    Init(InitArgs),

    /// Show the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Profile name
    #[arg(long, default_value = "default")]
    pub name: String,

    /// Reach the NVR over HTTPS
    #[arg(long)]
    pub tls: bool,

    /// Accept self-signed certificates (HTTPS only)
    #[arg(long, short = 'k', requires = "tls")]
    pub insecure: bool,

    /// Poll path relative to /api
    #[arg(long)]
    pub status_path: Option<String>,

    /// Save without checking that the NVR answers
    #[arg(long)]
    pub skip_check: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
