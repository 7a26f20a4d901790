//! Config subcommand handlers.

use serde::Serialize;
use tabled::Tabled;

use frigatectl_core::Coordinator;
use frigatectl_core::config::DEFAULT_PORT;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, InitArgs};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display in TOML layout.
fn format_config(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "poll_interval = {}", d.poll_interval);
    let _ = writeln!(out, "settle_delay = {}", d.settle_delay);
    let _ = writeln!(out, "assumed_state_grace = {}", d.assumed_state_grace);
    let _ = writeln!(out, "revert_policy = \"{}\"", d.revert_policy);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "host = \"{}\"", p.host);
        let _ = writeln!(out, "port = {}", p.port);
        if p.tls {
            let _ = writeln!(out, "tls = true");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(ref path) = p.status_path {
            let _ = writeln!(out, "status_path = \"{path}\"");
        }
        for (key, value) in [
            ("timeout", p.timeout),
            ("poll_interval", p.poll_interval),
            ("settle_delay", p.settle_delay),
            ("assumed_state_grace", p.assumed_state_grace),
        ] {
            if let Some(value) = value {
                let _ = writeln!(out, "{key} = {value}");
            }
        }
        if let Some(policy) = p.revert_policy {
            let _ = writeln!(out, "revert_policy = \"{policy}\"");
        }
    }

    out.trim_end().to_owned()
}

#[derive(Clone, Serialize, Tabled)]
struct ProfileEntry {
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "NVR")]
    nvr: String,
    #[tabled(rename = "TLS")]
    tls: bool,
    #[tabled(rename = "Default")]
    default: bool,
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ConfigArgs, global: &GlobalOpts, cfg: Config) -> Result<(), CliError> {
    let format = config::output_format(global, &cfg);

    match args.command {
        ConfigCommand::Init(init) => init_profile(init, global, cfg).await,

        ConfigCommand::Show => {
            let out = output::render_single(format, &cfg, format_config, format_config);
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            if cfg.profiles.is_empty() {
                if !global.quiet {
                    eprintln!("No profiles configured. Run: frigatectl --host <addr> config init");
                }
                return Ok(());
            }
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let entries: Vec<ProfileEntry> = cfg
                .profiles
                .iter()
                .map(|(name, p)| ProfileEntry {
                    name: name.clone(),
                    nvr: p.authority(),
                    tls: p.tls,
                    default: name == default,
                })
                .collect();
            let out = output::render_list(format, &entries, ProfileEntry::clone, |e| {
                e.name.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Register a profile for `--host`/`--port`, checking first that the NVR
/// answers with at least one camera.
async fn init_profile(args: InitArgs, global: &GlobalOpts, mut cfg: Config) -> Result<(), CliError> {
    let host = global.host.clone().ok_or_else(|| CliError::Validation {
        field: "host".into(),
        reason: "config init needs --host".into(),
    })?;

    let mut profile = Profile::new(host, global.port.unwrap_or(DEFAULT_PORT));
    profile.tls = args.tls;
    profile.insecure = args.insecure.then_some(true);
    profile.status_path = args.status_path;
    profile.timeout = global.timeout;

    cfg.register_profile(args.name.clone(), profile.clone())?;

    if args.skip_check {
        tracing::debug!(nvr = %profile.authority(), "skipping NVR check");
    } else {
        let coordinator_config = config::profile_to_coordinator_config(&profile, &cfg.defaults)?;
        let cameras =
            Coordinator::oneshot(coordinator_config, |c| async move { Ok(c.views().len()) })
                .await?;
        if !global.quiet {
            eprintln!("✓ {} answered with {cameras} camera(s)", profile.authority());
        }
    }

    config::save_config(&cfg)?;

    if !global.quiet {
        eprintln!(
            "✓ Profile '{}' written to {}",
            args.name,
            config::config_path().display()
        );
        if cfg.default_profile.as_deref() == Some(args.name.as_str()) {
            eprintln!("  Active profile: {}", args.name);
        }
    }
    Ok(())
}
