//! Command dispatch: bridges CLI args -> coordinator calls -> output formatting.

pub mod cameras;
pub mod config_cmd;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

/// Dispatch a command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load_config_or_default();

    match cmd {
        Command::Cameras(args) => cameras::handle(args, global, &cfg).await,
        Command::Watch(args) => watch::handle(args, global, &cfg).await,
        Command::Config(args) => config_cmd::handle(args, global, cfg).await,
        // Completions are handled before dispatch
        Command::Completions(_) => unreachable!(),
    }
}
