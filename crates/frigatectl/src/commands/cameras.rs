//! Camera command handlers.

use frigatectl_core::{CameraView, Coordinator, CoordinatorConfig, CoreError};

use crate::cli::{CamerasArgs, CamerasCommand, GlobalOpts, OutputFormat, SetStateArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: CamerasArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let coordinator_config = config::resolve_coordinator_config(global, cfg)?;
    let format = config::output_format(global, cfg);
    let color = output::should_color(global.color);

    let out = match args.command {
        CamerasCommand::List => {
            let views =
                Coordinator::oneshot(coordinator_config, |c| async move { Ok(c.views()) }).await?;
            output::render_cameras(format, &views, color)
        }

        CamerasCommand::Get { name } => {
            let view = Coordinator::oneshot(coordinator_config, move |c| async move {
                c.view(&name)
                    .ok_or(CoreError::CameraNotFound { camera: name })
            })
            .await?;
            output::render_camera(format, &view, color)
        }

        CamerasCommand::Enable(args) => {
            set_state(coordinator_config, args, true, format, color, global.quiet).await?
        }

        CamerasCommand::Disable(args) => {
            set_state(coordinator_config, args, false, format, color, global.quiet).await?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}

/// Send one command and report the camera as it stands afterwards.
///
/// Unless `--no-wait` is given, the settle poll runs before the view is
/// read, so the result reflects what the NVR itself reports.
async fn set_state(
    coordinator_config: CoordinatorConfig,
    args: SetStateArgs,
    desired: bool,
    format: OutputFormat,
    color: bool,
    quiet: bool,
) -> Result<String, CliError> {
    let wait = !args.no_wait;
    let name = args.name;

    let view = Coordinator::oneshot(coordinator_config, move |c| async move {
        c.execute(&name, desired).await?;
        if wait {
            c.wait_idle().await;
        }
        c.view(&name)
            .ok_or(CoreError::CameraNotFound { camera: name })
    })
    .await?;

    if wait && !quiet {
        report_convergence(&view, desired);
    }
    Ok(output::render_camera(format, &view, color))
}

fn report_convergence(view: &CameraView, desired: bool) {
    let wanted = if desired { "on" } else { "off" };
    if view.enabled == desired {
        eprintln!("✓ {} is {wanted}", view.name);
    } else if view.available {
        eprintln!(
            "⚠ NVR accepted the command but still reports {} as {}",
            view.name,
            if view.enabled { "on" } else { "off" }
        );
    } else {
        eprintln!(
            "⚠ Could not confirm {} is {wanted}: the follow-up poll failed",
            view.name
        );
    }
}
