//! `watch`: run the poll loop and print camera changes until Ctrl-C.

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use frigatectl_core::{Coordinator, CoordinatorEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: WatchArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let mut coordinator_config = config::resolve_coordinator_config(global, cfg)?;
    if let Some(secs) = args.interval {
        coordinator_config.poll_interval = Duration::from_secs(secs);
    }
    if coordinator_config.poll_interval.is_zero() {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "watch needs a poll interval of at least 1 second".into(),
        });
    }

    let format = config::output_format(global, cfg);
    let color = output::should_color(global.color);

    let coordinator = Coordinator::new(coordinator_config)?;
    let mut events = coordinator.subscribe();
    coordinator.start().await?;

    let only = args.camera.as_deref();
    let mut views = coordinator.views();
    if let Some(camera) = only {
        views.retain(|v| v.name == camera);
        if views.is_empty() {
            coordinator.shutdown().await;
            return Err(CliError::NotFound {
                camera: camera.to_owned(),
            });
        }
    }

    // Initial picture; the start-up poll's own events are already covered.
    output::print_output(
        &output::render_cameras(format, &views, color),
        global.quiet,
    );
    while events.try_recv().is_ok() {}

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(event) => {
                    if !concerns(&event, only) {
                        continue;
                    }
                    if let Some(line) = format_event(&event, format, color) {
                        output::print_output(&line, global.quiet);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    coordinator.shutdown().await;
    Ok(())
}

/// `event` is NVR-wide or about the camera being watched.
fn concerns(event: &CoordinatorEvent, only: Option<&str>) -> bool {
    match (only, event.camera()) {
        (Some(wanted), Some(camera)) => camera == wanted,
        _ => true,
    }
}

/// One output line per event. Structured formats get every event; text
/// formats only the ones a person watching cares about.
fn format_event(event: &CoordinatorEvent, format: OutputFormat, color: bool) -> Option<String> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => Some(output::render_json_compact(event)),
        OutputFormat::Yaml => Some(format!("---\n{}", output::render_yaml(event).trim_end())),
        OutputFormat::Table | OutputFormat::Plain => {
            let text = match event {
                CoordinatorEvent::ViewChanged {
                    camera,
                    view: Some(view),
                } => {
                    let mut line = format!(
                        "{camera} {}",
                        output::enabled_label(view.enabled, color)
                    );
                    if view.is_pending() {
                        line.push_str(" (pending)");
                    }
                    if !view.available {
                        line.push_str(" (unavailable)");
                    }
                    line
                }
                CoordinatorEvent::ViewChanged { camera, view: None } => {
                    format!("{camera} removed")
                }
                CoordinatorEvent::PollFailed {
                    reason,
                    consecutive_failures,
                } => format!("poll failed ({consecutive_failures} in a row): {reason}"),
                CoordinatorEvent::CommandFailed { camera, reason, .. } => {
                    format!("{camera} command failed: {reason}")
                }
                CoordinatorEvent::Refreshed { .. }
                | CoordinatorEvent::CommandIssued { .. }
                | CoordinatorEvent::CommandSettled { .. } => return None,
            };
            let stamp = chrono::Local::now().format("%H:%M:%S");
            Some(format!("{stamp} {text}"))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use frigatectl_core::{CameraView, ViewSource};

    use super::*;

    #[test]
    fn json_lines_are_tagged_events() {
        let event = CoordinatorEvent::CommandIssued {
            camera: "garage".into(),
            desired: true,
        };
        let line = format_event(&event, OutputFormat::Json, false).unwrap();
        assert_eq!(
            line,
            r#"{"event":"command_issued","camera":"garage","desired":true}"#
        );
    }

    #[test]
    fn text_marks_pending_and_unavailable() {
        let event = CoordinatorEvent::ViewChanged {
            camera: "porch".into(),
            view: Some(CameraView {
                name: "porch".into(),
                enabled: false,
                source: ViewSource::Pending,
                available: false,
            }),
        };
        let line = format_event(&event, OutputFormat::Plain, false).unwrap();
        assert!(line.ends_with("porch off (pending) (unavailable)"), "{line}");
    }

    #[test]
    fn camera_filter_keeps_nvr_wide_events() {
        let porch = CoordinatorEvent::CommandIssued {
            camera: "porch".into(),
            desired: true,
        };
        let failed = CoordinatorEvent::PollFailed {
            reason: "timed out".into(),
            consecutive_failures: 1,
        };

        assert!(concerns(&porch, None));
        assert!(concerns(&porch, Some("porch")));
        assert!(!concerns(&porch, Some("garage")));
        assert!(concerns(&failed, Some("garage")));
    }

    #[test]
    fn text_skips_routine_events() {
        let event = CoordinatorEvent::Refreshed { cameras: 3 };
        assert!(format_event(&event, OutputFormat::Table, false).is_none());
    }
}
