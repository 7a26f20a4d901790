//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use frigatectl_core::CameraView;

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// `on` / `off`, green and dimmed when color is enabled.
pub fn enabled_label(enabled: bool, color: bool) -> String {
    match (enabled, color) {
        (true, true) => "on".green().to_string(),
        (false, true) => "off".dimmed().to_string(),
        (true, false) => "on".into(),
        (false, false) => "off".into(),
    }
}

/// Where a view's value came from, highlighted while a command is in flight.
pub fn source_label(view: &CameraView, color: bool) -> String {
    let label = view.source.to_string();
    if color && view.is_pending() {
        label.yellow().to_string()
    } else {
        label
    }
}

pub fn available_label(available: bool, color: bool) -> String {
    match (available, color) {
        (true, _) => "yes".into(),
        (false, true) => "no".red().to_string(),
        (false, false) => "no".into(),
    }
}

// ── Camera rendering ─────────────────────────────────────────────────

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "Camera")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Available")]
    available: String,
}

impl CameraRow {
    fn from_view(view: &CameraView, color: bool) -> Self {
        Self {
            name: view.name.clone(),
            state: enabled_label(view.enabled, color),
            source: source_label(view, color),
            available: available_label(view.available, color),
        }
    }
}

/// Render every camera view; `plain` prints `name state` pairs.
pub fn render_cameras(format: OutputFormat, views: &[CameraView], color: bool) -> String {
    render_list(
        format,
        views,
        |v| CameraRow::from_view(v, color),
        |v| format!("{} {}", v.name, enabled_label(v.enabled, false)),
    )
}

/// Render one camera view; `plain` prints just `on` or `off`.
pub fn render_camera(format: OutputFormat, view: &CameraView, color: bool) -> String {
    render_single(
        format,
        view,
        |v| {
            let rows = [CameraRow::from_view(v, color)];
            render_table(&rows)
        },
        |v| enabled_label(v.enabled, false),
    )
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the data itself via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&line_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Pretty-printed JSON.
pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).expect("serialization should not fail")
}

/// Compact single-line JSON.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).expect("serialization should not fail")
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    if compact {
        render_json_compact(data)
    } else {
        render_json_pretty(data)
    }
}

/// YAML output.
pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).expect("serialization should not fail")
}
