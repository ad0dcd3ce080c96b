//! Adaptive Home CLI
//!
//! Usage:
//!   adaptive-home [OPTIONS] <COMMAND>
//!
//! Options:
//!   -c, --config <FILE>    Configuration file (TOML format)
//!   -d, --data-dir <DIR>   Override the data directory
//!   -h, --help             Print help
//!
//! Results are printed as JSON on stdout. Logs go to stderr and are filtered
//! through `RUST_LOG`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use adaptive_home::error::ParseError;
use adaptive_home::service::{AddWidgetRequest, PatchRequest, RestoreRequest, SeedRequest, SnapshotRequest, WidgetInput, WidgetPatch};
use adaptive_home::widget::WidgetData;
use adaptive_home::{HomeConfig, HomeError, HomeService, Outcome, Pos, Signals, Size, Stage};

#[derive(Parser)]
#[command(name = "adaptive-home")]
#[command(about = "Adaptive widget selection and placement for home dashboards")]
struct Cli {
    /// Configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding homes, undo history and snapshots
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a home document
    Show { home: String },

    /// Seed a home from presets and the selection engine
    Seed {
        /// Home id (generated if omitted)
        #[arg(long)]
        id: Option<String>,
        /// Journey stage: learn, build, operate (or training, preparing, conquer)
        #[arg(short, long)]
        stage: Option<String>,
        /// Merge presets into the existing home instead of reseeding
        #[arg(long)]
        adapt: bool,
        /// Widget type to pin (repeatable)
        #[arg(long = "pin")]
        pins: Vec<String>,
    },

    /// Add a widget, or merge into the existing one of the same type
    Add {
        /// Widget type, e.g. price-mini
        kind: String,
        #[arg(long)]
        home: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        section: Option<String>,
        /// JSON object merged into the widget's data
        #[arg(long)]
        data: Option<String>,
        /// Size as WxH, e.g. 4x2
        #[arg(long, value_parser = parse_size)]
        size: Option<Size>,
    },

    /// Move a widget to a grid cell
    Move { home: String, widget: String, x: i32, y: i32 },

    /// Resize a widget
    Resize { home: String, widget: String, w: i32, h: i32 },

    /// Pin (or with --off, unpin) a widget
    Pin {
        home: String,
        widget: String,
        #[arg(long)]
        off: bool,
    },

    /// Delete a widget
    Remove { home: String, widget: String },

    /// Rank the registry for a stage without changing any home
    Select {
        stage: String,
        #[arg(long = "pin")]
        pins: Vec<String>,
        #[arg(long)]
        max: Option<usize>,
        /// Only consider mobile friendly widgets
        #[arg(long)]
        mobile: bool,
    },

    /// Revert the last change to a home
    Undo { home: String },

    /// Re-apply the last undone change
    Redo { home: String },

    /// Manage snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
}

#[derive(Subcommand)]
enum SnapshotCommand {
    Create {
        home: String,
        #[arg(long)]
        note: Option<String>,
    },
    List {
        home: String,
    },
    Restore {
        home: String,
        snapshot: String,
    },
    Delete {
        home: String,
        snapshot: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn exit_code(err: &HomeError) -> u8 {
    match err.outcome() {
        Outcome::Invalid => 1,
        Outcome::NotFound => 2,
        Outcome::Failed => 3,
    }
}

fn run(cli: Cli) -> Result<String, HomeError> {
    let mut config = match &cli.config {
        Some(path) => HomeConfig::from_file(path)?,
        None => HomeConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    match cli.command {
        Command::Show { home } => to_json(&HomeService::new(config).get_home(&home)?),
        Command::Seed { id, stage, adapt, pins } => {
            let signals = pins.into_iter().fold(Signals::new(), Signals::with_pin);
            let req = SeedRequest {
                id,
                stage,
                adapt,
                signals: Some(signals),
            };
            to_json(&HomeService::new(config).seed(req)?)
        }
        Command::Add {
            kind,
            home,
            title,
            section,
            data,
            size,
        } => {
            let data = data.as_deref().map(parse_data).transpose()?;
            let req = AddWidgetRequest {
                home_id: home,
                widget: WidgetInput {
                    kind,
                    title,
                    section_id: section,
                    data,
                    size,
                },
            };
            to_json(&HomeService::new(config).add_widget(req)?)
        }
        Command::Move { home, widget, x, y } => {
            patch(config, &home, WidgetPatch::new(widget).with_pos(Pos::new(x, y)))
        }
        Command::Resize { home, widget, w, h } => {
            patch(config, &home, WidgetPatch::new(widget).with_size(Size::new(w, h)))
        }
        Command::Pin { home, widget, off } => patch(config, &home, WidgetPatch::new(widget).with_pinned(!off)),
        Command::Remove { home, widget } => to_json(&HomeService::new(config).remove_widget(&home, &widget)?),
        Command::Select {
            stage,
            pins,
            max,
            mobile,
        } => {
            let stage: Stage = stage.parse()?;
            if let Some(max) = max {
                config.selection.max = max;
            }
            config.selection.mobile_only |= mobile;
            let signals = pins.into_iter().fold(Signals::new(), Signals::with_pin);
            to_json(&HomeService::new(config).preview_selection(stage, &signals))
        }
        Command::Undo { home } => to_json(&HomeService::new(config).undo(&home)?),
        Command::Redo { home } => to_json(&HomeService::new(config).redo(&home)?),
        Command::Snapshot(cmd) => {
            let mut service = HomeService::new(config);
            match cmd {
                SnapshotCommand::Create { home, note } => {
                    to_json(&service.create_snapshot(&home, SnapshotRequest { note })?)
                }
                SnapshotCommand::List { home } => to_json(&service.list_snapshots(&home)?),
                SnapshotCommand::Restore { home, snapshot } => {
                    to_json(&service.restore_snapshot(&home, &snapshot, RestoreRequest::restore())?)
                }
                SnapshotCommand::Delete { home, snapshot } => {
                    service.delete_snapshot(&home, &snapshot)?;
                    to_json(&serde_json::json!({ "deleted": snapshot }))
                }
            }
        }
    }
}

fn patch(config: HomeConfig, home: &str, patch: WidgetPatch) -> Result<String, HomeError> {
    let req = PatchRequest { widgets: vec![patch] };
    to_json(&HomeService::new(config).patch_widgets(home, req)?)
}

fn to_json<T: Serialize>(value: &T) -> Result<String, HomeError> {
    Ok(serde_json::to_string_pretty(value).map_err(ParseError::from)?)
}

fn parse_data(text: &str) -> Result<WidgetData, HomeError> {
    Ok(serde_json::from_str(text).map_err(ParseError::from)?)
}

fn parse_size(text: &str) -> Result<Size, String> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", text))?;
    let w = w.trim().parse().map_err(|_| format!("invalid width '{}'", w))?;
    let h = h.trim().parse().map_err(|_| format!("invalid height '{}'", h))?;
    Ok(Size::new(w, h))
}
