//! Annorecord: composable per-image annotation records.
//!
//! A record describes one image of a computer-vision dataset. Instead of a
//! fixed struct, it is assembled from components (image id, size, filepath,
//! boxes, masks, labels, ...), each implementing one named capability. The
//! components of a record are grouped per task, so a single record can carry
//! detection and segmentation annotations side by side.
//!
//! Every cross-cutting operation is a reduction over the components in a fixed
//! order: serializing, counting annotations, loading heavy payload, and the
//! autofix pipeline that keeps per-annotation lists aligned and valid.
//!
//! # Modules
//!
//! - [`registry`]: Capability names and the component kinds registered under them
//! - [`component`]: The [`Component`] trait and the built-in components
//! - [`composite`]: Per-task component collections and the reduction primitive
//! - [`record`]: Multi-task records, blueprints and the map-style view
//! - [`autofix`]: Validation and repair of annotations
//! - [`ir`]: Value types and the geometry, mask and image collaborators
//! - [`error`]: Error types for record operations

pub mod autofix;
pub mod component;
pub mod composite;
pub mod error;
pub mod ir;
pub mod record;
pub mod registry;
pub mod task;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub use autofix::{autofix_batch, autofix_records, AutofixReport, BatchReport};
pub use component::{Attr, Component, Peers};
pub use composite::{Composite, Merge};
pub use error::RecordError;
pub use ir::Collaborators;
pub use record::{Blueprint, Record, RecordConfig};
pub use registry::Registry;
pub use task::Task;

/// The annorecord CLI application.
#[derive(Parser)]
#[command(name = "annorecord")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Log debug output (including per-component decisions).
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List the built-in capabilities and the component kinds registered under them.
    Capabilities,

    /// Build a record from capability names and print its layout and builder template.
    Template(TemplateArgs),
}

/// Output format for the template subcommand.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Arguments for the template subcommand.
#[derive(clap::Args)]
struct TemplateArgs {
    /// Capability names, e.g. `filepath bbox label`.
    #[arg(required = true)]
    capabilities: Vec<String>,

    /// Put every requested capability in this task instead of its default one.
    #[arg(long)]
    task: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value = "text")]
    output: OutputFormat,
}

fn init_tracing(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // A subscriber may already be installed when run() is embedded.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Run the annorecord CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), RecordError> {
    let cli = Cli::parse();
    init_tracing(&cli);

    match cli.command {
        Some(Commands::Capabilities) => run_capabilities(),
        Some(Commands::Template(args)) => run_template(args),
        None => {
            println!("annorecord {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Composable per-image annotation records.");
            println!();
            println!("Run 'annorecord --help' for usage information.");
            Ok(())
        }
    }
}

fn run_capabilities() -> Result<(), RecordError> {
    let registry = Registry::builtin()?;
    for capability in registry.capabilities() {
        let kinds: Vec<String> = registry
            .kinds(capability)
            .iter()
            .map(|kind| kind.id.to_string())
            .collect();
        println!("{:<10} {}", capability, kinds.join(", "));
    }
    Ok(())
}

fn run_template(args: TemplateArgs) -> Result<(), RecordError> {
    let registry = Registry::builtin()?;

    let mut blueprint = Blueprint::new();
    for capability in &args.capabilities {
        blueprint = match &args.task {
            Some(task) => blueprint.with_task(capability, Task::new(task.as_str(), 1)),
            None => blueprint.with(capability),
        };
    }
    let record = blueprint.build(&registry, RecordConfig::default())?;

    match args.output {
        OutputFormat::Json => {
            let tasks: Vec<_> = record
                .serialize_by_task()
                .into_iter()
                .map(|(task, fields)| {
                    let keys: Vec<String> = fields.keys().cloned().collect();
                    json!({ "task": task, "keys": keys })
                })
                .collect();
            let out = json!({
                "tasks": tasks,
                "template": record.builder_template(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Text => {
            println!("{}", record);
            println!();
            for line in record.builder_template() {
                println!("{}", line);
            }
        }
    }
    Ok(())
}
