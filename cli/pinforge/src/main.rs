//! Pinforge CLI: pin and on-chip resource arbitration for embedded firmware.

mod commands;
mod device;
mod session;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use pinforge_targets::PlatformCatalog;

#[derive(Parser)]
#[command(name = "pinforge", version, about = "Pin and resource arbitration for MCU firmware")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a device spec for pin conflicts and resource exhaustion
    Check {
        /// Path to the device spec (default: search upward for device.toml)
        spec: Option<PathBuf>,
        /// Target platform (overrides [device].target)
        #[arg(long)]
        target: Option<String>,
        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
        /// Reject a peripheral entirely when any of its pins conflicts
        #[arg(long)]
        all_or_nothing: bool,
    },
    /// Manage target platforms
    Target {
        #[command(subcommand)]
        action: TargetAction,
    },
    /// Advisory allocation plans
    Plan {
        #[command(subcommand)]
        action: PlanAction,
    },
}

#[derive(Subcommand)]
enum TargetAction {
    /// List available target platforms
    List,
    /// Show details of a target platform
    Describe {
        /// Platform name
        name: String,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
    /// Validate a .target.toml file
    Validate {
        /// Path to the file
        file: PathBuf,
    },
    /// Print a .target.toml template for a new platform
    Template {
        /// Platform name
        name: String,
    },
}

#[derive(Subcommand)]
enum PlanAction {
    /// Suggest a DMA setup from a data rate
    Dma {
        /// Peripheral type (e.g. uart, spi)
        peripheral_type: String,
        /// Data rate in bits per second
        bps: u64,
        #[arg(long)]
        target: String,
    },
    /// Pack PWM channels into timers
    Timers {
        /// Number of PWM channels
        count: u32,
        #[arg(long)]
        target: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .target(env_logger::Target::Stderr)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Check {
            spec,
            target,
            format,
            all_or_nothing,
        } => commands::check::run(
            &cwd,
            spec.as_deref(),
            target.as_deref(),
            &format,
            all_or_nothing,
        ),

        Commands::Target { action } => {
            let catalog = load_catalog(&cwd)?;
            match action {
                TargetAction::List => commands::target::list(&catalog),
                TargetAction::Describe { name, format } => {
                    commands::target::describe(&catalog, &name, format.as_deref())
                }
                TargetAction::Validate { file } => commands::target::validate(&file),
                TargetAction::Template { name } => commands::target::template(&name),
            }
        }

        Commands::Plan { action } => {
            let catalog = load_catalog(&cwd)?;
            match action {
                PlanAction::Dma {
                    peripheral_type,
                    bps,
                    target,
                } => commands::plan::dma(&catalog, &target, &peripheral_type, bps),
                PlanAction::Timers { count, target } => {
                    commands::plan::timers(&catalog, &target, count)
                }
            }
        }
    }
}

/// Built-in platforms plus any custom profiles under `project_dir/targets`.
pub(crate) fn load_catalog(project_dir: &Path) -> Result<PlatformCatalog> {
    let mut catalog = PlatformCatalog::builtin();
    let loaded = catalog.load_dir(project_dir)?;
    if loaded > 0 {
        log::info!("loaded {loaded} custom target(s) from {}", project_dir.display());
    }
    Ok(catalog)
}
