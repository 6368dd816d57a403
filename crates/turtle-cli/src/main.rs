//! Turtle CLI - drives an action path against a simulated world.
//!
//! - `turtle run` - build or resume a program and tick it
//! - `turtle status` - print the persisted agent state
//! - `turtle reset` - delete every record for the agent

mod config;
mod programs;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use turtle_core::storage::load_json;
use turtle_core::tracker::{in_flight_record_name, save_record_name};
use turtle_core::{FileStorage, InFlightRecord, JournaledWorld, SaveRecord, Storage, Tracker};
use turtle_path::{ActionPath, PathRecord, Registry};

use crate::config::{Program, TurtleConfig};

#[derive(Parser)]
#[command(name = "turtle")]
#[command(about = "Crash-tolerant behavior trees for a fuel-limited grid agent", version)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = "turtle.yaml")]
    config: PathBuf,

    /// Agent label (overrides the config file)
    #[arg(short, long, global = true)]
    label: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program, resuming from saved records when present
    Run {
        /// Maximum ticks for this invocation
        #[arg(long)]
        ticks: Option<u64>,

        /// Program to build when there is no saved path
        #[arg(long, value_enum)]
        program: Option<Program>,
    },

    /// Show the persisted agent state
    Status,

    /// Delete the agent's records
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt().with_env_filter(filter).with_target(false).init();

    let mut config = TurtleConfig::load_or_default(Some(&cli.config))?;
    if let Some(label) = cli.label {
        config.label = label;
    }

    match cli.command {
        Commands::Run { ticks, program } => {
            if let Some(ticks) = ticks {
                config.ticks = ticks;
            }
            if let Some(program) = program {
                config.program = program;
            }
            run(&config)
        }
        Commands::Status => show_status(&config),
        Commands::Reset => reset(&config),
    }
}

fn world_record_name(label: &str) -> String {
    format!("{label}.world.json")
}

fn open_storage(state_dir: &Path) -> Result<FileStorage> {
    FileStorage::open(state_dir)
        .with_context(|| format!("Failed to open state directory {}", state_dir.display()))
}

fn run(config: &TurtleConfig) -> Result<()> {
    let storage = open_storage(&config.state_dir)?;
    let path_name = ActionPath::record_name(&config.label);

    // The world is written through inside every tracked primitive, so it never
    // lags the save and in-flight records.
    let world = JournaledWorld::open(
        Box::new(storage.clone()),
        world_record_name(&config.label),
        || config.world.build(),
    )
    .context("Failed to load world")?;

    let (mut tracker, startup) = Tracker::load_or_init(
        config.label.clone(),
        Box::new(world),
        Box::new(storage.clone()),
    )
    .context("Failed to load agent state")?;

    let head = programs::build(config).context("Invalid program")?;
    let mut path = ActionPath::with_registry(head, Registry::builtin()).with_seed(config.seed);
    let resumed = path
        .load_from(&storage, &path_name)
        .context("Failed to load action path")?;

    tracing::info!(
        label = %config.label,
        ?startup,
        resumed,
        program = ?config.program,
        ticks = config.ticks,
        "Starting"
    );

    let mut last = None;
    for _ in 0..config.ticks {
        let result = match path.tick(&mut tracker) {
            Ok(result) => result,
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!(error = %e, "Fatal condition; manual intervention required");
                }
                return Err(e).context("Program halted");
            }
        };
        path.save_to(tracker.storage_mut(), &path_name)?;
        last = Some(result);
        if result.is_terminal() {
            break;
        }
    }

    tracing::info!(
        label = %config.label,
        result = ?last,
        tick = path.state().tick(),
        position = ?tracker.position(),
        heading = ?tracker.heading(),
        fuel = tracker.fuel(),
        "Stopped"
    );
    Ok(())
}

fn show_status(config: &TurtleConfig) -> Result<()> {
    let storage = open_storage(&config.state_dir)?;
    let label = &config.label;

    println!("Turtle Status");
    println!("=============");
    println!();
    println!("Label: {label}");
    println!("State: {}", config.state_dir.display());
    println!();

    match load_json::<SaveRecord>(&storage, &save_record_name(label))? {
        Some(save) => {
            println!(
                "Position: ({}, {}, {})",
                save.position.x, save.position.y, save.position.z
            );
            println!("Heading: {:?}", save.heading);
            println!("Fuel: {}", save.fuel);
            for (key, value) in &save.extensions {
                println!("{key}: {value}");
            }
        }
        None => println!("No save record"),
    }

    if let Some(record) = load_json::<InFlightRecord>(&storage, &in_flight_record_name(label))? {
        println!();
        println!("In-flight: {} {}", record.op_tag, record.op_params);
        match &record.halted {
            Some(halt) => println!("Halted: {halt:?} (inspect the world, then remove the record)"),
            None => println!("Recovers on next run"),
        }
    }

    if let Some(record) = load_json::<PathRecord>(&storage, &ActionPath::record_name(label))? {
        println!();
        println!("Path: {} at tick {}", record.head.tag, record.state.tick());
        if let Some(code) = record.state.last_code() {
            println!("Last result code: {code:?}");
        }
    }

    Ok(())
}

fn reset(config: &TurtleConfig) -> Result<()> {
    let mut storage = open_storage(&config.state_dir)?;
    let label = &config.label;
    for name in [
        save_record_name(label),
        in_flight_record_name(label),
        ActionPath::record_name(label),
        world_record_name(label),
    ] {
        if storage.exists(&name)? {
            storage.remove(&name)?;
            tracing::info!(%name, "Removed");
        }
    }
    Ok(())
}
