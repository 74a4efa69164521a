//! opforge: inspect and build the operation catalog.
//!
//! Usage:
//!   opforge list
//!   opforge expand <operation>
//!   opforge build [--json FILE] [--serial-only] [--filter NAME]

use clap::{Parser, Subcommand};
use opforge_synth::{Routine, Size};
use opforge_tools::{BuildOptions, ToolError};
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "opforge")]
#[command(about = "Inspect and build specialized routines for vectorized operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List registered operations and their capabilities
    List,

    /// Show every routine generated for one operation
    Expand {
        /// Operation name
        operation: String,
    },

    /// Build the whole catalog
    Build {
        /// Write the routine IR as JSON to this file
        #[arg(long)]
        json: Option<PathBuf>,

        /// Skip range-splitting entry points
        #[arg(long)]
        serial_only: bool,

        /// Only build operations whose name contains this substring
        #[arg(long)]
        filter: Option<String>,
    },
}

fn main() {
    opforge_tools::init_logging();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List => list(),
        Commands::Expand { operation } => expand(&operation),
        Commands::Build {
            json,
            serial_only,
            filter,
        } => {
            let options = BuildOptions {
                parallel_variants: !serial_only,
                filter,
            };
            build(&options, json)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn list() -> Result<(), ToolError> {
    for op in opforge_tools::list()? {
        println!("{:<40} {:<8} {}", op.name, op.category, op.doc);
        println!("    {}", op.capabilities.join(", "));
    }
    Ok(())
}

fn expand(operation: &str) -> Result<(), ToolError> {
    let set = opforge_tools::expand(operation)?;
    println!("{} ({} routines)", set.operation, set.len());
    for routine in set.iter() {
        print_routine(routine);
    }
    Ok(())
}

fn print_routine(routine: &Routine) {
    let mut flags = Vec::new();
    if routine.parallel.is_some() {
        flags.push("parallel");
    }
    if routine.cost.slow {
        flags.push("slow");
    }
    if flags.is_empty() {
        println!("  {}", routine.name);
    } else {
        println!("  {} [{}]", routine.name, flags.join(", "));
    }
    for param in &routine.params {
        let size = match param.size {
            Size::Literal(n) => n.to_string(),
            Size::CountOf(slot) => format!("count({})", slot),
        };
        println!(
            "      {:<6} {:<5} {:<3} {:?} size={}",
            param.name, param.ty, param.mode, param.mutability, size
        );
    }
}

fn build(options: &BuildOptions, json: Option<PathBuf>) -> Result<(), ToolError> {
    let report = opforge_tools::build(options);

    for failure in &report.failed {
        error!("{}", failure);
    }
    info!(
        operations = report.built.len(),
        routines = report.routine_count(),
        failed = report.failed.len(),
        "catalog built"
    );

    if let Some(path) = json {
        opforge_tools::write_json(&path, &report)?;
    }

    match report.failed.into_iter().next() {
        Some(first) => Err(first.into()),
        None => Ok(()),
    }
}
