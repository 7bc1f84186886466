//! Command-line data-quality gate.
//!
//! Validates a YAML or JSON data file against one or more schema files
//! and prints every finding. Exit codes: 0 valid, 2 validation findings,
//! 3 fatal error (malformed schema, unreadable file, uninterpretable
//! data shape).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use schemagate::{Core, CoreError};

#[derive(Parser)]
#[command(
    name = "schemagate",
    version,
    about = "Validate YAML/JSON data files against a declarative schema"
)]
struct Args {
    /// Data file to validate.
    #[arg(short = 'd', long = "data-file")]
    data_file: PathBuf,

    /// Schema file; repeat to merge several documents (partial schemas
    /// are collected from all of them).
    #[arg(short = 's', long = "schema-file", required = true)]
    schema_files: Vec<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    let mut core = match Core::from_files(&args.data_file, &args.schema_files) {
        Ok(core) => core,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(3);
        }
    };

    match core.validate_all() {
        Ok(errors) if errors.is_empty() => {
            println!("validation.valid");
            ExitCode::SUCCESS
        }
        Ok(errors) => {
            println!("validation.invalid");
            for error in &errors {
                println!(" - {error}");
            }
            ExitCode::from(2)
        }
        Err(CoreError::Validation(aggregate)) => {
            // not reachable through validate_all, but render it anyway
            eprintln!("{aggregate}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(3)
        }
    }
}
