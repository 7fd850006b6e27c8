//! Membrane - Membrane Biophysics Calculator
//!
//! Runs one solver on a JSON request and prints the JSON result.
//!
//! # Usage
//!
//! ```bash
//! membrane nernst request.json
//! echo '{"params": {"conductance": 2, "reversal_potential": 60}}' | membrane iv_curve
//! membrane --list
//! ```
//!
//! Errors are printed to stderr as `{solver_id, kind, message}` with a
//! non-zero exit status. Set `RUST_LOG=debug` for diagnostics.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use membrane_core::dispatch::{dispatch, solver_schema, DispatchError, Schema};
use membrane_core::domain::{Locale, SolverId};
use membrane_core::io::{read_request, write_json};
use serde::Serialize;

/// Membrane biophysics calculator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Solver to run (see --list)
    #[arg(value_name = "SOLVER_ID", required_unless_present = "list")]
    solver_id: Option<String>,

    /// Path to the JSON request ("-" or omitted for stdin)
    #[arg(value_name = "REQUEST_FILE")]
    request_file: Option<PathBuf>,

    /// List solvers with their parameters and configuration keys
    #[arg(short, long)]
    list: bool,
}

#[derive(Serialize)]
struct SolverInfo {
    id: SolverId,
    #[serde(flatten)]
    schema: Schema,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.list {
        let solvers: Vec<SolverInfo> = SolverId::ALL
            .iter()
            .map(|&id| SolverInfo {
                id,
                schema: solver_schema(id),
            })
            .collect();
        return report(write_json(io::stdout().lock(), &solvers), "list");
    }

    let solver_id = args.solver_id.unwrap_or_default();
    let request = match read_request(args.request_file.as_deref()) {
        Ok(request) => request,
        Err(error) => return fail(&DispatchError::new(&solver_id, error, Locale::En)),
    };

    match dispatch(&solver_id, &request) {
        Ok(result) => report(write_json(io::stdout().lock(), &result), &solver_id),
        Err(failure) => fail(&failure),
    }
}

fn fail(failure: &DispatchError) -> ExitCode {
    if write_json(io::stderr().lock(), failure).is_err() {
        eprintln!("{}", failure);
    }
    ExitCode::FAILURE
}

fn report(outcome: membrane_core::Result<()>, context: &str) -> ExitCode {
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            log::error!("{}: {}", context, error);
            ExitCode::FAILURE
        }
    }
}
