//! `u-pdptw`: reads a question on stdin, writes the answer on stdout.
//!
//! ```text
//! u-pdptw [config.toml] < question.json > answer.json
//! ```
//!
//! Logs go to stderr; set `RUST_LOG` to change the level.

use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use u_pdptw::config::PlannerConfig;
use u_pdptw::error::Result;
use u_pdptw::io::{read_question, to_answer, write_answer};
use u_pdptw::planner::Planner;

/// Plans robot pickups and deliveries: question JSON on stdin, answer JSON
/// on stdout.
#[derive(Debug, Parser)]
#[command(name = "u-pdptw", version, about)]
struct Cli {
    /// Planner configuration (TOML); defaults apply when omitted.
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("u_pdptw=info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(event = "plan_failed", error = %e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PlannerConfig::from_toml_file(path)?,
        None => PlannerConfig::default(),
    };

    let question = read_question(BufReader::new(io::stdin().lock()))?;
    let orders = question.orders();
    let result = Planner::new(config.clone()).plan(&question.robots, &orders)?;

    let planned = &orders[..result.planned_orders];
    let answer = to_answer(&question.robots, planned, &result.solution, &config.epoch)?;
    let mut out = BufWriter::new(io::stdout().lock());
    write_answer(&mut out, &answer)?;
    out.flush()?;
    Ok(())
}
