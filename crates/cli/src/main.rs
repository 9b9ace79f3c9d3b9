mod cli;
mod input;
mod output;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};

use lae_compute::{LinearAlgebraEngine, SchedulerConfig};
use lae_core::{config, Config, DenseMatrix};

use crate::cli::CliArgs;

const REPORT_RULE: &str = "========================================";

fn main() -> Result<()> {
    let args = CliArgs::parse();

    config::load_dotenv();
    let config = Config::from_env().context("failed to load configuration")?;

    // RUST_LOG wins over LAE_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log.filter)),
        )
        .with_target(false)
        .init();

    if args.threads < 1 {
        bail!("Number of threads must be at least 1");
    }
    config.log_summary();

    let mut engine = LinearAlgebraEngine::with_config(SchedulerConfig {
        worker_threads: args.threads,
        fatigue_seed: args.seed.or(config.engine.fatigue_seed),
        fatigue_factors: None,
    })
    .context("failed to start worker pool")?;

    match evaluate(&mut engine, &args) {
        Ok(result) => {
            output::write_result(&args.output, &result)?;
            info!(
                rows = result.len(),
                output = %args.output.display(),
                "Result written"
            );
        }
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "Evaluation failed");
            output::write_error(&args.output, &message)?;
        }
    }

    if !args.no_report {
        println!("{}", REPORT_RULE);
        println!("Worker Activity Report:");
        println!("{}", engine.worker_report());
        println!("{}", REPORT_RULE);
    }

    engine.shutdown().context("failed to stop worker pool")?;
    Ok(())
}

fn evaluate(engine: &mut LinearAlgebraEngine, args: &CliArgs) -> Result<DenseMatrix> {
    let tree = input::read_tree(&args.input)?;
    let resolved = engine.run(tree)?;
    match resolved.into_matrix() {
        Some(matrix) => Ok(matrix),
        None => bail!("expression did not resolve to a matrix"),
    }
}
