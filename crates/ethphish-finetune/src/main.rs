//! ethphish fine-tuning driver
//!
//! Fine-tunes a transaction-sequence encoder on labelled addresses, then
//! prints address-level ROC/AUC and threshold-sweep reports.

use anyhow::Result;
use clap::Parser;
use ethphish_finetune::{run, Cli, FinetuneConfig};
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    let config = FinetuneConfig::load(&cli)?;
    info!("Configuration loaded");
    info!("bizdate: {}", config.bizdate);
    info!("do_train: {}, do_eval: {}", config.do_train, config.do_eval);

    let outcome = run(&config)?;

    if let Some(summary) = &outcome.training {
        info!(
            "Trained {} steps, checkpoint at {}",
            summary.steps,
            summary.checkpoint.display()
        );
    }
    if let Some(report) = &outcome.report {
        print!("{}", report);
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("ethphish=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ethphish=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
