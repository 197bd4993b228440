//! ethphish Finetune
//!
//! Drives a fine-tuning run end to end:
//! - Configuration from YAML with command-line overrides
//! - Training phase: optimize until the training data is exhausted, then
//!   save the fine-tuned weights
//! - Evaluation phase: restore the weights, predict every test record and
//!   score the aggregated addresses

pub mod cli;
pub mod config;
pub mod evaluate;
pub mod train;

pub use cli::Cli;
pub use config::FinetuneConfig;
pub use evaluate::{collect_predictions, evaluate};
pub use train::{describe_features, train, TrainSummary};

use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use ethphish_core::Result;
use ethphish_eval::EvaluationReport;
use ethphish_model::{EncoderConfig, PhishDetector};
use tracing::info;

/// Build a detector whose variables live in `varmap`
pub fn build_detector(
    varmap: &VarMap,
    encoder_config: &EncoderConfig,
    head_hidden_size: usize,
    device: &Device,
) -> Result<PhishDetector> {
    let vb = VarBuilder::from_varmap(varmap, DType::F32, device);
    PhishDetector::load(encoder_config, head_hidden_size, vb)
}

/// Results of the phases that ran
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub training: Option<TrainSummary>,
    pub report: Option<EvaluationReport>,
}

/// Run the enabled phases in order
pub fn run(config: &FinetuneConfig) -> Result<RunOutcome> {
    config.validate()?;
    let device = config.create_device()?;
    info!("Using device {:?}", device);

    let mut outcome = RunOutcome::default();
    if config.do_train {
        outcome.training = Some(train(config, &device)?);
    }
    if config.do_eval {
        outcome.report = Some(evaluate(config, &device)?);
    }
    Ok(outcome)
}
