//! Evaluation phase

use crate::build_detector;
use crate::config::FinetuneConfig;
use candle_core::Device;
use candle_nn::VarMap;
use ethphish_core::{Batch, Prediction, Result};
use ethphish_data::{InputPipeline, PhisherSet, Vocab};
use ethphish_eval::EvaluationReport;
use ethphish_model::{load_checkpoint, EncoderConfig, PhishDetector};
use std::time::Instant;
use tracing::info;

/// Score the test records with the fine-tuned weights and report
/// address-level metrics
pub fn evaluate(config: &FinetuneConfig, device: &Device) -> Result<EvaluationReport> {
    let encoder_config = EncoderConfig::from_file(&config.bert_config_file)?;
    let mut varmap = VarMap::new();
    let detector = build_detector(&varmap, &encoder_config, config.hidden_size, device)?;
    load_checkpoint(&mut varmap, config.checkpoint_path())?;

    let vocab = Vocab::from_file(config.vocab_path())?;
    let phishers = PhisherSet::from_file(&config.phisher_account_file)?;

    let input = config.test_input_path();
    info!("Evaluating on {}", input.display());
    let pipeline = InputPipeline::open(vec![input], config.schema(), config.eval_options())?;

    let predictions = collect_predictions(&detector, pipeline, config.log_every)?;

    let report = EvaluationReport::build(&predictions, &vocab, &phishers)?;
    if let Some(path) = &config.report_output {
        report.write_json(path)?;
    }
    Ok(report)
}

/// Run inference over every batch until the source is exhausted
pub fn collect_predictions<I>(
    detector: &PhishDetector,
    batches: I,
    log_every: usize,
) -> Result<Vec<Prediction>>
where
    I: IntoIterator<Item = Result<Batch>>,
{
    let log_every = log_every.max(1);
    let mut predictions = Vec::new();
    let mut loss_sum = 0.0f64;
    let mut iterations = 0usize;
    let mut start = Instant::now();

    for batch in batches {
        let batch = batch?;
        let (batch_predictions, loss) = detector.predict(&batch)?;
        predictions.extend(batch_predictions);
        loss_sum += f64::from(loss);

        if iterations % log_every == 0 {
            info!(
                "iter={}, time={:.2}s",
                iterations,
                start.elapsed().as_secs_f64()
            );
            start = Instant::now();
        }
        iterations += 1;
    }

    if iterations > 0 {
        info!(
            "Evaluated {} records in {} batches, mean loss {:.6}",
            predictions.len(),
            iterations,
            loss_sum / iterations as f64
        );
    }
    Ok(predictions)
}
