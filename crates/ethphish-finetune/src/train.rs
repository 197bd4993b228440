//! Training phase

use crate::config::FinetuneConfig;
use crate::build_detector;
use candle_core::Device;
use candle_nn::VarMap;
use ethphish_core::Result;
use ethphish_data::{InputPipeline, RecordSchema};
use ethphish_model::{
    init_from_checkpoint, log_trainable_variables, save_checkpoint, EncoderConfig,
    FineTuneOptimizer,
};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// What a finished training phase produced
#[derive(Debug, Clone)]
pub struct TrainSummary {
    /// Optimizer steps taken
    pub steps: usize,

    /// Records consumed across all epochs
    pub records: usize,

    /// Loss of the last batch
    pub final_loss: Option<f32>,

    /// Where the fine-tuned weights were saved
    pub checkpoint: PathBuf,
}

/// Fine-tune until the training data is exhausted, then save the weights
pub fn train(config: &FinetuneConfig, device: &Device) -> Result<TrainSummary> {
    let encoder_config = EncoderConfig::from_file(&config.bert_config_file)?;
    let varmap = VarMap::new();
    let detector = build_detector(&varmap, &encoder_config, config.hidden_size, device)?;

    let initialized = match &config.init_checkpoint {
        Some(path) => init_from_checkpoint(&varmap, path, device)?,
        None => BTreeSet::new(),
    };
    log_trainable_variables(&varmap, &initialized);

    let mut optimizer = FineTuneOptimizer::from_varmap(&varmap, config.schedule())?;

    debug!("*** Features ***");
    for line in describe_features(&config.schema(), config.batch_size) {
        debug!("{}", line);
    }

    let input = config.train_input_path();
    info!(
        "Training on {} for {} epoch(s), batch size {}",
        input.display(),
        config.epoch,
        config.batch_size
    );
    let pipeline = InputPipeline::open(vec![input], config.schema(), config.train_options())?;

    let mut losses: Vec<f32> = Vec::new();
    let mut records = 0;
    let mut final_loss = None;
    let mut start = Instant::now();

    for (iter, batch) in pipeline.enumerate() {
        let batch = batch?;
        let output = detector.forward(&batch, true)?;
        let loss = output.loss_value()?;
        let stats = optimizer.step(&output.loss)?;

        losses.push(loss);
        records += batch.len();
        final_loss = Some(loss);

        if iter % config.log_every == 0 {
            let mean = losses.iter().sum::<f32>() / losses.len() as f32;
            info!(
                "iter={}, loss={:.6}, lr={:.3e}, grad_norm={:.4}, time={:.2}s",
                iter,
                mean,
                stats.learning_rate,
                stats.grad_norm,
                start.elapsed().as_secs_f64()
            );
            losses.clear();
            start = Instant::now();
        }
    }

    info!(
        "Training data exhausted after {} steps ({} records)",
        optimizer.global_step(),
        records
    );

    let checkpoint = config.checkpoint_path();
    save_checkpoint(&varmap, &checkpoint)?;

    Ok(TrainSummary {
        steps: optimizer.global_step(),
        records,
        final_loss,
        checkpoint,
    })
}

/// One `name = .., shape = ..` line per input feature, in name order
pub fn describe_features(schema: &RecordSchema, batch_size: usize) -> Vec<String> {
    schema
        .features()
        .map(|(name, feature)| {
            format!(
                "  name = {}, shape = [{}, {}], dtype = {:?}",
                name, batch_size, feature.len, feature.dtype
            )
        })
        .collect()
}
