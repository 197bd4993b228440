//! Fine-tuning run configuration

use crate::cli::Cli;
use candle_core::Device;
use ethphish_core::{Error, Result};
use ethphish_data::{suffixed_path, PipelineOptions, RecordSchema};
use ethphish_model::{finetune_checkpoint_path, DeviceType, LinearSchedule};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Fine-tuning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FinetuneConfig {
    /// Suffix of every dated input and output file
    pub bizdate: String,

    pub do_train: bool,
    pub do_eval: bool,

    /// Passes over the training data
    pub epoch: usize,

    pub batch_size: usize,

    /// Positions per sub-sequence
    pub max_seq_length: usize,

    /// Training records, without the `.<bizdate>` suffix
    pub train_input_file: PathBuf,

    /// Test records, without the `.<bizdate>` suffix
    pub test_input_file: PathBuf,

    /// Prefix of the vocabulary file; joined to `vocab_filename` as text
    pub data_dir: String,
    pub vocab_filename: String,

    /// Known phishing accounts, one per line
    pub phisher_account_file: PathBuf,

    /// Encoder configuration (JSON)
    pub bert_config_file: PathBuf,

    /// Pretrained checkpoint to initialize matching variables from
    pub init_checkpoint: Option<PathBuf>,

    pub checkpoint_dir: PathBuf,

    pub learning_rate: f64,
    pub num_train_steps: usize,
    pub num_warmup_steps: usize,

    /// Width of the classifier head
    pub hidden_size: usize,

    /// Record decode workers
    pub num_cpu_threads: usize,

    pub shuffle_buffer: usize,
    pub seed: u64,

    /// Iterations between progress lines
    pub log_every: usize,

    /// cpu, cuda[:N] or metal[:N]
    pub device: String,

    /// Write the evaluation report as JSON to this path
    pub report_output: Option<PathBuf>,
}

impl Default for FinetuneConfig {
    fn default() -> Self {
        Self {
            bizdate: "bert4eth_exp".to_string(),
            do_train: true,
            do_eval: true,
            epoch: 1,
            batch_size: 256,
            max_seq_length: 100,
            train_input_file: PathBuf::from("../data/finetune_train.jsonl"),
            test_input_file: PathBuf::from("../data/finetune_test.jsonl"),
            data_dir: "../data/".to_string(),
            vocab_filename: "vocab".to_string(),
            phisher_account_file: PathBuf::from("../Data/phisher_account.txt"),
            bert_config_file: PathBuf::from("bert_config.json"),
            init_checkpoint: None,
            checkpoint_dir: PathBuf::from("ckpt_dir"),
            learning_rate: 3e-4,
            num_train_steps: 1_000_000,
            num_warmup_steps: 100,
            hidden_size: 128,
            num_cpu_threads: 4,
            shuffle_buffer: 100,
            seed: 12345,
            log_every: 100,
            device: "cpu".to_string(),
            report_output: None,
        }
    }
}

impl FinetuneConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if cli.config.exists() {
            Self::from_file(&cli.config)?
        } else {
            debug!("No config file at {}, using defaults", cli.config.display());
            Self::default()
        };

        config.apply_overrides(cli);
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Apply CLI overrides
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(bizdate) = &cli.bizdate {
            self.bizdate = bizdate.clone();
        }
        if let Some(do_train) = cli.do_train {
            self.do_train = do_train;
        }
        if let Some(do_eval) = cli.do_eval {
            self.do_eval = do_eval;
        }
        if let Some(epoch) = cli.epoch {
            self.epoch = epoch;
        }
        if let Some(path) = &cli.train_input_file {
            self.train_input_file = path.clone();
        }
        if let Some(path) = &cli.test_input_file {
            self.test_input_file = path.clone();
        }
        if let Some(path) = &cli.init_checkpoint {
            self.init_checkpoint = Some(path.clone());
        }
        if let Some(dir) = &cli.checkpoint_dir {
            self.checkpoint_dir = dir.clone();
        }
        if let Some(lr) = cli.learning_rate {
            self.learning_rate = lr;
        }
        if let Some(hidden_size) = cli.hidden_size {
            self.hidden_size = hidden_size;
        }
        if let Some(batch_size) = cli.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(max_seq_length) = cli.max_seq_length {
            self.max_seq_length = max_seq_length;
        }
        if let Some(device) = &cli.device {
            self.device = device.clone();
        }
        if let Some(path) = &cli.report_output {
            self.report_output = Some(path.clone());
        }
    }

    /// Reject settings no run can use
    pub fn validate(&self) -> Result<()> {
        if !self.do_train && !self.do_eval {
            return Err(Error::config("both do_train and do_eval are disabled"));
        }
        let positive = [
            ("batch_size", self.batch_size),
            ("max_seq_length", self.max_seq_length),
            ("num_cpu_threads", self.num_cpu_threads),
            ("hidden_size", self.hidden_size),
            ("log_every", self.log_every),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(Error::config(format!("{} must be positive", name)));
        }
        if self.do_train && self.epoch == 0 {
            return Err(Error::config("epoch must be positive when training"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(Error::config(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        self.device.parse::<DeviceType>()?;
        Ok(())
    }

    pub fn train_input_path(&self) -> PathBuf {
        suffixed_path(&self.train_input_file, &self.bizdate)
    }

    pub fn test_input_path(&self) -> PathBuf {
        suffixed_path(&self.test_input_file, &self.bizdate)
    }

    /// `<data_dir><vocab_filename>.<bizdate>`
    pub fn vocab_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}{}.{}",
            self.data_dir, self.vocab_filename, self.bizdate
        ))
    }

    /// Where the fine-tuned weights are written and read back
    pub fn checkpoint_path(&self) -> PathBuf {
        finetune_checkpoint_path(&self.checkpoint_dir, &self.bizdate)
    }

    pub fn schema(&self) -> RecordSchema {
        RecordSchema::finetune(self.max_seq_length)
    }

    pub fn train_options(&self) -> PipelineOptions {
        PipelineOptions::training(self.epoch, self.batch_size)
            .with_workers(self.num_cpu_threads)
            .with_shuffle_buffer(self.shuffle_buffer)
            .with_seed(self.seed)
    }

    pub fn eval_options(&self) -> PipelineOptions {
        PipelineOptions::evaluation(self.batch_size).with_workers(self.num_cpu_threads)
    }

    pub fn schedule(&self) -> LinearSchedule {
        LinearSchedule::new(
            self.learning_rate,
            self.num_train_steps,
            self.num_warmup_steps,
        )
    }

    /// Create the configured compute device
    pub fn create_device(&self) -> Result<Device> {
        self.device.parse::<DeviceType>()?.create()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_are_valid() {
        let config = FinetuneConfig::default();
        config.validate().unwrap();
        assert_eq!(config.learning_rate, 3e-4);
        assert_eq!(config.hidden_size, 128);
        assert_eq!(config.epoch, 1);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: FinetuneConfig = serde_yaml::from_str(
            "bizdate: exp1\nbatch_size: 32\ninit_checkpoint: pretrained.safetensors\n",
        )
        .unwrap();

        assert_eq!(config.bizdate, "exp1");
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.init_checkpoint, Some(PathBuf::from("pretrained.safetensors")));
        assert_eq!(config.max_seq_length, 100);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finetune.yaml");
        std::fs::write(&path, "epoch: 5\nlearning_rate: 0.01\n").unwrap();

        let cli = Cli::parse_from([
            "ethphish-finetune",
            "--config",
            path.to_str().unwrap(),
            "--epoch",
            "2",
            "--do-train",
            "false",
        ]);
        let config = FinetuneConfig::load(&cli).unwrap();

        assert_eq!(config.epoch, 2);
        assert_eq!(config.learning_rate, 0.01);
        assert!(!config.do_train);
        assert!(config.do_eval);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cli = Cli::parse_from(["ethphish-finetune", "--config", "/nonexistent/finetune.yaml"]);
        let config = FinetuneConfig::load(&cli).unwrap();
        assert_eq!(config.bizdate, "bert4eth_exp");
    }

    #[test]
    fn test_validation() {
        let both_off = FinetuneConfig {
            do_train: false,
            do_eval: false,
            ..Default::default()
        };
        assert!(both_off.validate().is_err());

        let zero_batch = FinetuneConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(zero_batch.validate().unwrap_err().to_string().contains("batch_size"));

        let bad_device = FinetuneConfig {
            device: "tpu".to_string(),
            ..Default::default()
        };
        assert!(bad_device.validate().is_err());
    }

    #[test]
    fn test_dated_paths() {
        let config = FinetuneConfig {
            bizdate: "exp".to_string(),
            data_dir: "data/".to_string(),
            vocab_filename: "vocab".to_string(),
            train_input_file: PathBuf::from("data/train.jsonl"),
            checkpoint_dir: PathBuf::from("ckpt"),
            ..Default::default()
        };

        assert_eq!(config.train_input_path(), PathBuf::from("data/train.jsonl.exp"));
        assert_eq!(config.vocab_path(), PathBuf::from("data/vocab.exp"));
        assert_eq!(
            config.checkpoint_path(),
            PathBuf::from("ckpt/bert_finetune_exp.safetensors")
        );
    }
}
