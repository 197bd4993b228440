//! Command-line interface

use clap::Parser;
use std::path::PathBuf;

/// Every flag except `--config` and `--verbose` overrides the matching
/// field of the configuration file
#[derive(Parser, Debug, Clone)]
#[command(name = "ethphish-finetune")]
#[command(about = "Fine-tune a transaction encoder to detect phishing addresses", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "finetune.yaml")]
    pub config: PathBuf,

    /// Suffix of the dated input, vocabulary and checkpoint files
    #[arg(long)]
    pub bizdate: Option<String>,

    /// Run the training phase
    #[arg(long)]
    pub do_train: Option<bool>,

    /// Run the evaluation phase
    #[arg(long)]
    pub do_eval: Option<bool>,

    /// Passes over the training data
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Training records, without the `.<bizdate>` suffix
    #[arg(long)]
    pub train_input_file: Option<PathBuf>,

    /// Test records, without the `.<bizdate>` suffix
    #[arg(long)]
    pub test_input_file: Option<PathBuf>,

    /// Pretrained checkpoint to initialize matching variables from
    #[arg(long)]
    pub init_checkpoint: Option<PathBuf>,

    /// Directory of the fine-tuned checkpoint
    #[arg(long)]
    pub checkpoint_dir: Option<PathBuf>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Width of the classifier head
    #[arg(long)]
    pub hidden_size: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub max_seq_length: Option<usize>,

    /// cpu, cuda[:N] or metal[:N]
    #[arg(long)]
    pub device: Option<String>,

    /// Write the evaluation report as JSON to this path
    #[arg(long)]
    pub report_output: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
