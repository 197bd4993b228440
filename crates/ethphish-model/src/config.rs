//! Encoder architecture configuration
//!
//! Read from the same JSON file the pretraining run wrote, so the field
//! names follow the usual BERT config layout.

use ethphish_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Activation used inside the feed-forward blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HiddenAct {
    #[default]
    Gelu,
    Relu,
}

/// Transformer encoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Number of address tokens
    pub vocab_size: usize,

    #[serde(default = "default_hidden_size")]
    pub hidden_size: usize,

    #[serde(default = "default_num_hidden_layers")]
    pub num_hidden_layers: usize,

    #[serde(default = "default_num_attention_heads")]
    pub num_attention_heads: usize,

    #[serde(default = "default_intermediate_size")]
    pub intermediate_size: usize,

    #[serde(default)]
    pub hidden_act: HiddenAct,

    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob: f32,

    #[serde(default = "default_dropout")]
    pub attention_probs_dropout_prob: f32,

    #[serde(default = "default_max_position_embeddings")]
    pub max_position_embeddings: usize,

    /// Distinct in/out direction flags
    #[serde(default = "default_io_flag_vocab_size")]
    pub io_flag_vocab_size: usize,

    /// Distinct bucketized transaction counts
    #[serde(default = "default_count_vocab_size")]
    pub count_vocab_size: usize,

    /// Distinct bucketized transfer amounts
    #[serde(default = "default_amount_vocab_size")]
    pub amount_vocab_size: usize,

    /// Stddev of the normal init used for embeddings
    #[serde(default = "default_initializer_range")]
    pub initializer_range: f64,

    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
}

fn default_hidden_size() -> usize {
    64
}

fn default_num_hidden_layers() -> usize {
    8
}

fn default_num_attention_heads() -> usize {
    2
}

fn default_intermediate_size() -> usize {
    64
}

fn default_dropout() -> f32 {
    0.2
}

fn default_max_position_embeddings() -> usize {
    512
}

fn default_io_flag_vocab_size() -> usize {
    3
}

fn default_count_vocab_size() -> usize {
    100
}

fn default_amount_vocab_size() -> usize {
    15
}

fn default_initializer_range() -> f64 {
    0.02
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl EncoderConfig {
    /// Minimal configuration with defaults for everything but the vocabulary
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            hidden_size: default_hidden_size(),
            num_hidden_layers: default_num_hidden_layers(),
            num_attention_heads: default_num_attention_heads(),
            intermediate_size: default_intermediate_size(),
            hidden_act: HiddenAct::default(),
            hidden_dropout_prob: default_dropout(),
            attention_probs_dropout_prob: default_dropout(),
            max_position_embeddings: default_max_position_embeddings(),
            io_flag_vocab_size: default_io_flag_vocab_size(),
            count_vocab_size: default_count_vocab_size(),
            amount_vocab_size: default_amount_vocab_size(),
            initializer_range: default_initializer_range(),
            layer_norm_eps: default_layer_norm_eps(),
        }
    }

    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read encoder config {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Failed to parse encoder config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the dimensions are usable
    pub fn validate(&self) -> Result<()> {
        if self.hidden_size == 0 || self.num_attention_heads == 0 {
            return Err(Error::config("hidden_size and num_attention_heads must be positive"));
        }
        if self.hidden_size % self.num_attention_heads != 0 {
            return Err(Error::config(format!(
                "hidden_size {} is not a multiple of num_attention_heads {}",
                self.hidden_size, self.num_attention_heads
            )));
        }
        Ok(())
    }

    /// Width of each attention head
    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}
