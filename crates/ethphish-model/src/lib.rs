//! ethphish Model
//!
//! Candle implementation of the phishing detector:
//! - BERT-style transaction-sequence encoder shared by the incoming,
//!   outgoing and combined sequences
//! - Residual two-layer MLP head producing one logit per record
//! - Sigmoid cross-entropy loss
//! - AdamW with linear warm-up/decay and gradient clipping
//! - Safetensors checkpoints, including partial init from a pretrained encoder

pub mod checkpoint;
pub mod config;
pub mod device;
pub mod encoder;
pub mod head;
pub mod loss;
pub mod model;
pub mod optim;

pub use checkpoint::{
    finetune_checkpoint_path, init_from_checkpoint, load_checkpoint, log_trainable_variables,
    save_checkpoint,
};
pub use config::{EncoderConfig, HiddenAct};
pub use device::DeviceType;
pub use encoder::{SequenceEncoder, SequenceInputs, TransactionEncoder};
pub use head::PhishHead;
pub use model::{ForwardOutput, PhishDetector, ENCODER_SCOPE, HEAD_SCOPE};
pub use optim::{
    clip_grad_norm, excluded_from_decay, FineTuneOptimizer, LinearSchedule, StepStats, WEIGHT_DECAY,
};
