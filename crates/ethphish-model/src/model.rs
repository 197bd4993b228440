//! Encoder + head: the full phishing detector

use crate::config::EncoderConfig;
use crate::encoder::{SequenceEncoder, SequenceInputs, TransactionEncoder};
use crate::head::PhishHead;
use crate::loss::{sigmoid, sigmoid_cross_entropy_with_logits};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use ethphish_core::{Batch, Error, Prediction, Result, SequenceKind};

/// Variable-name prefix of the encoder
pub const ENCODER_SCOPE: &str = "bert";

/// Variable-name prefix of the classification head
pub const HEAD_SCOPE: &str = "MLP";

/// Output of one forward pass over a batch
#[derive(Debug)]
pub struct ForwardOutput {
    /// `[batch]` logits
    pub logits: Tensor,

    /// Mean sigmoid cross-entropy against the record labels
    pub loss: Tensor,
}

impl ForwardOutput {
    /// Per-record probabilities
    pub fn probabilities(&self) -> Result<Vec<f32>> {
        Ok(sigmoid(&self.logits)?.to_vec1::<f32>()?)
    }

    pub fn loss_value(&self) -> Result<f32> {
        Ok(self.loss.to_scalar::<f32>()?)
    }
}

/// Encodes the three sub-sequences of each record with a shared encoder,
/// concatenates their first-position outputs and scores them with the head
pub struct PhishDetector {
    encoder: Box<dyn SequenceEncoder>,
    head: PhishHead,
    device: Device,
}

impl PhishDetector {
    /// Build the transformer encoder and head from configuration
    pub fn load(config: &EncoderConfig, head_hidden_size: usize, vb: VarBuilder) -> Result<Self> {
        let device = vb.device().clone();
        let encoder = TransactionEncoder::load(config, vb.pp(ENCODER_SCOPE))?;
        Self::with_encoder(Box::new(encoder), head_hidden_size, vb, device)
    }

    /// Build a detector around any encoder
    pub fn with_encoder(
        encoder: Box<dyn SequenceEncoder>,
        head_hidden_size: usize,
        vb: VarBuilder,
        device: Device,
    ) -> Result<Self> {
        if head_hidden_size == 0 {
            return Err(Error::model("head hidden size must be positive"));
        }
        let input_dim = encoder.hidden_size() * SequenceKind::ALL.len();
        let head = PhishHead::load(input_dim, head_hidden_size, vb.pp(HEAD_SCOPE))?;

        Ok(Self {
            encoder,
            head,
            device,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// `[batch]` logits for a batch of records
    pub fn logits(&self, batch: &Batch, train: bool) -> Result<Tensor> {
        let pooled = SequenceKind::ALL
            .iter()
            .map(|&kind| {
                let inputs = SequenceInputs::from_records(&batch.records, kind, &self.device)?;
                let hidden = self.encoder.encode(&inputs, train)?;
                // first position summarises the sequence
                Ok(hidden.narrow(1, 0, 1)?.squeeze(1)?)
            })
            .collect::<Result<Vec<Tensor>>>()?;

        let features = Tensor::cat(&pooled, 1)?;
        self.head.forward(&features)
    }

    /// Logits and loss for a batch
    pub fn forward(&self, batch: &Batch, train: bool) -> Result<ForwardOutput> {
        let logits = self.logits(batch, train)?;
        let labels = Tensor::from_vec(batch.labels(), batch.len(), &self.device)?;
        let loss = sigmoid_cross_entropy_with_logits(&logits, &labels)?;
        Ok(ForwardOutput { logits, loss })
    }

    /// Inference-mode predictions for every record of a batch
    pub fn predict(&self, batch: &Batch) -> Result<(Vec<Prediction>, f32)> {
        let output = self.forward(batch, false)?;
        let probabilities = output.probabilities()?;

        let predictions = batch
            .records
            .iter()
            .zip(probabilities)
            .map(|(record, p)| Prediction::new(record.address, p, record.label))
            .collect();

        Ok((predictions, output.loss_value()?))
    }
}
