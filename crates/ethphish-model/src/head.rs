//! Two-layer MLP classification head with a residual connection

use candle_core::{Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
use ethphish_core::Result;

/// Maps pooled sequence features to one logit per record
pub struct PhishHead {
    f1: Linear,
    f2: Linear,
    logit: Linear,
}

impl PhishHead {
    /// Build the head; variables live under `vb` (conventionally `MLP`)
    pub fn load(input_dim: usize, hidden_size: usize, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            f1: linear(input_dim, hidden_size, vb.pp("f1"))?,
            f2: linear(hidden_size, hidden_size, vb.pp("f2"))?,
            logit: linear(hidden_size, 1, vb.pp("logit"))?,
        })
    }

    /// `[batch, input_dim]` features to `[batch]` logits
    pub fn forward(&self, features: &Tensor) -> Result<Tensor> {
        let dnn1 = self.f1.forward(features)?.relu()?;
        let dnn2 = self.f2.forward(&dnn1)?.relu()?;
        let logit = self.logit.forward(&(dnn2 + &dnn1)?)?;
        Ok(logit.squeeze(1)?)
    }
}
