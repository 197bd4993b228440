//! Transaction-sequence transformer encoder
//!
//! A BERT-style encoder whose input embedding is the sum of five lookups
//! (address token, position, in/out flag, count bucket, amount bucket).
//! The same weights encode the incoming, outgoing and combined sequences.

use crate::config::{EncoderConfig, HiddenAct};
use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{linear, Dropout, Embedding, Init, Linear, VarBuilder};
use ethphish_core::{Error, Record, Result, SequenceKind, SubSequence};

/// Encoder contract: inputs of one sub-sequence kind to `[batch, seq, hidden]`
pub trait SequenceEncoder: Send + Sync {
    /// Encode a batch of sequences
    fn encode(&self, inputs: &SequenceInputs, train: bool) -> Result<Tensor>;

    /// Width of the per-position output
    fn hidden_size(&self) -> usize;
}

/// Tensors for one sub-sequence kind of a batch
#[derive(Debug, Clone)]
pub struct SequenceInputs {
    /// `[batch, seq]` i64 ids
    pub token_ids: Tensor,
    pub positions: Tensor,
    pub io_flags: Tensor,
    pub counts: Tensor,
    pub amounts: Tensor,

    /// `[batch, seq]` f32, 1.0 for real positions
    pub mask: Tensor,
}

impl SequenceInputs {
    /// Stack one sub-sequence kind of every record into tensors
    pub fn from_records(records: &[Record], kind: SequenceKind, device: &Device) -> Result<Self> {
        let first = records
            .first()
            .ok_or_else(|| Error::model("cannot build inputs from an empty batch"))?;
        let seq_len = first.sequence(kind).len();

        if let Some(bad) = records.iter().find(|r| r.sequence(kind).len() != seq_len) {
            return Err(Error::model(format!(
                "record for address {} has {} sequence length {}, expected {}",
                bad.address,
                kind.prefix(),
                bad.sequence(kind).len(),
                seq_len
            )));
        }

        let shape = (records.len(), seq_len);
        let ids = |field: fn(&SubSequence) -> &Vec<i32>| -> Result<Tensor> {
            let values: Vec<i64> = records
                .iter()
                .flat_map(|r| field(r.sequence(kind)).iter().map(|&v| i64::from(v)))
                .collect();
            Ok(Tensor::from_vec(values, shape, device)?)
        };

        let mask: Vec<f32> = records
            .iter()
            .flat_map(|r| r.sequence(kind).mask.iter().map(|&m| if m != 0 { 1.0 } else { 0.0 }))
            .collect();

        Ok(Self {
            token_ids: ids(|s| &s.token_ids)?,
            positions: ids(|s| &s.positions)?,
            io_flags: ids(|s| &s.io_flags)?,
            counts: ids(|s| &s.counts)?,
            amounts: ids(|s| &s.amounts)?,
            mask: Tensor::from_vec(mask, shape, device)?,
        })
    }

    pub fn batch_size(&self) -> Result<usize> {
        Ok(self.token_ids.dim(0)?)
    }
}

fn embedding(vocab: usize, hidden: usize, stdev: f64, vb: VarBuilder) -> Result<Embedding> {
    let weights = vb.get_with_hints(
        (vocab, hidden),
        "weight",
        Init::Randn { mean: 0.0, stdev },
    )?;
    Ok(Embedding::new(weights, hidden))
}

/// Reject ids an embedding table cannot index
fn check_ids(ids: &Tensor, limit: usize, field: &str) -> Result<()> {
    let values = ids.flatten_all()?.to_vec1::<i64>()?;
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return Ok(());
    };
    if min < 0 || max >= limit as i64 {
        return Err(Error::model(format!(
            "{} ids must lie in [0, {}), got range [{}, {}]",
            field, limit, min, max
        )));
    }
    Ok(())
}

/// Layer normalization over the last dimension, built from differentiable
/// tensor ops so gradients reach the layers below it
struct LayerNorm {
    weight: Tensor,
    bias: Tensor,
    eps: f64,
}

impl LayerNorm {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mean = xs.mean_keepdim(D::Minus1)?;
        let centered = xs.broadcast_sub(&mean)?;
        let variance = centered.sqr()?.mean_keepdim(D::Minus1)?;
        let normed = centered.broadcast_div(&(variance + self.eps)?.sqrt()?)?;
        Ok(normed.broadcast_mul(&self.weight)?.broadcast_add(&self.bias)?)
    }
}

fn layer_norm(size: usize, eps: f64, vb: VarBuilder) -> Result<LayerNorm> {
    Ok(LayerNorm {
        weight: vb.get_with_hints(size, "weight", Init::Const(1.0))?,
        bias: vb.get_with_hints(size, "bias", Init::Const(0.0))?,
        eps,
    })
}

struct Embeddings {
    tokens: Embedding,
    positions: Embedding,
    io_flags: Embedding,
    counts: Embedding,
    amounts: Embedding,
    layer_norm: LayerNorm,
    dropout: Dropout,
    limits: [usize; 5],
}

impl Embeddings {
    fn load(config: &EncoderConfig, vb: VarBuilder) -> Result<Self> {
        let h = config.hidden_size;
        let std = config.initializer_range;
        Ok(Self {
            tokens: embedding(config.vocab_size, h, std, vb.pp("word_embeddings"))?,
            positions: embedding(config.max_position_embeddings, h, std, vb.pp("position_embeddings"))?,
            io_flags: embedding(config.io_flag_vocab_size, h, std, vb.pp("io_flag_embeddings"))?,
            counts: embedding(config.count_vocab_size, h, std, vb.pp("count_embeddings"))?,
            amounts: embedding(config.amount_vocab_size, h, std, vb.pp("amount_embeddings"))?,
            layer_norm: layer_norm(h, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            dropout: Dropout::new(config.hidden_dropout_prob),
            limits: [
                config.vocab_size,
                config.max_position_embeddings,
                config.io_flag_vocab_size,
                config.count_vocab_size,
                config.amount_vocab_size,
            ],
        })
    }

    fn forward(&self, inputs: &SequenceInputs, train: bool) -> Result<Tensor> {
        let lookups = [
            (&self.tokens, &inputs.token_ids, "token"),
            (&self.positions, &inputs.positions, "position"),
            (&self.io_flags, &inputs.io_flags, "io_flag"),
            (&self.counts, &inputs.counts, "count"),
            (&self.amounts, &inputs.amounts, "amount"),
        ];

        let mut sum: Option<Tensor> = None;
        for ((table, ids, field), limit) in lookups.into_iter().zip(self.limits) {
            check_ids(ids, limit, field)?;
            let embedded = table.forward(ids)?;
            sum = Some(match sum {
                Some(acc) => (acc + embedded)?,
                None => embedded,
            });
        }

        let sum = sum.ok_or_else(|| Error::model("no embeddings configured"))?;
        let normed = self.layer_norm.forward(&sum)?;
        Ok(self.dropout.forward(&normed, train)?)
    }
}

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    layer_norm: LayerNorm,
    attention_dropout: Dropout,
    output_dropout: Dropout,
    num_heads: usize,
    head_dim: usize,
}

impl SelfAttention {
    fn load(config: &EncoderConfig, vb: VarBuilder) -> Result<Self> {
        let h = config.hidden_size;
        let self_vb = vb.pp("self");
        let out_vb = vb.pp("output");
        Ok(Self {
            query: linear(h, h, self_vb.pp("query"))?,
            key: linear(h, h, self_vb.pp("key"))?,
            value: linear(h, h, self_vb.pp("value"))?,
            output: linear(h, h, out_vb.pp("dense"))?,
            layer_norm: layer_norm(h, config.layer_norm_eps, out_vb.pp("LayerNorm"))?,
            attention_dropout: Dropout::new(config.attention_probs_dropout_prob),
            output_dropout: Dropout::new(config.hidden_dropout_prob),
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim(),
        })
    }

    fn split_heads(&self, xs: &Tensor, batch: usize, seq: usize) -> Result<Tensor> {
        Ok(xs
            .reshape((batch, seq, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?)
    }

    fn forward(&self, xs: &Tensor, mask_bias: &Tensor, train: bool) -> Result<Tensor> {
        let (batch, seq, hidden) = xs.dims3()?;

        let q = self.split_heads(&self.query.forward(xs)?, batch, seq)?;
        let k = self.split_heads(&self.key.forward(xs)?, batch, seq)?;
        let v = self.split_heads(&self.value.forward(xs)?, batch, seq)?;

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.t()?)? * scale)?.broadcast_add(mask_bias)?;
        let probs = candle_nn::ops::softmax(&scores, D::Minus1)?;
        let probs = self.attention_dropout.forward(&probs, train)?;

        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((batch, seq, hidden))?;

        let projected = self.output_dropout.forward(&self.output.forward(&context)?, train)?;
        Ok(self.layer_norm.forward(&(projected + xs)?)?)
    }
}

struct FeedForward {
    intermediate: Linear,
    output: Linear,
    layer_norm: LayerNorm,
    dropout: Dropout,
    act: HiddenAct,
}

impl FeedForward {
    fn load(config: &EncoderConfig, vb: VarBuilder) -> Result<Self> {
        let out_vb = vb.pp("output");
        Ok(Self {
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            output: linear(config.intermediate_size, config.hidden_size, out_vb.pp("dense"))?,
            layer_norm: layer_norm(config.hidden_size, config.layer_norm_eps, out_vb.pp("LayerNorm"))?,
            dropout: Dropout::new(config.hidden_dropout_prob),
            act: config.hidden_act,
        })
    }

    fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let hidden = self.intermediate.forward(xs)?;
        let hidden = match self.act {
            HiddenAct::Gelu => hidden.gelu_erf()?,
            HiddenAct::Relu => hidden.relu()?,
        };
        let out = self.dropout.forward(&self.output.forward(&hidden)?, train)?;
        Ok(self.layer_norm.forward(&(out + xs)?)?)
    }
}

struct EncoderLayer {
    attention: SelfAttention,
    feed_forward: FeedForward,
}

impl EncoderLayer {
    fn load(config: &EncoderConfig, vb: VarBuilder) -> Result<Self> {
        Ok(Self {
            attention: SelfAttention::load(config, vb.pp("attention"))?,
            feed_forward: FeedForward::load(config, vb.clone())?,
        })
    }

    fn forward(&self, xs: &Tensor, mask_bias: &Tensor, train: bool) -> Result<Tensor> {
        let attended = self.attention.forward(xs, mask_bias, train)?;
        self.feed_forward.forward(&attended, train)
    }
}

/// BERT-style encoder over transaction sequences
pub struct TransactionEncoder {
    embeddings: Embeddings,
    layers: Vec<EncoderLayer>,
    hidden_size: usize,
}

impl TransactionEncoder {
    /// Build the encoder; variables live under `vb` (conventionally `bert`)
    pub fn load(config: &EncoderConfig, vb: VarBuilder) -> Result<Self> {
        config.validate()?;

        let embeddings = Embeddings::load(config, vb.pp("embeddings"))?;
        let layer_vb = vb.pp("encoder").pp("layer");
        let layers = (0..config.num_hidden_layers)
            .map(|i| EncoderLayer::load(config, layer_vb.pp(i.to_string())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embeddings,
            layers,
            hidden_size: config.hidden_size,
        })
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }
}

impl SequenceEncoder for TransactionEncoder {
    fn encode(&self, inputs: &SequenceInputs, train: bool) -> Result<Tensor> {
        let (batch, seq) = inputs.mask.dims2()?;

        // 0 for real positions, -10000 for padding
        let mask_bias = inputs
            .mask
            .to_dtype(DType::F32)?
            .affine(10000.0, -10000.0)?
            .reshape((batch, 1, 1, seq))?;

        let mut hidden = self.embeddings.forward(inputs, train)?;
        for layer in &self.layers {
            hidden = layer.forward(&hidden, &mask_bias, train)?;
        }
        Ok(hidden)
    }

    fn hidden_size(&self) -> usize {
        self.hidden_size
    }
}
