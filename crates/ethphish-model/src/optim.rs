//! Fine-tuning optimizer: AdamW with linear warm-up/decay and global-norm
//! gradient clipping

use candle_core::backprop::GradStore;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use ethphish_core::{Error, Result};
use tracing::debug;

/// Linear warm-up to the base rate, then linear decay to zero
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearSchedule {
    pub base_lr: f64,
    pub num_train_steps: usize,
    pub num_warmup_steps: usize,
}

impl LinearSchedule {
    pub fn new(base_lr: f64, num_train_steps: usize, num_warmup_steps: usize) -> Self {
        Self {
            base_lr,
            num_train_steps,
            num_warmup_steps,
        }
    }

    /// Learning rate for a zero-based global step
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.num_warmup_steps {
            return self.base_lr * step as f64 / self.num_warmup_steps as f64;
        }
        if self.num_train_steps == 0 {
            return self.base_lr;
        }
        let done = step.min(self.num_train_steps) as f64 / self.num_train_steps as f64;
        self.base_lr * (1.0 - done)
    }
}

/// Scale gradients so their global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(vars: &[Var], grads: &mut GradStore, max_norm: f64) -> Result<f64> {
    let mut sum_sq = 0.0f64;
    for var in vars {
        if let Some(grad) = grads.get(var.as_tensor()) {
            sum_sq += grad.sqr()?.sum_all()?.to_dtype(candle_core::DType::F64)?.to_scalar::<f64>()?;
        }
    }
    let norm = sum_sq.sqrt();

    if norm > max_norm && norm > 0.0 {
        let scale = max_norm / norm;
        for var in vars {
            if let Some(grad) = grads.remove(var.as_tensor()) {
                grads.insert(var.as_tensor(), (grad * scale)?);
            }
        }
    }

    Ok(norm)
}

/// Statistics of one optimizer step
#[derive(Debug, Clone, Copy)]
pub struct StepStats {
    pub step: usize,
    pub learning_rate: f64,
    pub grad_norm: f64,
}

/// Weight decay applied to every variable except layer-norm and bias terms
pub const WEIGHT_DECAY: f64 = 0.01;

/// Whether a variable is updated without weight decay
pub fn excluded_from_decay(name: &str) -> bool {
    name.contains("LayerNorm") || name.contains("layer_norm") || name.ends_with("bias")
}

/// Runs one update per call to `step`
pub struct FineTuneOptimizer {
    decayed: AdamW,
    undecayed: AdamW,
    vars: Vec<Var>,
    schedule: LinearSchedule,
    clip_norm: f64,
    step: usize,
}

impl FineTuneOptimizer {
    /// AdamW over the named `vars` with the usual BERT fine-tuning
    /// hyperparameters
    pub fn new(vars: Vec<(String, Var)>, schedule: LinearSchedule) -> Result<Self> {
        let (undecayed, decayed): (Vec<_>, Vec<_>) =
            vars.into_iter().partition(|(name, _)| excluded_from_decay(name));
        let decayed: Vec<Var> = decayed.into_iter().map(|(_, var)| var).collect();
        let undecayed: Vec<Var> = undecayed.into_iter().map(|(_, var)| var).collect();
        debug!(
            "AdamW groups: {} with weight decay, {} without",
            decayed.len(),
            undecayed.len()
        );

        let params = |weight_decay| ParamsAdamW {
            lr: schedule.lr_at(0),
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-6,
            weight_decay,
        };
        let vars = decayed.iter().chain(&undecayed).cloned().collect();

        Ok(Self {
            decayed: AdamW::new(decayed, params(WEIGHT_DECAY))?,
            undecayed: AdamW::new(undecayed, params(0.0))?,
            vars,
            schedule,
            clip_norm: 1.0,
            step: 0,
        })
    }

    /// Optimizer over every variable registered in `varmap`
    pub fn from_varmap(varmap: &VarMap, schedule: LinearSchedule) -> Result<Self> {
        let vars = {
            let data = varmap
                .data()
                .lock()
                .map_err(|_| Error::model("variable map lock poisoned"))?;
            data.iter()
                .map(|(name, var)| (name.clone(), var.clone()))
                .collect()
        };
        Self::new(vars, schedule)
    }

    pub fn with_clip_norm(mut self, clip_norm: f64) -> Self {
        self.clip_norm = clip_norm;
        self
    }

    /// Steps taken so far
    pub fn global_step(&self) -> usize {
        self.step
    }

    /// Backpropagate `loss` and apply one update
    pub fn step(&mut self, loss: &Tensor) -> Result<StepStats> {
        let mut grads = loss.backward()?;
        let grad_norm = clip_grad_norm(&self.vars, &mut grads, self.clip_norm)?;

        let learning_rate = self.schedule.lr_at(self.step);
        for adamw in [&mut self.decayed, &mut self.undecayed] {
            adamw.set_learning_rate(learning_rate);
            adamw.step(&grads)?;
        }

        let stats = StepStats {
            step: self.step,
            learning_rate,
            grad_norm,
        };
        self.step += 1;
        Ok(stats)
    }
}
