//! Sigmoid and binary cross-entropy on logits

use candle_core::Tensor;
use ethphish_core::Result;

/// Element-wise logistic function
pub fn sigmoid(logits: &Tensor) -> Result<Tensor> {
    Ok((logits.neg()?.exp()? + 1.0)?.recip()?)
}

/// Mean sigmoid cross-entropy between logits and 0/1 labels.
///
/// Uses `max(x, 0) - x * z + log(1 + exp(-|x|))`, which stays finite for
/// large logits of either sign.
pub fn sigmoid_cross_entropy_with_logits(logits: &Tensor, labels: &Tensor) -> Result<Tensor> {
    let labels = labels.to_dtype(logits.dtype())?;
    let linear = (logits.relu()? - (logits * &labels)?)?;
    let soft = (logits.abs()?.neg()?.exp()? + 1.0)?.log()?;
    Ok((linear + soft)?.mean_all()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_sigmoid_values() {
        let logits = Tensor::new(&[0.0f32, 2.0, -2.0], &Device::Cpu).unwrap();
        let probs = sigmoid(&logits).unwrap().to_vec1::<f32>().unwrap();

        assert!(approx(probs[0], 0.5));
        assert!(approx(probs[1], 0.880797));
        assert!(approx(probs[2], 0.119203));
    }

    #[test]
    fn test_cross_entropy_matches_definition() {
        let logits = Tensor::new(&[0.0f32, 2.0, -1.0], &Device::Cpu).unwrap();
        let labels = Tensor::new(&[1.0f32, 0.0, 0.0], &Device::Cpu).unwrap();
        let loss = sigmoid_cross_entropy_with_logits(&logits, &labels)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();

        let expected = [(0.0f32, 1.0f32), (2.0, 0.0), (-1.0, 0.0)]
            .iter()
            .map(|&(x, z)| {
                let p = 1.0 / (1.0 + (-x).exp());
                -(z * p.ln() + (1.0 - z) * (1.0 - p).ln())
            })
            .sum::<f32>()
            / 3.0;

        assert!(approx(loss, expected), "{} vs {}", loss, expected);
    }

    #[test]
    fn test_cross_entropy_stable_for_large_logits() {
        let logits = Tensor::new(&[100.0f32, -100.0], &Device::Cpu).unwrap();
        let labels = Tensor::new(&[1.0f32, 0.0], &Device::Cpu).unwrap();
        let loss = sigmoid_cross_entropy_with_logits(&logits, &labels)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();

        assert!(loss.is_finite());
        assert!(loss < 1e-6);
    }
}
