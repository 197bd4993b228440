//! Classification reports over a fixed grid of decision thresholds

use crate::report::ClassificationReport;
use ethphish_core::Result;
use serde::Serialize;

/// Decision thresholds evaluated after every run
pub const THRESHOLDS: [f64; 19] = [
    0.05, 0.10, 0.15, 0.20, 0.25, 0.30, 0.35, 0.40, 0.45, 0.50, 0.55, 0.60, 0.65, 0.70, 0.75, 0.80,
    0.85, 0.90, 0.95,
];

/// Outcome at one threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub threshold: f64,

    /// Addresses scored at or above the threshold
    pub predicted_positive: usize,

    pub report: ClassificationReport,
}

/// Binary predictions: 1.0 where `score >= threshold`.
///
/// Both sides are compared at `f32`, the precision the model emits, so a
/// probability sitting on a grid threshold counts as positive.
pub fn predict_at(scores: &[f64], threshold: f64) -> Vec<f64> {
    let threshold = threshold as f32;
    scores
        .iter()
        .map(|&s| if s as f32 >= threshold { 1.0 } else { 0.0 })
        .collect()
}

/// Evaluate `scores` against `labels` at each threshold
pub fn threshold_sweep(
    labels: &[f64],
    scores: &[f64],
    thresholds: &[f64],
) -> Result<Vec<ThresholdResult>> {
    thresholds
        .iter()
        .map(|&threshold| {
            let predicted = predict_at(scores, threshold);
            let predicted_positive = predicted.iter().filter(|&&p| p == 1.0).count();
            Ok(ThresholdResult {
                threshold,
                predicted_positive,
                report: ClassificationReport::new(labels, &predicted)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_grid() {
        assert_eq!(THRESHOLDS.len(), 19);
        assert_eq!(THRESHOLDS[0], 0.05);
        assert_eq!(THRESHOLDS[9], 0.5);
        assert_eq!(THRESHOLDS[18], 0.95);
        assert!(THRESHOLDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_boundary_score_counts_as_positive() {
        let predicted = predict_at(&[0.1, 0.6, 0.5, 0.9], 0.5);
        assert_eq!(predicted, vec![0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_model_probability_on_threshold_is_positive() {
        use crate::aggregate::aggregate_by_address;
        use ethphish_core::Prediction;

        for &t in &THRESHOLDS {
            let scores: Vec<f64> = aggregate_by_address(&[Prediction::new(1, t as f32, 0.0)])
                .iter()
                .map(|a| a.score)
                .collect();
            let results = threshold_sweep(&[1.0], &scores, &[t]).unwrap();
            assert_eq!(results[0].predicted_positive, 1, "threshold {}", t);
        }
    }

    #[test]
    fn test_averaged_probability_on_threshold_is_positive() {
        let scores = [f64::from(0.35f32), f64::from(0.7f32)];
        assert_eq!(predict_at(&scores, 0.35), vec![1.0, 1.0]);
        assert_eq!(predict_at(&scores, 0.7), vec![0.0, 1.0]);
    }

    #[test]
    fn test_sweep_counts() {
        let labels = [0.0, 1.0, 0.0, 1.0];
        let scores = [0.1, 0.6, 0.5, 0.9];

        let results = threshold_sweep(&labels, &scores, &THRESHOLDS).unwrap();
        assert_eq!(results.len(), 19);

        let at_half = &results[9];
        assert_eq!(at_half.threshold, 0.5);
        assert_eq!(at_half.predicted_positive, 3);
        assert_eq!(at_half.report.class(1.0).unwrap().recall, 1.0);

        assert_eq!(results[0].predicted_positive, 4);
        assert_eq!(results[18].predicted_positive, 0);
    }

    #[test]
    fn test_positive_count_never_grows() {
        let scores: Vec<f64> = (0..50).map(|i| i as f64 / 50.0).collect();
        let labels: Vec<f64> = (0..50).map(|i| (i % 2) as f64).collect();

        let counts: Vec<usize> = threshold_sweep(&labels, &scores, &THRESHOLDS)
            .unwrap()
            .iter()
            .map(|r| r.predicted_positive)
            .collect();
        assert!(counts.windows(2).all(|w| w[0] >= w[1]));
    }
}
