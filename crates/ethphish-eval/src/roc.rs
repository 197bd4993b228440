//! Receiver operating characteristic and area under the curve

use ethphish_core::{Error, Result};
use serde::Serialize;

/// ROC curve points, ordered by decreasing threshold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RocCurve {
    /// False-positive rate at each threshold
    pub fpr: Vec<f64>,
    /// True-positive rate at each threshold
    pub tpr: Vec<f64>,
    /// Decreasing score thresholds; the first is `+inf`
    pub thresholds: Vec<f64>,
}

impl RocCurve {
    pub fn len(&self) -> usize {
        self.thresholds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thresholds.is_empty()
    }

    /// Trapezoidal area under this curve
    pub fn auc(&self) -> f64 {
        auc(&self.fpr, &self.tpr)
    }
}

/// Compute the ROC curve of binary `labels` (0.0 / 1.0) against `scores`.
///
/// Collinear interior points are dropped and a `(0, 0)` point with an
/// infinite threshold is prepended. Both classes must be present.
pub fn roc_curve(labels: &[f64], scores: &[f64]) -> Result<RocCurve> {
    if labels.len() != scores.len() {
        return Err(Error::metrics(format!(
            "{} labels but {} scores",
            labels.len(),
            scores.len()
        )));
    }
    if let Some(bad) = labels.iter().find(|&&l| l != 0.0 && l != 1.0) {
        return Err(Error::metrics(format!("label {} is not binary", bad)));
    }
    if scores.iter().any(|s| s.is_nan()) {
        return Err(Error::metrics("scores contain NaN"));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    // Cumulative true/false positives at the last index of each distinct score
    let mut tps = Vec::new();
    let mut fps = Vec::new();
    let mut thresholds = Vec::new();
    let mut tp = 0.0;
    let mut fp = 0.0;
    for (i, &idx) in order.iter().enumerate() {
        if labels[idx] == 1.0 {
            tp += 1.0;
        } else {
            fp += 1.0;
        }
        let is_last_of_value = order
            .get(i + 1)
            .map_or(true, |&next| scores[next] != scores[idx]);
        if is_last_of_value {
            tps.push(tp);
            fps.push(fp);
            thresholds.push(scores[idx]);
        }
    }

    if tp == 0.0 || fp == 0.0 {
        return Err(Error::metrics(
            "ROC is undefined when only one class is present",
        ));
    }

    let keep = drop_intermediate(&fps, &tps);

    let mut curve = RocCurve {
        fpr: vec![0.0],
        tpr: vec![0.0],
        thresholds: vec![f64::INFINITY],
    };
    for i in keep {
        curve.fpr.push(fps[i] / fp);
        curve.tpr.push(tps[i] / tp);
        curve.thresholds.push(thresholds[i]);
    }
    Ok(curve)
}

/// Indices to keep: the endpoints plus every point where either
/// cumulative count changes slope
fn drop_intermediate(fps: &[f64], tps: &[f64]) -> Vec<usize> {
    let n = fps.len();
    (0..n)
        .filter(|&i| {
            if i == 0 || i + 1 == n {
                return true;
            }
            let bend = |v: &[f64]| v[i - 1] - 2.0 * v[i] + v[i + 1] != 0.0;
            bend(fps) || bend(tps)
        })
        .collect()
}

/// Area under a piecewise-linear curve by the trapezoidal rule
pub fn auc(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (xs[1] - xs[0]) * (ys[0] + ys[1]) / 2.0)
        .sum()
}

/// Area under the ROC curve of `labels` against `scores`
pub fn roc_auc_score(labels: &[f64], scores: &[f64]) -> Result<f64> {
    Ok(roc_curve(labels, scores)?.auc())
}
