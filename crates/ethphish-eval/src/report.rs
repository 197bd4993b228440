//! Per-class precision/recall/F1 report

use ethphish_core::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Decimal digits printed for every rate
pub const REPORT_DIGITS: usize = 4;

/// Metrics of one class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub class: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Unweighted or support-weighted average over classes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Precision, recall, F1 and support for every class that appears in
/// either the ground truth or the predictions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

/// Ratio with the zero-denominator case defined as 0
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

impl ClassificationReport {
    /// Build the report from parallel truth and prediction slices
    pub fn new(truth: &[f64], predicted: &[f64]) -> Result<Self> {
        if truth.len() != predicted.len() {
            return Err(Error::metrics(format!(
                "{} true labels but {} predictions",
                truth.len(),
                predicted.len()
            )));
        }
        if truth.is_empty() {
            return Err(Error::metrics("cannot report on zero samples"));
        }
        if truth.iter().chain(predicted).any(|v| v.is_nan()) {
            return Err(Error::metrics("labels contain NaN"));
        }

        let mut labels: Vec<f64> = truth.iter().chain(predicted).copied().collect();
        labels.sort_by(f64::total_cmp);
        labels.dedup();

        let classes: Vec<ClassMetrics> = labels
            .iter()
            .map(|&class| {
                let mut tp = 0;
                let mut predicted_count = 0;
                let mut support = 0;
                for (&t, &p) in truth.iter().zip(predicted) {
                    if p == class {
                        predicted_count += 1;
                    }
                    if t == class {
                        support += 1;
                        if p == class {
                            tp += 1;
                        }
                    }
                }
                let precision = ratio(tp, predicted_count);
                let recall = ratio(tp, support);
                ClassMetrics {
                    class,
                    precision,
                    recall,
                    f1_score: f1(precision, recall),
                    support,
                }
            })
            .collect();

        let correct = truth.iter().zip(predicted).filter(|(t, p)| t == p).count();
        let total = truth.len();
        let n = classes.len() as f64;

        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n,
            support: total,
        };

        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            classes
                .iter()
                .map(|c| metric(c) * c.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        Ok(Self {
            accuracy: ratio(correct, total),
            classes,
            macro_avg,
            weighted_avg,
        })
    }

    /// Metrics of one class, if it appeared
    pub fn class(&self, class: f64) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.class == class)
    }
}

const NAME_WIDTH: usize = "weighted avg".len();

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = REPORT_DIGITS;
        let w = NAME_WIDTH;

        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;

        for c in &self.classes {
            writeln!(
                f,
                "{:>w$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                format!("{:.1}", c.class),
                c.precision,
                c.recall,
                c.f1_score,
                c.support
            )?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:>w$}  {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>w$}  {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                name, avg.precision, avg.recall, avg.f1_score, avg.support
            )?;
        }
        Ok(())
    }
}
