//! End-of-run evaluation: aggregate, label, score and sweep

use crate::aggregate::{aggregate_by_address, label_addresses, AddressScore};
use crate::roc::{roc_curve, RocCurve};
use crate::sweep::{threshold_sweep, ThresholdResult, THRESHOLDS};
use ethphish_core::{Error, Prediction, Result};
use ethphish_data::{PhisherSet, Vocab};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Everything reported after an evaluation pass
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    /// Record-level predictions that were aggregated
    pub num_records: usize,

    /// Per-address scores in first-seen order
    pub addresses: Vec<AddressScore>,

    /// Ground truth aligned with `addresses`
    pub labels: Vec<f64>,

    /// `None` when only one class is present
    pub roc: Option<RocCurve>,
    pub auc: Option<f64>,

    pub label_sum: f64,
    pub score_sum: f64,

    pub thresholds: Vec<ThresholdResult>,
}

impl EvaluationReport {
    /// Score record-level predictions at the address level
    pub fn build(predictions: &[Prediction], vocab: &Vocab, phishers: &PhisherSet) -> Result<Self> {
        if predictions.is_empty() {
            return Err(Error::metrics("no predictions to evaluate"));
        }

        let addresses = aggregate_by_address(predictions);
        let labels = label_addresses(&addresses, vocab, phishers)?;
        let scores: Vec<f64> = addresses.iter().map(|a| a.score).collect();
        info!(
            "Aggregated {} records into {} addresses",
            predictions.len(),
            addresses.len()
        );

        let both_classes = labels.contains(&0.0) && labels.contains(&1.0);
        let roc = if both_classes {
            Some(roc_curve(&labels, &scores)?)
        } else {
            warn!("Only one class among evaluated addresses; AUC is undefined");
            None
        };
        let auc = roc.as_ref().map(RocCurve::auc);

        let thresholds = threshold_sweep(&labels, &scores, &THRESHOLDS)?;

        Ok(Self {
            num_records: predictions.len(),
            label_sum: labels.iter().sum(),
            score_sum: scores.iter().sum(),
            addresses,
            labels,
            roc,
            auc,
            thresholds,
        })
    }

    /// Aggregate scores aligned with `labels`
    pub fn scores(&self) -> Vec<f64> {
        self.addresses.iter().map(|a| a.score).collect()
    }

    /// Write the report as pretty JSON, creating parent directories
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        info!("Wrote evaluation report to {}", path.display());
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.auc {
            Some(auc) => writeln!(f, "AUC= {}", auc)?,
            None => writeln!(f, "AUC= undefined (single class)")?,
        }
        writeln!(f, "{}", self.label_sum)?;
        writeln!(f, "{}", self.score_sum)?;

        for result in &self.thresholds {
            writeln!(f, "threshold = {:.2}", result.threshold)?;
            writeln!(f, "{}", result.predicted_positive)?;
            writeln!(f, "{}", result.report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Vec<Prediction>, Vocab, PhisherSet) {
        let vocab = Vocab::from_pairs([("0xa", 1), ("0xb", 2), ("0xc", 3)]);
        let phishers: PhisherSet = ["0xa"].into_iter().collect();
        let predictions = vec![
            Prediction::new(1, 0.9, 1.0),
            Prediction::new(2, 0.2, 0.0),
            Prediction::new(1, 0.7, 1.0),
            Prediction::new(3, 0.4, 0.0),
        ];
        (predictions, vocab, phishers)
    }

    #[test]
    fn test_build_report() {
        let (predictions, vocab, phishers) = fixture();
        let report = EvaluationReport::build(&predictions, &vocab, &phishers).unwrap();

        assert_eq!(report.num_records, 4);
        assert_eq!(report.addresses.len(), 3);
        assert_eq!(report.labels, vec![1.0, 0.0, 0.0]);
        assert_eq!(report.label_sum, 1.0);
        assert_eq!(report.auc, Some(1.0));
        assert_eq!(report.thresholds.len(), THRESHOLDS.len());
    }

    #[test]
    fn test_single_class_has_no_auc() {
        let (predictions, vocab, _) = fixture();
        let report = EvaluationReport::build(&predictions, &vocab, &PhisherSet::default()).unwrap();

        assert!(report.auc.is_none());
        assert!(report.roc.is_none());
        assert!(report.to_string().starts_with("AUC= undefined"));
    }

    #[test]
    fn test_empty_predictions_rejected() {
        let (_, vocab, phishers) = fixture();
        assert!(EvaluationReport::build(&[], &vocab, &phishers).is_err());
    }

    #[test]
    fn test_display_sections() {
        let (predictions, vocab, phishers) = fixture();
        let text = EvaluationReport::build(&predictions, &vocab, &phishers)
            .unwrap()
            .to_string();

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("AUC= 1"));
        assert_eq!(lines.next(), Some("1"));
        assert_eq!(text.matches("threshold = ").count(), 19);
        assert!(text.contains("threshold = 0.50\n1\n"));
    }

    #[test]
    fn test_write_json() {
        let (predictions, vocab, phishers) = fixture();
        let report = EvaluationReport::build(&predictions, &vocab, &phishers).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        report.write_json(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["auc"], serde_json::json!(1.0));
        assert_eq!(value["thresholds"].as_array().unwrap().len(), 19);
    }
}
