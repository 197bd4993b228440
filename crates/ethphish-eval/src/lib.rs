//! ethphish Eval
//!
//! Address-level scoring of record-level predictions:
//! - Mean aggregation per address and ground-truth labeling
//! - ROC curve and trapezoidal AUC
//! - Classification reports over a fixed threshold grid

pub mod aggregate;
pub mod evaluation;
pub mod report;
pub mod roc;
pub mod sweep;

pub use aggregate::{aggregate_by_address, label_addresses, AddressScore};
pub use evaluation::EvaluationReport;
pub use report::{AverageMetrics, ClassMetrics, ClassificationReport, REPORT_DIGITS};
pub use roc::{auc, roc_auc_score, roc_curve, RocCurve};
pub use sweep::{predict_at, threshold_sweep, ThresholdResult, THRESHOLDS};
