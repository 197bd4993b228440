//! Per-address aggregation of record-level predictions

use ethphish_core::{AddressId, Error, Prediction, Result};
use ethphish_data::{PhisherSet, Vocab};
use serde::Serialize;
use std::collections::HashMap;

/// Aggregate score of one address
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressScore {
    pub address: AddressId,

    /// Mean of the per-record probabilities
    pub score: f64,

    /// Number of contributing records
    pub records: usize,
}

/// Group predictions by address, in first-seen order.
///
/// An address with several records scores the arithmetic mean of their
/// probabilities; an address with one record keeps that probability.
pub fn aggregate_by_address(predictions: &[Prediction]) -> Vec<AddressScore> {
    let mut index: HashMap<AddressId, usize> = HashMap::new();
    let mut groups: Vec<(AddressId, Vec<f32>)> = Vec::new();

    for p in predictions {
        let slot = *index.entry(p.address).or_insert_with(|| {
            groups.push((p.address, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(p.probability);
    }

    groups
        .into_iter()
        .map(|(address, probabilities)| {
            let score = match probabilities.as_slice() {
                [single] => f64::from(*single),
                many => many.iter().map(|&p| f64::from(p)).sum::<f64>() / many.len() as f64,
            };
            AddressScore {
                address,
                score,
                records: probabilities.len(),
            }
        })
        .collect()
}

/// Ground-truth label of every aggregated address: 1.0 if its address
/// string is a known phisher, 0.0 otherwise
pub fn label_addresses(
    scores: &[AddressScore],
    vocab: &Vocab,
    phishers: &PhisherSet,
) -> Result<Vec<f64>> {
    scores
        .iter()
        .map(|s| {
            let token = vocab.token(s.address).ok_or_else(|| {
                Error::data(format!("address id {} is not in the vocabulary", s.address))
            })?;
            Ok(f64::from(phishers.label(token)))
        })
        .collect()
}
