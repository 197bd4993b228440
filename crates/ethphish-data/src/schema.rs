//! Declared shape of a serialized record

use ethphish_core::SequenceKind;
use std::collections::BTreeMap;

/// Per-position fields of every sub-sequence, in serialized naming
pub const SEQUENCE_FIELDS: [&str; 6] = [
    "token_ids",
    "positions",
    "io_flags",
    "counts",
    "values",
    "mask",
];

/// Element type of a feature as stored on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureType {
    /// Stored as 64-bit integers, narrowed to i32 on decode
    Int64,
    /// Stored as 32-bit floats
    Float32,
}

/// A feature with a fixed number of elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedLenFeature {
    pub len: usize,
    pub dtype: FeatureType,
}

impl FixedLenFeature {
    pub fn int64(len: usize) -> Self {
        Self {
            len,
            dtype: FeatureType::Int64,
        }
    }

    pub fn float32(len: usize) -> Self {
        Self {
            len,
            dtype: FeatureType::Float32,
        }
    }
}

/// Feature name to declared shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSchema {
    features: BTreeMap<String, FixedLenFeature>,
}

impl RecordSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a feature
    pub fn with_feature(mut self, name: impl Into<String>, feature: FixedLenFeature) -> Self {
        self.features.insert(name.into(), feature);
        self
    }

    /// Schema of the fine-tuning records: address, label and the three
    /// sub-sequences of `max_seq_length` positions each
    pub fn finetune(max_seq_length: usize) -> Self {
        let mut schema = Self::new()
            .with_feature("address", FixedLenFeature::int64(1))
            .with_feature("label", FixedLenFeature::float32(1));

        for kind in SequenceKind::ALL {
            for field in SEQUENCE_FIELDS {
                schema = schema.with_feature(
                    sequence_feature_name(kind, field),
                    FixedLenFeature::int64(max_seq_length),
                );
            }
        }

        schema
    }

    /// Get a feature by name
    pub fn get(&self, name: &str) -> Option<&FixedLenFeature> {
        self.features.get(name)
    }

    /// Iterate features in name order
    pub fn features(&self) -> impl Iterator<Item = (&str, &FixedLenFeature)> {
        self.features.iter().map(|(name, f)| (name.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Serialized name of a sub-sequence field, e.g. `in_token_ids`
pub fn sequence_feature_name(kind: SequenceKind, field: &str) -> String {
    format!("{}_{}", kind.prefix(), field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finetune_schema() {
        let schema = RecordSchema::finetune(100);

        assert_eq!(schema.len(), 2 + 3 * SEQUENCE_FIELDS.len());
        assert_eq!(schema.get("address"), Some(&FixedLenFeature::int64(1)));
        assert_eq!(schema.get("label"), Some(&FixedLenFeature::float32(1)));
        assert_eq!(schema.get("out_values"), Some(&FixedLenFeature::int64(100)));
        assert_eq!(schema.get("all_mask"), Some(&FixedLenFeature::int64(100)));
        assert!(schema.get("in_amounts").is_none());
    }

    #[test]
    fn test_sequence_feature_name() {
        assert_eq!(
            sequence_feature_name(SequenceKind::Combined, "io_flags"),
            "all_io_flags"
        );
    }
}
