//! Record decoding
//!
//! Records are stored as JSON Lines: one object per line mapping feature
//! names to number arrays. Decoding checks every declared feature against
//! the schema and narrows 64-bit integers to 32 bits. There is no recovery;
//! a record that does not match its schema is an error.

use crate::schema::{sequence_feature_name, FeatureType, RecordSchema};
use ethphish_core::{Error, Record, Result, SequenceKind, SubSequence};
use serde_json::Value;
use std::collections::BTreeMap;

/// Decoded values of one feature
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Int32(Vec<i32>),
    Float32(Vec<f32>),
}

/// A decoded record, keyed by feature name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Example {
    features: BTreeMap<String, FeatureValue>,
}

impl Example {
    /// Get a feature by name
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    /// Take an integer feature out of the example
    pub fn take_int32(&mut self, name: &str) -> Result<Vec<i32>> {
        match self.features.remove(name) {
            Some(FeatureValue::Int32(values)) => Ok(values),
            Some(FeatureValue::Float32(_)) => Err(Error::decode(format!(
                "feature '{}' is float32, expected int",
                name
            ))),
            None => Err(Error::decode(format!("feature '{}' not decoded", name))),
        }
    }

    /// Take a float feature out of the example
    pub fn take_float32(&mut self, name: &str) -> Result<Vec<f32>> {
        match self.features.remove(name) {
            Some(FeatureValue::Float32(values)) => Ok(values),
            Some(FeatureValue::Int32(_)) => Err(Error::decode(format!(
                "feature '{}' is int, expected float32",
                name
            ))),
            None => Err(Error::decode(format!("feature '{}' not decoded", name))),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Decode one serialized record against a schema
pub fn decode_example(line: &str, schema: &RecordSchema) -> Result<Example> {
    let object: serde_json::Map<String, Value> = serde_json::from_str(line)
        .map_err(|e| Error::decode(format!("invalid record: {}", e)))?;

    let mut features = BTreeMap::new();
    for (name, spec) in schema.features() {
        let raw = object
            .get(name)
            .ok_or_else(|| Error::decode(format!("missing feature '{}'", name)))?;

        let items = match raw {
            Value::Array(items) => items.as_slice(),
            scalar => std::slice::from_ref(scalar),
        };

        if items.len() != spec.len {
            return Err(Error::decode(format!(
                "feature '{}' has {} values, expected {}",
                name,
                items.len(),
                spec.len
            )));
        }

        let value = match spec.dtype {
            FeatureType::Int64 => FeatureValue::Int32(
                items
                    .iter()
                    .map(|v| narrow_int(name, v))
                    .collect::<Result<_>>()?,
            ),
            FeatureType::Float32 => FeatureValue::Float32(
                items
                    .iter()
                    .map(|v| {
                        v.as_f64().map(|f| f as f32).ok_or_else(|| {
                            Error::decode(format!("feature '{}' has non-numeric value {}", name, v))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
        };

        features.insert(name.to_string(), value);
    }

    Ok(Example { features })
}

fn narrow_int(name: &str, value: &Value) -> Result<i32> {
    let wide = value.as_i64().ok_or_else(|| {
        Error::decode(format!("feature '{}' has non-integer value {}", name, value))
    })?;

    i32::try_from(wide).map_err(|_| {
        Error::decode(format!(
            "feature '{}' value {} does not fit in 32 bits",
            name, wide
        ))
    })
}

/// Assemble a typed record from a decoded fine-tuning example
pub fn record_from_example(mut example: Example) -> Result<Record> {
    let address = single(example.take_int32("address")?, "address")?;
    let label = single(example.take_float32("label")?, "label")?;

    let mut take_sequence = |kind: SequenceKind| -> Result<SubSequence> {
        let mut field = |f: &str| example.take_int32(&sequence_feature_name(kind, f));
        Ok(SubSequence {
            token_ids: field("token_ids")?,
            positions: field("positions")?,
            io_flags: field("io_flags")?,
            counts: field("counts")?,
            amounts: field("values")?,
            mask: field("mask")?,
        })
    };

    let incoming = take_sequence(SequenceKind::Incoming)?;
    let outgoing = take_sequence(SequenceKind::Outgoing)?;
    let combined = take_sequence(SequenceKind::Combined)?;

    Ok(Record {
        address,
        label,
        incoming,
        outgoing,
        combined,
    })
}

fn single<T: Copy>(values: Vec<T>, name: &str) -> Result<T> {
    match values.as_slice() {
        [v] => Ok(*v),
        _ => Err(Error::decode(format!(
            "feature '{}' must hold exactly one value",
            name
        ))),
    }
}

/// Decode a serialized fine-tuning record straight into a `Record`
pub fn decode_record(line: &str, schema: &RecordSchema) -> Result<Record> {
    record_from_example(decode_example(line, schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FixedLenFeature, SEQUENCE_FIELDS};
    use serde_json::json;

    fn record_json(seq_len: usize, address: i64, label: f32) -> serde_json::Map<String, Value> {
        let mut object = serde_json::Map::new();
        object.insert("address".into(), json!([address]));
        object.insert("label".into(), json!([label]));
        for kind in SequenceKind::ALL {
            for field in SEQUENCE_FIELDS {
                let values: Vec<i64> = (0..seq_len as i64).collect();
                object.insert(sequence_feature_name(kind, field), json!(values));
            }
        }
        object
    }

    #[test]
    fn test_decode_record() {
        let schema = RecordSchema::finetune(4);
        let line = Value::Object(record_json(4, 42, 1.0)).to_string();

        let record = decode_record(&line, &schema).unwrap();
        assert_eq!(record.address, 42);
        assert_eq!(record.label, 1.0);
        assert_eq!(record.incoming.token_ids, vec![0, 1, 2, 3]);
        assert_eq!(record.combined.amounts, vec![0, 1, 2, 3]);
        assert_eq!(record.seq_len(), 4);
    }

    #[test]
    fn test_scalar_accepted_for_single_value() {
        let schema = RecordSchema::finetune(2);
        let mut object = record_json(2, 0, 0.0);
        object.insert("address".into(), json!(17));
        object.insert("label".into(), json!(0.0));

        let record = decode_record(&Value::Object(object).to_string(), &schema).unwrap();
        assert_eq!(record.address, 17);
    }

    #[test]
    fn test_missing_feature_rejected() {
        let schema = RecordSchema::finetune(2);
        let mut object = record_json(2, 1, 0.0);
        object.remove("out_mask");

        let err = decode_record(&Value::Object(object).to_string(), &schema).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.to_string().contains("out_mask"));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let schema = RecordSchema::finetune(3);
        let mut object = record_json(3, 1, 0.0);
        object.insert("in_counts".into(), json!([1, 2]));

        let err = decode_record(&Value::Object(object).to_string(), &schema).unwrap_err();
        assert!(err.to_string().contains("has 2 values, expected 3"));
    }

    #[test]
    fn test_out_of_range_int_rejected() {
        let schema = RecordSchema::new().with_feature("address", FixedLenFeature::int64(1));

        let ok = decode_example(r#"{"address": [2147483647]}"#, &schema).unwrap();
        assert_eq!(ok.get("address"), Some(&FeatureValue::Int32(vec![i32::MAX])));

        let err = decode_example(r#"{"address": [2147483648]}"#, &schema).unwrap_err();
        assert!(err.to_string().contains("does not fit in 32 bits"));
    }

    #[test]
    fn test_float_in_int_feature_rejected() {
        let schema = RecordSchema::new().with_feature("address", FixedLenFeature::int64(1));
        assert!(decode_example(r#"{"address": [1.5]}"#, &schema).is_err());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let schema = RecordSchema::new().with_feature("label", FixedLenFeature::float32(1));
        let example = decode_example(r#"{"label": [0.25], "extra": "x"}"#, &schema).unwrap();
        assert_eq!(example.len(), 1);
        assert_eq!(example.get("label"), Some(&FeatureValue::Float32(vec![0.25])));
    }

    #[test]
    fn test_invalid_json_rejected() {
        let schema = RecordSchema::finetune(1);
        assert!(matches!(
            decode_record("{not json", &schema),
            Err(Error::Decode(_))
        ));
    }
}
