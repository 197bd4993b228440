//! ethphish Data
//!
//! Everything that turns files on disk into model inputs and ground truth:
//! - Record schema and decoder (JSON Lines, int64 narrowed to i32)
//! - Batched input pipeline with repeat, shuffle and parallel decode
//! - Address vocabulary
//! - Known phisher account list

pub mod decoder;
pub mod phishers;
pub mod pipeline;
pub mod schema;
pub mod vocab;

pub use decoder::{decode_example, decode_record, record_from_example, Example, FeatureValue};
pub use phishers::PhisherSet;
pub use pipeline::{suffixed_path, InputPipeline, PipelineOptions};
pub use schema::{sequence_feature_name, FeatureType, FixedLenFeature, RecordSchema, SEQUENCE_FIELDS};
pub use vocab::Vocab;
