//! Core types for ethphish

use serde::{Deserialize, Serialize};

/// Vocabulary id of an address, narrowed to 32 bits at decode time
pub type AddressId = i32;

/// The three views of an address's transaction history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    /// Transactions received by the address
    Incoming,
    /// Transactions sent by the address
    Outgoing,
    /// Both directions interleaved
    Combined,
}

impl SequenceKind {
    /// All kinds, in the order the encoder outputs are concatenated
    pub const ALL: [SequenceKind; 3] = [Self::Incoming, Self::Outgoing, Self::Combined];

    /// Feature-name prefix used by the serialized records
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Incoming => "in",
            Self::Outgoing => "out",
            Self::Combined => "all",
        }
    }
}

/// Per-field arrays of one sub-sequence; every field has `max_seq_length` entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubSequence {
    pub token_ids: Vec<i32>,
    pub positions: Vec<i32>,
    pub io_flags: Vec<i32>,
    pub counts: Vec<i32>,
    /// Bucketized transfer amounts
    pub amounts: Vec<i32>,
    /// 1 for real positions, 0 for padding
    pub mask: Vec<i32>,
}

impl SubSequence {
    /// Sequence length (all fields share it)
    pub fn len(&self) -> usize {
        self.token_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.token_ids.is_empty()
    }

    /// Number of non-padding positions
    pub fn active_len(&self) -> usize {
        self.mask.iter().filter(|&&m| m != 0).count()
    }
}

/// One transaction-sequence sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Address the sequences belong to
    pub address: AddressId,

    /// Binary label carried by the record (0.0 or 1.0)
    pub label: f32,

    pub incoming: SubSequence,
    pub outgoing: SubSequence,
    pub combined: SubSequence,
}

impl Record {
    /// Get the sub-sequence of the given kind
    pub fn sequence(&self, kind: SequenceKind) -> &SubSequence {
        match kind {
            SequenceKind::Incoming => &self.incoming,
            SequenceKind::Outgoing => &self.outgoing,
            SequenceKind::Combined => &self.combined,
        }
    }

    /// Sequence length shared by all sub-sequences
    pub fn seq_len(&self) -> usize {
        self.combined.len()
    }
}

/// A group of records processed in one step
#[derive(Debug, Clone, Default)]
pub struct Batch {
    pub records: Vec<Record>,
}

impl Batch {
    /// Create a batch from records
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Address ids in record order
    pub fn addresses(&self) -> Vec<AddressId> {
        self.records.iter().map(|r| r.address).collect()
    }

    /// Labels in record order
    pub fn labels(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.label).collect()
    }
}

/// Model output for a single record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub address: AddressId,

    /// Predicted phishing probability (0.0-1.0)
    pub probability: f32,

    /// Label carried by the record
    pub label: f32,
}

impl Prediction {
    pub fn new(address: AddressId, probability: f32, label: f32) -> Self {
        Self {
            address,
            probability,
            label,
        }
    }
}
