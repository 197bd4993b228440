//! Address vocabulary: token id <-> address string

use ethphish_core::{AddressId, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// On-disk form; either direction may be omitted
#[derive(Debug, Default, Serialize, Deserialize)]
struct VocabFile {
    #[serde(default)]
    token_to_ids: Option<HashMap<String, AddressId>>,

    #[serde(default)]
    id_to_tokens: Option<HashMap<AddressId, String>>,
}

/// Bidirectional mapping between address strings and vocabulary ids
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    token_to_ids: HashMap<String, AddressId>,
    id_to_tokens: HashMap<AddressId, String>,
}

impl Vocab {
    /// Build a vocabulary from (address, id) pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, AddressId)>,
        S: Into<String>,
    {
        let token_to_ids: HashMap<String, AddressId> =
            pairs.into_iter().map(|(t, id)| (t.into(), id)).collect();
        let id_to_tokens = token_to_ids.iter().map(|(t, &id)| (id, t.clone())).collect();

        Self {
            token_to_ids,
            id_to_tokens,
        }
    }

    /// Parse a vocabulary from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let file: VocabFile = serde_json::from_str(json)?;

        match (file.token_to_ids, file.id_to_tokens) {
            (Some(token_to_ids), Some(id_to_tokens)) => Ok(Self {
                token_to_ids,
                id_to_tokens,
            }),
            (Some(token_to_ids), None) => Ok(Self::from_pairs(token_to_ids)),
            (None, Some(id_to_tokens)) => Ok(Self::from_pairs(
                id_to_tokens.into_iter().map(|(id, t)| (t, id)),
            )),
            (None, None) => Err(Error::data(
                "vocabulary has neither 'token_to_ids' nor 'id_to_tokens'",
            )),
        }
    }

    /// Load a vocabulary file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::data(format!("Failed to read vocabulary {}: {}", path.display(), e))
        })?;

        let vocab = Self::from_json(&contents)?;
        info!("Loaded vocabulary with {} addresses from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Serialize both directions to JSON
    pub fn to_json(&self) -> Result<String> {
        let file = VocabFile {
            token_to_ids: Some(self.token_to_ids.clone()),
            id_to_tokens: Some(self.id_to_tokens.clone()),
        };
        Ok(serde_json::to_string(&file)?)
    }

    /// Address string of a token id
    pub fn token(&self, id: AddressId) -> Option<&str> {
        self.id_to_tokens.get(&id).map(String::as_str)
    }

    /// Token id of an address string
    pub fn id(&self, token: &str) -> Option<AddressId> {
        self.token_to_ids.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.id_to_tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_token_to_ids() {
        let vocab = Vocab::from_json(r#"{"token_to_ids": {"0xabc": 5, "0xdef": 6}}"#).unwrap();

        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.token(5), Some("0xabc"));
        assert_eq!(vocab.id("0xdef"), Some(6));
        assert_eq!(vocab.token(7), None);
    }

    #[test]
    fn test_from_id_to_tokens() {
        let vocab = Vocab::from_json(r#"{"id_to_tokens": {"1": "0x01", "2": "0x02"}}"#).unwrap();

        assert_eq!(vocab.token(2), Some("0x02"));
        assert_eq!(vocab.id("0x01"), Some(1));
    }

    #[test]
    fn test_empty_vocab_file_rejected() {
        assert!(matches!(Vocab::from_json("{}"), Err(Error::Data(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let vocab = Vocab::from_pairs([("0xaa", 3), ("0xbb", 4)]);
        let restored = Vocab::from_json(&vocab.to_json().unwrap()).unwrap();

        assert_eq!(restored.token(3), Some("0xaa"));
        assert_eq!(restored.id("0xbb"), Some(4));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.exp");
        std::fs::write(&path, r#"{"token_to_ids": {"0xfeed": 9}}"#).unwrap();

        let vocab = Vocab::from_file(&path).unwrap();
        assert_eq!(vocab.token(9), Some("0xfeed"));

        assert!(Vocab::from_file(dir.path().join("missing")).is_err());
    }
}
