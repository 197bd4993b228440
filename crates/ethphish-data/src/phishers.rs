//! Known phishing accounts used as ground truth

use ethphish_core::{Error, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

/// Set of known phishing addresses
#[derive(Debug, Clone, Default)]
pub struct PhisherSet {
    accounts: HashSet<String>,
}

impl PhisherSet {
    /// Parse a plain-text list, one address per line.
    ///
    /// Only the first comma-separated field of a line is used; blank lines
    /// are skipped.
    pub fn parse(contents: &str) -> Self {
        let accounts = contents
            .lines()
            .filter_map(|line| line.split(',').next())
            .map(str::trim)
            .filter(|account| !account.is_empty())
            .map(str::to_string)
            .collect();

        Self { accounts }
    }

    /// Load the list from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::data(format!("Failed to read phisher list {}: {}", path.display(), e))
        })?;

        let set = Self::parse(&contents);
        info!("Loaded {} phisher accounts from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.accounts.contains(address)
    }

    /// Ground-truth label: 1.0 for a known phisher, 0.0 otherwise
    pub fn label(&self, address: &str) -> f32 {
        if self.contains(address) {
            1.0
        } else {
            0.0
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PhisherSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            accounts: iter.into_iter().map(Into::into).collect(),
        }
    }
}
