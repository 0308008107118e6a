//! Child counts per parent, computed client-side.
//!
//! Counting children with one query per parent does not scale once there
//! are thousands of parents. Instead the whole child listing is fetched once
//! and folded into an [`AggregateIndex`], which is then joined against the
//! parent listing.

use std::collections::HashMap;

/// What to do when a parent has no entry in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissDefault {
    /// Report the parent with a count of zero.
    Zero,
    /// Report nothing for the parent.
    Omit,
}

/// Number of children per parent key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateIndex {
    counts: HashMap<String, u64>,
}

impl AggregateIndex {
    /// Build the index from a complete child listing. Every child is counted
    /// exactly once, under the key `key_fn` extracts from it.
    pub fn build<'a, T, F>(children: impl IntoIterator<Item = &'a T>, key_fn: F) -> Self
    where
        T: 'a,
        F: Fn(&T) -> &str,
    {
        let mut counts = HashMap::new();
        for child in children {
            *counts.entry(key_fn(child).to_owned()).or_insert(0) += 1;
        }
        Self { counts }
    }

    /// Children counted under `key`; zero when there are none.
    pub fn count(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Count for `key`, applying `miss` when the key was never seen.
    pub fn lookup(&self, key: &str, miss: MissDefault) -> Option<u64> {
        match (self.counts.get(key), miss) {
            (Some(count), _) => Some(*count),
            (None, MissDefault::Zero) => Some(0),
            (None, MissDefault::Omit) => None,
        }
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts, i.e. the number of children indexed.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}
