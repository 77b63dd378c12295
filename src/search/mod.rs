//! Search Index Module
//!
//! Optional prefix index over the keys of a store.
//!
//! ## Responsibilities
//! - Answer "every key starting with this term" in O(prefix + matches)
//! - Return matches in first-insertion order, not lexicographic order
//! - Stay in step with the key directory on set/delete/clear/compact
//!
//! The index holds keys only. Values, and the decision whether a matched key
//! has expired, come from the engine at query time.

mod trie;

use std::collections::HashMap;

use trie::TrieNode;

/// Prefix index keyed by the sequence numbers the key directory assigns
#[derive(Debug, Default)]
pub struct SearchIndex {
    root: TrieNode,
    /// key -> sequence number
    seqs: HashMap<Vec<u8>, u64>,
    /// sequence number -> key
    keys: HashMap<u64, Vec<u8>>,
}

impl SearchIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a key at position `seq`
    ///
    /// Re-inserting a key already present is a no-op and keeps its original
    /// position. Returns true if the key was added.
    pub fn insert(&mut self, key: &[u8], seq: u64) -> bool {
        if self.seqs.contains_key(key) {
            return false;
        }

        self.root.insert(key, seq);
        self.seqs.insert(key.to_vec(), seq);
        self.keys.insert(seq, key.to_vec());
        true
    }

    /// Remove a key. Returns true if it was present.
    pub fn remove(&mut self, key: &[u8]) -> bool {
        match self.seqs.remove(key) {
            Some(seq) => {
                self.keys.remove(&seq);
                self.root.remove(key, seq);
                true
            }
            None => false,
        }
    }

    /// Keys starting with `term`, in insertion order
    ///
    /// An empty term matches every key.
    pub fn prefix_query<'a>(&'a self, term: &[u8]) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.root
            .find(term)
            .into_iter()
            .flat_map(|node| node.members())
            .filter_map(move |seq| self.keys.get(seq).map(Vec::as_slice))
    }

    /// True if the key is indexed
    pub fn contains(&self, key: &[u8]) -> bool {
        self.seqs.contains_key(key)
    }

    /// Number of indexed keys
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    /// True if nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Drop every key
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
