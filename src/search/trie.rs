//! Byte trie backing the search index

use std::collections::{BTreeMap, BTreeSet};

/// One node of the prefix trie
///
/// `members` holds the sequence numbers of every key whose bytes pass
/// through this node, so a prefix query reads its answer straight off the
/// node at the end of the prefix, already in insertion order.
#[derive(Debug, Default)]
pub(crate) struct TrieNode {
    children: BTreeMap<u8, TrieNode>,
    members: BTreeSet<u64>,
}

impl TrieNode {
    /// Record `seq` on every node along `key`, creating nodes as needed
    pub(crate) fn insert(&mut self, key: &[u8], seq: u64) {
        let mut node = self;
        node.members.insert(seq);
        for byte in key {
            node = node.children.entry(*byte).or_default();
            node.members.insert(seq);
        }
    }

    /// Remove `seq` along `key`, pruning nodes left with no members
    pub(crate) fn remove(&mut self, key: &[u8], seq: u64) {
        self.members.remove(&seq);

        if let Some((first, rest)) = key.split_first() {
            if let Some(child) = self.children.get_mut(first) {
                child.remove(rest, seq);
                if child.members.is_empty() {
                    self.children.remove(first);
                }
            }
        }
    }

    /// Node reached by walking `prefix`, if any key has that prefix
    pub(crate) fn find(&self, prefix: &[u8]) -> Option<&TrieNode> {
        let mut node = self;
        for byte in prefix {
            node = node.children.get(byte)?;
        }
        Some(node)
    }

    /// Sequence numbers of keys under this node, ascending
    pub(crate) fn members(&self) -> impl Iterator<Item = &u64> {
        self.members.iter()
    }

    /// Total nodes in this subtree, including this one
    #[cfg(test)]
    pub(crate) fn node_count(&self) -> usize {
        1 + self.children.values().map(TrieNode::node_count).sum::<usize>()
    }
}
