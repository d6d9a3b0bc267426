// --- File: src/core/trie.rs
use crate::core::types::WordId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Serialize, Deserialize)]
struct PrefixNode {
    children: BTreeMap<u8, usize>,
    word_ids: Vec<WordId>,
}

impl PrefixNode {
    fn new() -> Self {
        Self { children: BTreeMap::new(), word_ids: Vec::new() }
    }
}

/// A byte-keyed trie over word keys, used for prefix suggestions.
/// Several words may share a key (e.g. two diacritizations of one bare form).
#[derive(Clone, Serialize, Deserialize)]
pub struct PrefixIndex {
    nodes: Vec<PrefixNode>,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self { nodes: vec![PrefixNode::new()] }
    }

    /// O(k) complexity where k is key length.
    pub fn insert(&mut self, key: &str, word_id: WordId) {
        let mut node_idx = 0;
        for &byte in key.as_bytes() {
            let next_idx = if let Some(&id) = self.nodes[node_idx].children.get(&byte) {
                id
            } else {
                let new_node_id = self.nodes.len();
                self.nodes.push(PrefixNode::new());
                self.nodes[node_idx].children.insert(byte, new_node_id);
                new_node_id
            };
            node_idx = next_idx;
        }
        let ids = &mut self.nodes[node_idx].word_ids;
        if !ids.contains(&word_id) {
            ids.push(word_id);
        }
    }

    /// Detaches `word_id` from `key`. Nodes are kept; they are cheap and reused.
    pub fn remove(&mut self, key: &str, word_id: WordId) {
        if let Some(node_idx) = self.find(key) {
            self.nodes[node_idx].word_ids.retain(|&id| id != word_id);
        }
    }

    /// Up to `k` ids whose key starts with `prefix`, shorter keys first within
    /// each branch (depth-first in byte order).
    pub fn with_prefix(&self, prefix: &str, k: usize) -> Vec<WordId> {
        let mut out = Vec::new();
        if k == 0 {
            return out;
        }
        if let Some(node_idx) = self.find(prefix) {
            self.dfs_collect(node_idx, k, &mut out);
        }
        out
    }

    fn find(&self, key: &str) -> Option<usize> {
        let mut node_idx = 0;
        for &byte in key.as_bytes() {
            node_idx = *self.nodes[node_idx].children.get(&byte)?;
        }
        Some(node_idx)
    }

    fn dfs_collect(&self, node_idx: usize, k: usize, out: &mut Vec<WordId>) {
        let node = &self.nodes[node_idx];
        for &id in &node.word_ids {
            if out.len() == k {
                return;
            }
            out.push(id);
        }
        for &child_idx in node.children.values() {
            if out.len() == k {
                return;
            }
            self.dfs_collect(child_idx, k, out);
        }
    }
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self::new()
    }
}
