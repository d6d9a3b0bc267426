// src/core/mod.rs
pub mod analyzer;
pub mod engine;
pub mod orthography;
pub mod script;
pub mod trie;
pub mod types;
