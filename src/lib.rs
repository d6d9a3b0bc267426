// src/lib.rs
//! Rhyme search for Persian words.
//!
//! Words are spelled out into syllables and phonemes, memoized in a word
//! store, and matched against each other on their trailing phonemes. Word
//! lists arrive as uploaded CSV batches.

pub mod config;
pub mod core;
pub mod error;
pub mod ingest;
pub mod persistence;
pub mod resolver;
pub mod rhyme;
pub mod store;

pub use crate::config::EngineConfig;
pub use crate::core::analyzer::{Analysis, PhonemeAnalyzer};
pub use crate::core::engine::RhymeEngine;
pub use crate::core::orthography::OrthographyNormalizer;
pub use crate::core::types::{
    Batch, BatchId, BatchRecord, BatchStatus, OrthographyHints, RecordStatus, WordEntry, WordId,
};
pub use crate::error::{EngineError, Result};
pub use crate::rhyme::{RhymeMatch, RhymePage, RhymeQuery, Span};
