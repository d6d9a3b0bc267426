//! Batch ingestion: uploaded rows in, word entries out.

pub mod csv;
pub mod pipeline;

pub use csv::{read_records, ParsedFile};
pub use pipeline::{IngestPipeline, IngestReport};
