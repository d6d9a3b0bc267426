// File: src/persistence.rs
use crate::error::{EngineError, Result};
use crate::store::memory::{BatchTable, WordTable};
use crate::store::{MemoryBatchStore, MemoryWordStore};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

const SNAPSHOT_VERSION: u32 = 1;

/// Everything the in-memory stores hold.
#[derive(serde::Serialize, serde::Deserialize)]
struct Snapshot {
    version: u32,
    words: WordTable,
    batches: BatchTable,
}

/// Writes both stores to `path` atomically: the snapshot is written to a
/// temporary file beside it and renamed over the target.
pub fn save_to_disk(words: &MemoryWordStore, batches: &MemoryBatchStore, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        words: words.snapshot(),
        batches: batches.snapshot(),
    };

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, &snapshot)
            .map_err(|e| EngineError::Snapshot(e.to_string()))?;
        writer.flush()?;
    }
    temp_file
        .persist(path)
        .map_err(|e| EngineError::Io(e.error))?;
    debug!(path = %path.display(), "snapshot saved");
    Ok(())
}

pub fn load_from_disk(path: &Path) -> Result<(MemoryWordStore, MemoryBatchStore)> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: Snapshot =
        bincode::deserialize_from(reader).map_err(|e| EngineError::Snapshot(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(EngineError::Snapshot(format!(
            "unsupported snapshot version {}",
            snapshot.version
        )));
    }
    Ok((
        MemoryWordStore::from_table(snapshot.words),
        MemoryBatchStore::from_table(snapshot.batches),
    ))
}
