// File: src/persistence.rs
use crate::core::index::{WordIndex, WordIndexBuilder};
use crate::error::PersistError;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const CACHE_VERSION: u32 = 1;

/// On-disk form of a `WordIndex`.
/// Pattern ids only live as long as the process, so the snapshot keeps the
/// words and frequencies in candidate order and patterns are recomputed on
/// load.
#[derive(serde::Serialize, serde::Deserialize)]
struct IndexSnapshot {
    version: u32,
    entries: Vec<(String, u64)>,
}

/// Writes the index atomically: a temp file in the target directory is
/// renamed over `path` once complete.
pub fn save_index(index: &WordIndex, path: &Path) -> Result<(), PersistError> {
    let parent_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;

    let snapshot = IndexSnapshot {
        version: CACHE_VERSION,
        entries: index.iter().map(|w| (w.letters.clone(), w.frequency)).collect(),
    };

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, &snapshot)?;
        writer.flush()?;
    }
    temp_file.persist(path)?;
    Ok(())
}

pub fn load_index(path: &Path) -> Result<WordIndex, PersistError> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot: IndexSnapshot = bincode::deserialize_from(reader)?;
    if snapshot.version != CACHE_VERSION {
        return Err(PersistError::Version {
            found: snapshot.version,
            expected: CACHE_VERSION,
        });
    }

    let mut builder = WordIndexBuilder::new();
    for (word, frequency) in &snapshot.entries {
        builder.insert(word, *frequency)?;
    }
    Ok(builder.finish())
}

/// A cache is usable when it exists and is not older than its source.
pub fn cache_is_fresh(cache: &Path, source: &Path) -> bool {
    let modified = |p: &Path| fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(cache), modified(source)) {
        (Some(cache), Some(source)) => cache >= source,
        _ => false,
    }
}
