// File: src/dictionary.rs
use crate::core::index::{WordIndex, WordIndexBuilder};
use crate::error::{LoadError, RecordError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::{info, warn};

/// Outcome of reading a frequency list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Splits a `WORD FREQUENCY` record. Word letters are checked when the word
/// is inserted into the index.
pub fn parse_record(line: &str) -> Result<(&str, u64), RecordError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [word, frequency] = fields[..] else {
        return Err(RecordError::FieldCount(fields.len()));
    };
    let frequency = frequency
        .parse::<u64>()
        .map_err(|_| RecordError::BadFrequency(frequency.to_string()))?;
    Ok((word, frequency))
}

/// Reads a frequency list, one `WORD FREQUENCY` record per line. Blank lines
/// are ignored; malformed records are logged and skipped. Only an I/O
/// failure or a list without a single valid word is fatal.
pub fn load_from_reader<R: BufRead>(mut reader: R, source: &str) -> Result<(WordIndex, LoadReport), LoadError> {
    let mut builder = WordIndexBuilder::new();
    let mut report = LoadReport::default();
    let mut buf = Vec::new();
    let mut line_no = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }

        match parse_record(&line).and_then(|(word, frequency)| builder.insert(word, frequency)) {
            Ok(()) => report.loaded += 1,
            Err(e) => {
                warn!("{}:{}: skipping record: {}", source, line_no, e);
                report.skipped += 1;
            }
        }
    }

    if builder.is_empty() {
        return Err(LoadError::Empty);
    }
    info!(source, loaded = report.loaded, skipped = report.skipped, "dictionary loaded");
    Ok((builder.finish(), report))
}

pub fn load_dictionary(path: &Path) -> Result<(WordIndex, LoadReport), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_reader(BufReader::new(file), &path.display().to_string())
}
