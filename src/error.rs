// src/error.rs
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal dictionary errors. Nothing can be solved without a dictionary.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot open dictionary {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot read dictionary: {0}")]
    Read(#[from] io::Error),
    #[error("dictionary contains no valid words")]
    Empty,
}

/// Why a single dictionary record was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected `WORD FREQUENCY`, found {0} fields")]
    FieldCount(usize),
    #[error("empty word")]
    EmptyWord,
    #[error("invalid frequency `{0}`")]
    BadFrequency(String),
    #[error("invalid character {0:?} in word")]
    InvalidCharacter(char),
    #[error("duplicate word `{0}`")]
    Duplicate(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("no key pairs found")]
    Empty,
    #[error("malformed key segment `{0}`")]
    Syntax(String),
    #[error("key segment `{0}` has sides of different length")]
    LengthMismatch(String),
    #[error("conflicting key: {cipher} cannot decode to {plain}")]
    Conflict { cipher: char, plain: char },
}

/// Errors reading or writing the compiled dictionary cache.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Tempfile(#[from] tempfile::PersistError),
    #[error("cache encoding failed: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("cache version {found} does not match expected {expected}")]
    Version { found: u32, expected: u32 },
    #[error("corrupt cache entry: {0}")]
    Corrupt(#[from] RecordError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
