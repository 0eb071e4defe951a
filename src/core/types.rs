// src/core/types.rs
use serde::{Deserialize, Serialize};

/// Identifier of a word's repeated-letter shape, e.g. "QUEEN" → 1.2.3.3.4.
/// Ids come from the process-wide table in `core::pattern`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternId(pub u32);

impl PatternId {
    /// Shape of the empty word.
    pub const EMPTY: PatternId = PatternId(0);
}

/// Placeholder printed for a cipher letter that has no plaintext yet.
pub const UNMAPPED: u8 = b'_';

/// Letters that may appear inside a word: A–Z and the apostrophe.
pub fn is_word_letter(c: u8) -> bool {
    c.is_ascii_uppercase() || c == b'\''
}

/// One entry of the frequency dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryWord {
    pub letters: String,
    pub pattern: PatternId,
    /// Usage count from the frequency list.
    pub frequency: u64,
}

/// A token of an encoded line. Letter runs are code words, everything else
/// is kept as a whitespace token so the line can be rebuilt verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptogramWord {
    pub letters: String,
    pub pattern: PatternId,
    pub is_whitespace: bool,
    /// How many times this code word occurs in the line.
    pub occurrences: usize,
}

impl CryptogramWord {
    pub fn bytes(&self) -> &[u8] {
        self.letters.as_bytes()
    }
}
