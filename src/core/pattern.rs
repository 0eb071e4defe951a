// src/core/pattern.rs
use crate::core::types::PatternId;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Append-only table from canonical shape key ("1.2.3.3.4") to pattern id.
#[derive(Debug, Default)]
pub struct PatternTable {
    ids: RwLock<HashMap<String, PatternId>>,
}

static PATTERNS: Lazy<PatternTable> = Lazy::new(PatternTable::new);

/// Pattern id of `letters` in the process-wide table.
pub fn compute_pattern(letters: &[u8]) -> PatternId {
    PATTERNS.intern(letters)
}

/// Clears the process-wide table. Ids handed out before the call become
/// meaningless, so only use this between independent runs.
pub fn reset_pattern_table() {
    PATTERNS.reset();
}

/// Number each first-seen character 1, 2, 3… and reuse the number for
/// repeats. MISSISSIPPI → 1.2.3.3.2.3.3.2.4.4.2
pub fn shape_key(letters: &[u8]) -> String {
    let mut seen: Vec<u8> = Vec::with_capacity(letters.len());
    let mut key = String::with_capacity(letters.len() * 3);
    for &c in letters {
        let c = c.to_ascii_uppercase();
        let n = match seen.iter().position(|&s| s == c) {
            Some(i) => i + 1,
            None => {
                seen.push(c);
                seen.len()
            }
        };
        if !key.is_empty() {
            key.push('.');
        }
        key.push_str(&n.to_string());
    }
    key
}

impl PatternTable {
    pub fn new() -> Self {
        Self { ids: RwLock::new(HashMap::new()) }
    }

    /// Looks up the id for the shape of `letters`, allocating the next id on
    /// first sight. Ids start at 1; the empty word is always `PatternId::EMPTY`.
    pub fn intern(&self, letters: &[u8]) -> PatternId {
        if letters.is_empty() {
            return PatternId::EMPTY;
        }
        let key = shape_key(letters);

        if let Some(&id) = self.ids.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            return id;
        }

        // Another writer may have inserted the key between the two locks.
        let mut ids = self.ids.write().unwrap_or_else(PoisonError::into_inner);
        let next = PatternId(ids.len() as u32 + 1);
        *ids.entry(key).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&self) {
        self.ids.write().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_key_numbers_letters_by_first_appearance() {
        assert_eq!(shape_key(b"QUEEN"), "1.2.3.3.4");
        assert_eq!(shape_key(b"MISSISSIPPI"), "1.2.3.3.2.3.3.2.4.4.2");
        assert_eq!(shape_key(b"queen"), shape_key(b"QUEEN"));
    }

    #[test]
    fn only_identical_repeat_structures_collide() {
        assert_eq!(compute_pattern(b"ABAB"), compute_pattern(b"CDCD"));
        assert_ne!(compute_pattern(b"ABAB"), compute_pattern(b"ABBA"));
        assert_ne!(compute_pattern(b"QUEEN"), compute_pattern(b"QUEUE"));
        assert_ne!(compute_pattern(b"QUEEN"), compute_pattern(b"TEENS"));
        assert_ne!(compute_pattern(b"QUEEN"), compute_pattern(b"ABBCD"));
        assert_eq!(compute_pattern(b"HELLO"), compute_pattern(b"XZYYA"));
        assert_ne!(compute_pattern(b"ABC"), compute_pattern(b"ABCD"));
    }

    #[test]
    fn ids_are_stable_and_reset_starts_over() {
        let table = PatternTable::new();
        let first = table.intern(b"ABC");
        let second = table.intern(b"AAB");
        assert_eq!(first, PatternId(1));
        assert_eq!(second, PatternId(2));
        assert_eq!(table.intern(b"XYZ"), first);
        assert_eq!(table.intern(b""), PatternId::EMPTY);
        assert_eq!(table.len(), 2);

        table.reset();
        assert!(table.is_empty());
        assert_eq!(table.intern(b"AAB"), PatternId(1));
    }
}
