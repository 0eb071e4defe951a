// --- File: src/core/index.rs
use crate::core::pattern::compute_pattern;
use crate::core::types::{is_word_letter, DictionaryWord, PatternId};
use crate::error::RecordError;
use std::collections::HashMap;

const LETTERS: usize = 26;

// --- WordIndexBuilder: collects words while the dictionary is being read ---

/// Accumulates dictionary words. `finish` sorts every pattern bucket once and
/// freezes the result into a read-only `WordIndex`.
#[derive(Default)]
pub struct WordIndexBuilder {
    words: HashMap<String, DictionaryWord>,
    buckets: HashMap<PatternId, Vec<DictionaryWord>>,
    letter_freq: [u64; LETTERS],
    total_letters: u64,
}

impl WordIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores one word. The word is upper-cased first.
    /// A word already present keeps its first frequency.
    pub fn insert(&mut self, word: &str, frequency: u64) -> Result<(), RecordError> {
        let letters = word.to_ascii_uppercase();
        if letters.is_empty() {
            return Err(RecordError::EmptyWord);
        }
        if let Some(bad) = letters.bytes().find(|&c| !is_word_letter(c)) {
            return Err(RecordError::InvalidCharacter(bad as char));
        }
        if self.words.contains_key(&letters) {
            return Err(RecordError::Duplicate(letters));
        }

        for c in letters.bytes() {
            if let Some(slot) = letter_slot(c) {
                self.letter_freq[slot] += frequency;
            }
        }
        self.total_letters += letters.len() as u64 * frequency;

        let entry = DictionaryWord {
            pattern: compute_pattern(letters.as_bytes()),
            letters: letters.clone(),
            frequency,
        };
        self.buckets.entry(entry.pattern).or_default().push(entry.clone());
        self.words.insert(letters, entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn finish(mut self) -> WordIndex {
        // Stable: equal frequencies keep load order.
        for bucket in self.buckets.values_mut() {
            bucket.sort_by(|a, b| b.frequency.cmp(&a.frequency));
        }

        let mut letter_pct = [0.0; LETTERS];
        if self.total_letters > 0 {
            for (pct, &freq) in letter_pct.iter_mut().zip(self.letter_freq.iter()) {
                *pct = freq as f64 / self.total_letters as f64;
            }
        }
        let max_letter_pct = letter_pct.iter().copied().fold(0.0, f64::max);

        WordIndex {
            words: self.words,
            buckets: self.buckets,
            letter_freq: self.letter_freq,
            letter_pct,
            max_letter_pct,
        }
    }
}

// --- WordIndex: the frozen dictionary shared by every search branch ---

/// Read-only dictionary: exact lookup, pattern buckets sorted by descending
/// frequency, and letter statistics weighted by word frequency.
#[derive(Debug, Clone)]
pub struct WordIndex {
    words: HashMap<String, DictionaryWord>,
    buckets: HashMap<PatternId, Vec<DictionaryWord>>,
    letter_freq: [u64; LETTERS],
    letter_pct: [f64; LETTERS],
    max_letter_pct: f64,
}

impl WordIndex {
    /// Builds an index from `(word, frequency)` pairs, dropping invalid ones.
    pub fn from_pairs<'w, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'w str, u64)>,
    {
        let mut builder = WordIndexBuilder::new();
        for (word, frequency) in pairs {
            let _ = builder.insert(word, frequency);
        }
        builder.finish()
    }

    pub fn find(&self, letters: &str) -> Option<&DictionaryWord> {
        self.words.get(letters)
    }

    pub fn contains(&self, letters: &str) -> bool {
        self.words.contains_key(letters)
    }

    /// Candidates for a pattern, most frequent first.
    pub fn for_pattern(&self, pattern: PatternId) -> &[DictionaryWord] {
        self.buckets.get(&pattern).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn candidate_count(&self, pattern: PatternId) -> usize {
        self.for_pattern(pattern).len()
    }

    /// Highest frequency among the words sharing `pattern`.
    pub fn max_frequency(&self, pattern: PatternId) -> u64 {
        self.for_pattern(pattern).first().map_or(0, |w| w.frequency)
    }

    /// Share of all dictionary letters (weighted by frequency) that are `c`.
    pub fn letter_pct(&self, c: u8) -> f64 {
        letter_slot(c).map_or(0.0, |slot| self.letter_pct[slot])
    }

    pub fn max_letter_pct(&self) -> f64 {
        self.max_letter_pct
    }

    /// Letters A–Z with their weighted count and share, most common first.
    pub fn letter_table(&self) -> Vec<(char, u64, f64)> {
        let mut table: Vec<(char, u64, f64)> = (0..LETTERS)
            .map(|i| ((b'A' + i as u8) as char, self.letter_freq[i], self.letter_pct[i]))
            .collect();
        table.sort_by(|a, b| b.2.total_cmp(&a.2));
        table
    }

    /// Every word, bucket by bucket in candidate order.
    pub fn iter(&self) -> impl Iterator<Item = &DictionaryWord> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

fn letter_slot(c: u8) -> Option<usize> {
    c.is_ascii_uppercase().then(|| (c - b'A') as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WordIndex {
        WordIndex::from_pairs([("the", 1000), ("cat", 300), ("hat", 200), ("queen", 50), ("it's", 80)])
    }

    #[test]
    fn buckets_are_sorted_by_descending_frequency() {
        let index = sample();
        let pattern = compute_pattern(b"ABC");
        let letters: Vec<&str> = index.for_pattern(pattern).iter().map(|w| w.letters.as_str()).collect();
        assert_eq!(letters, ["THE", "CAT", "HAT"]);
        assert_eq!(index.max_frequency(pattern), 1000);
        assert_eq!(index.candidate_count(compute_pattern(b"QUEEN")), 1);
        assert!(index.for_pattern(compute_pattern(b"ABABAB")).is_empty());
    }

    #[test]
    fn words_are_upper_cased_and_validated() {
        let mut builder = WordIndexBuilder::new();
        assert!(builder.insert("hello", 3).is_ok());
        assert_eq!(builder.insert("HELLO", 9), Err(RecordError::Duplicate("HELLO".into())));
        assert_eq!(builder.insert("he11o", 1), Err(RecordError::InvalidCharacter('1')));
        let index = builder.finish();
        assert_eq!(index.find("HELLO").map(|w| w.frequency), Some(3));
        assert!(!index.contains("hello"));
    }

    #[test]
    fn letter_percentages_are_weighted_by_frequency() {
        let index = WordIndex::from_pairs([("AB", 3), ("A", 2)]);
        // 8 letters in total: A = 5, B = 3
        assert!((index.letter_pct(b'A') - 5.0 / 8.0).abs() < 1e-12);
        assert!((index.letter_pct(b'B') - 3.0 / 8.0).abs() < 1e-12);
        assert_eq!(index.letter_pct(b'\''), 0.0);
        assert!((index.max_letter_pct() - 5.0 / 8.0).abs() < 1e-12);
        assert_eq!(index.letter_table()[0].0, 'A');
    }

    #[test]
    fn apostrophe_words_are_indexed() {
        let index = sample();
        assert!(index.contains("IT'S"));
        assert_eq!(index.len(), 5);
    }
}
