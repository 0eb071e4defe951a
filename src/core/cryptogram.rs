// src/core/cryptogram.rs
use crate::core::keymap::KeyMap;
use crate::core::pattern::compute_pattern;
use crate::core::types::{is_word_letter, CryptogramWord, PatternId};
use std::collections::HashMap;

/// One encoded line, split into tokens.
///
/// `entries` owns every distinct token: each unique code word once, and each
/// whitespace run on its own. `tokens` lists the line in order as indices
/// into `entries`, so repeated code words share one entry.
#[derive(Debug, Clone, Default)]
pub struct CryptogramModel {
    entries: Vec<CryptogramWord>,
    tokens: Vec<usize>,
    /// Unique code words in order of first appearance.
    unique: Vec<usize>,
    total_letters: usize,
    initial_key: KeyMap,
}

impl CryptogramModel {
    /// Tokenizes a raw line. The line is upper-cased, then split into runs of
    /// word letters (A–Z, apostrophe) and runs of everything else. A `#` in
    /// the leading non-letter run marks the whole line as a comment, which
    /// yields a model with no tokens.
    pub fn parse(line: &str) -> Self {
        let line = line.to_ascii_uppercase();
        let bytes = line.as_bytes();
        let mut model = CryptogramModel::default();

        let lead = bytes.iter().position(|&c| is_word_letter(c)).unwrap_or(bytes.len());
        if bytes[..lead].contains(&b'#') {
            return model;
        }

        let mut by_letters: HashMap<&str, usize> = HashMap::new();
        let mut start = 0;
        while start < bytes.len() {
            let whitespace = !is_word_letter(bytes[start]);
            let end = bytes[start..]
                .iter()
                .position(|&c| is_word_letter(c) == whitespace)
                .map_or(bytes.len(), |n| start + n);
            // Runs split on ASCII bytes, so `start..end` sits on char boundaries.
            let text = &line[start..end];
            start = end;

            if whitespace {
                model.push_entry(text, true);
                continue;
            }

            model.total_letters += text.len();
            match by_letters.get(text) {
                Some(&idx) => {
                    model.entries[idx].occurrences += 1;
                    model.tokens.push(idx);
                }
                None => {
                    let idx = model.push_entry(text, false);
                    model.unique.push(idx);
                    by_letters.insert(text, idx);
                }
            }
        }
        model
    }

    fn push_entry(&mut self, text: &str, is_whitespace: bool) -> usize {
        let pattern = if is_whitespace {
            PatternId::EMPTY
        } else {
            compute_pattern(text.as_bytes())
        };
        self.entries.push(CryptogramWord {
            letters: text.to_string(),
            pattern,
            is_whitespace,
            occurrences: 1,
        });
        let idx = self.entries.len() - 1;
        self.tokens.push(idx);
        idx
    }

    /// Starting key applied before solving (e.g. a user-supplied partial key).
    pub fn with_initial_key(mut self, key: KeyMap) -> Self {
        self.initial_key = key;
        self
    }

    pub fn initial_key(&self) -> KeyMap {
        self.initial_key
    }

    /// Every token of the line, in order, repeats included.
    pub fn tokens(&self) -> impl Iterator<Item = &CryptogramWord> + '_ {
        self.tokens.iter().map(move |&i| &self.entries[i])
    }

    /// Distinct code words, in order of first appearance.
    pub fn unique_words(&self) -> impl Iterator<Item = &CryptogramWord> + '_ {
        self.unique.iter().map(move |&i| &self.entries[i])
    }

    pub fn unique_count(&self) -> usize {
        self.unique.len()
    }

    /// Number of code-word tokens, repeats included.
    pub fn word_count(&self) -> usize {
        self.tokens().filter(|t| !t.is_whitespace).count()
    }

    /// Letters over all code-word tokens, repeats included.
    pub fn total_letters(&self) -> usize {
        self.total_letters
    }

    /// No code words: an empty line, a comment or only punctuation.
    pub fn is_empty(&self) -> bool {
        self.unique.is_empty()
    }

    /// The upper-cased line, rebuilt from its tokens.
    pub fn text(&self) -> String {
        self.tokens().map(|t| t.letters.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_rebuild_the_line() {
        let model = CryptogramModel::parse("Xzyya, qxz'a -- xzyya!");
        assert_eq!(model.text(), "XZYYA, QXZ'A -- XZYYA!");
        let kinds: Vec<bool> = model.tokens().map(|t| t.is_whitespace).collect();
        assert_eq!(kinds, [false, true, false, true, false, true]);
    }

    #[test]
    fn repeated_code_words_share_one_entry() {
        let model = CryptogramModel::parse("ABC DEF ABC");
        assert_eq!(model.unique_count(), 2);
        let first = model.unique_words().next().unwrap();
        assert_eq!(first.letters, "ABC");
        assert_eq!(first.occurrences, 2);
        assert_eq!(model.word_count(), 3);
        assert_eq!(model.total_letters(), 9);
    }

    #[test]
    fn leading_hash_is_a_comment() {
        assert!(CryptogramModel::parse("  # ABC DEF").is_empty());
        assert_eq!(CryptogramModel::parse("  # ABC DEF").tokens().count(), 0);
        // A hash after the first word is just punctuation.
        let model = CryptogramModel::parse("ABC #1");
        assert_eq!(model.unique_count(), 1);
        assert_eq!(model.text(), "ABC #1");
    }

    #[test]
    fn punctuation_only_lines_have_no_words() {
        let model = CryptogramModel::parse(" ... !? ");
        assert!(model.is_empty());
        assert_eq!(model.text(), " ... !? ");
        assert!(CryptogramModel::parse("").is_empty());
    }

    #[test]
    fn code_words_carry_their_pattern() {
        let model = CryptogramModel::parse("XZYYA");
        let word = model.unique_words().next().unwrap();
        assert_eq!(word.pattern, compute_pattern(b"HELLO"));
        assert_eq!(model.initial_key(), KeyMap::new());
    }
}
