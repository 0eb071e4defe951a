// src/core/solution.rs
use crate::core::cryptogram::CryptogramModel;
use crate::core::index::WordIndex;
use crate::core::keymap::KeyMap;
use crate::core::types::{CryptogramWord, DictionaryWord};
use serde::Serialize;

/// Quality signals of a solution, both on a 0–100 scale. Only `word` is
/// used for ranking.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Score {
    /// How close the plaintext letters come to the most frequent letter.
    pub letter: f64,
    /// Average of `frequency / best frequency for the same pattern` per word.
    pub word: f64,
}

/// A token of the line after decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    pub text: String,
    pub is_whitespace: bool,
}

/// A (possibly partial) key found by the search plus the number of code
/// words it left without a dictionary match.
///
/// Decoding and scoring are computed on first request and cached.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    key: KeyMap,
    unsolved: usize,
    decoded: Option<Vec<DecodedToken>>,
    score: Option<Score>,
}

impl Solution {
    pub fn new(key: KeyMap) -> Self {
        Self { key, ..Self::default() }
    }

    pub fn key(&self) -> &KeyMap {
        &self.key
    }

    pub fn unsolved(&self) -> usize {
        self.unsolved
    }

    pub(crate) fn charge_unsolved(&mut self) -> usize {
        self.unsolved += 1;
        self.unsolved
    }

    /// Extends the key so that `code` decodes to `candidate`. On failure,
    /// and always for the unknown-word candidate `None`, the key is left as
    /// it was and `false` is returned.
    pub fn try_word(
        &mut self,
        code: &CryptogramWord,
        candidate: Option<&DictionaryWord>,
        allow_self_mapping: bool,
    ) -> bool {
        let extended = candidate
            .and_then(|word| self.key.try_word(code.bytes(), word.letters.as_bytes(), allow_self_mapping));
        match extended {
            Some(key) => {
                self.key = key;
                true
            }
            None => false,
        }
    }

    /// Decodes every token of `model`; unknown letters become `_`.
    pub fn decode(&mut self, model: &CryptogramModel) -> &[DecodedToken] {
        let key = self.key;
        self.decoded.get_or_insert_with(|| {
            model
                .tokens()
                .map(|token| DecodedToken {
                    text: if token.is_whitespace {
                        token.letters.clone()
                    } else {
                        key.decode_partial(token.bytes())
                    },
                    is_whitespace: token.is_whitespace,
                })
                .collect()
        })
    }

    /// The decoded line, or `None` before `decode`/`score` ran.
    pub fn decoded_text(&self) -> Option<String> {
        self.decoded
            .as_ref()
            .map(|tokens| tokens.iter().map(|t| t.text.as_str()).collect())
    }

    pub fn score(&mut self, model: &CryptogramModel, index: &WordIndex) -> Score {
        if let Some(score) = self.score {
            return score;
        }

        let mut word = 0.0;
        let mut letter = 0.0;
        for token in self.decode(model).iter().filter(|t| !t.is_whitespace) {
            if let Some(entry) = index.find(&token.text) {
                let best = index.max_frequency(entry.pattern);
                if best > 0 {
                    word += entry.frequency as f64 / best as f64;
                }
            }
            letter += token.text.bytes().map(|c| index.letter_pct(c)).sum::<f64>();
        }

        let letters = model.total_letters() as f64;
        let words = model.word_count() as f64;
        let score = Score {
            letter: if letters > 0.0 && index.max_letter_pct() > 0.0 {
                letter / letters / index.max_letter_pct() * 100.0
            } else {
                0.0
            },
            word: if words > 0.0 { word / words * 100.0 } else { 0.0 },
        };
        self.score = Some(score);
        score
    }

    /// Cached score, if `score` ran.
    pub fn scores(&self) -> Option<Score> {
        self.score
    }
}
