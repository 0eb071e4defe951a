// src/core/ranking.rs
use crate::core::cryptogram::CryptogramModel;
use crate::core::index::WordIndex;
use crate::core::solution::Solution;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// The best `capacity` distinct solutions of one cryptogram, highest word
/// score first.
pub struct SolutionSet {
    capacity: usize,
    solutions: Vec<Solution>,
    /// Key rows already offered, accepted or not.
    seen: HashSet<String>,
    model: Arc<CryptogramModel>,
    index: Arc<WordIndex>,
}

/// One displayable row of a `SolutionSet`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSolution {
    pub rank: usize,
    pub key_row: String,
    pub key: String,
    pub text: String,
    pub word_score: f64,
    pub letter_score: f64,
    pub unsolved: usize,
}

fn word_score(solution: &Solution) -> f64 {
    solution.scores().map_or(0.0, |s| s.word)
}

impl SolutionSet {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize, model: Arc<CryptogramModel>, index: Arc<WordIndex>) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            solutions: Vec::with_capacity(capacity + 1),
            seen: HashSet::new(),
            model,
            index,
        }
    }

    /// Scores and inserts `solution`. Returns `false` for a key already seen,
    /// or when the set is full and the word score does not beat the worst
    /// kept solution; ties never displace.
    pub fn add(&mut self, mut solution: Solution) -> bool {
        if !self.seen.insert(solution.key().key_row()) {
            return false;
        }
        let score = solution.score(&self.model, &self.index);

        if self.solutions.len() >= self.capacity {
            if let Some(worst) = self.solutions.last() {
                if score.word <= word_score(worst) {
                    return false;
                }
            }
        }

        self.solutions.push(solution);
        self.solutions.sort_by(|a, b| word_score(b).total_cmp(&word_score(a)));
        self.solutions.truncate(self.capacity);
        true
    }

    /// Kept solutions, best first.
    pub fn top(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn model(&self) -> &CryptogramModel {
        &self.model
    }

    pub fn reports(&self) -> Vec<RankedSolution> {
        self.solutions
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let score = s.scores().unwrap_or_default();
                RankedSolution {
                    rank: i + 1,
                    key_row: s.key().key_row(),
                    key: s.key().to_string(),
                    text: s.decoded_text().unwrap_or_default(),
                    word_score: score.word,
                    letter_score: score.letter,
                    unsolved: s.unsolved(),
                }
            })
            .collect()
    }
}
