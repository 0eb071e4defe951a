// src/config.rs
use crate::core::cancel::CancelToken;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Search and ranking settings. Every field has a default, so a config file
/// only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Code words a solution may leave without a dictionary match.
    pub max_unsolved: usize,
    /// Let a cipher letter decode to itself.
    pub allow_self_mapping: bool,
    /// Also report branches abandoned for exceeding `max_unsolved`.
    pub evaluate_partials: bool,
    /// Concurrent branch tasks; 0 uses the hardware parallelism.
    pub parallelism: usize,
    /// Solutions kept per cryptogram.
    pub top_n: usize,
    /// Stop a search after this many accepted solutions.
    pub max_solutions: Option<usize>,
    /// Wall-clock limit per cryptogram.
    pub timeout_secs: Option<u64>,
}

impl SolverConfig {
    pub const DEFAULT_MAX_UNSOLVED: usize = 0;
    pub const DEFAULT_TOP_N: usize = 3;

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Number of branch tasks that may run concurrently.
    pub fn admission_slots(&self) -> usize {
        if self.parallelism > 0 {
            return self.parallelism;
        }
        thread::available_parallelism().map_or(1, NonZeroUsize::get)
    }

    /// Fresh token for one cryptogram, carrying the configured deadline.
    pub fn cancel_token(&self) -> CancelToken {
        match self.timeout_secs {
            Some(secs) => CancelToken::with_timeout(Duration::from_secs(secs)),
            None => CancelToken::new(),
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_unsolved: Self::DEFAULT_MAX_UNSOLVED,
            allow_self_mapping: false,
            evaluate_partials: false,
            parallelism: 0,
            top_n: Self::DEFAULT_TOP_N,
            max_solutions: None,
            timeout_secs: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = SolverConfig::from_json(r#"{ "max_unsolved": 2, "top_n": 5 }"#).unwrap();
        assert_eq!(config.max_unsolved, 2);
        assert_eq!(config.top_n, 5);
        assert!(!config.allow_self_mapping);
        assert_eq!(config.max_solutions, None);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(SolverConfig::from_json("{ top_n: }"), Err(ConfigError::Json(_))));
    }

    #[test]
    fn explicit_parallelism_wins() {
        let config = SolverConfig { parallelism: 3, ..SolverConfig::default() };
        assert_eq!(config.admission_slots(), 3);
        assert!(SolverConfig::default().admission_slots() >= 1);
    }

    #[test]
    fn timeout_becomes_a_deadline() {
        let config = SolverConfig { timeout_secs: Some(0), ..SolverConfig::default() };
        assert!(config.cancel_token().is_cancelled());
        assert!(!SolverConfig::default().cancel_token().is_cancelled());
    }
}
