// src/lib.rs

pub mod config;
pub mod core;
pub mod dictionary;
pub mod error;
pub mod persistence;

pub use crate::config::SolverConfig;
pub use crate::core::cancel::CancelToken;
pub use crate::core::cryptogram::CryptogramModel;
pub use crate::core::engine::{RankOutcome, SearchHandle, SearchReport, Solver};
pub use crate::core::index::{WordIndex, WordIndexBuilder};
pub use crate::core::keymap::KeyMap;
pub use crate::core::ranking::{RankedSolution, SolutionSet};
pub use crate::core::solution::{Score, Solution};
pub use crate::dictionary::{load_dictionary, LoadReport};
