// src/core/mod.rs
pub mod cancel;
pub mod cryptogram;
pub mod engine;
pub mod index;
pub mod keymap;
pub mod pattern;
pub mod ranking;
pub mod solution;
pub mod types;
