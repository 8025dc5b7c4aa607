//! lintrun core library.
//!
//! This crate drives an analyzer over an ordered list of inputs, one input at
//! a time, reports the warnings each input produces, and folds them into a
//! single run outcome that decides the process exit status.
//!
//! High-level modules:
//! - `cli`: CLI argument parsing (binary uses this).
//! - `config`: Discovery and effective configuration resolution.
//! - `policy`: Policy file loading and requirement compilation.
//! - `root`: Base-path normalization.
//! - `runner`: Sequential run orchestration.
//! - `reporter`: Human/JSON printers for warnings and the summary.
//! - `guard`: Supervision of panics and detached analyzer work.
//! - `analyzer`: Analyzer trait and the bundled source analyzer.
//! - `models`: Warning, run configuration, outcome and policy document types.
//! - `error`: Error categories.
//! - `utils`: Supporting helpers.
pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod policy;
pub mod reporter;
pub mod root;
pub mod runner;
pub mod utils;
