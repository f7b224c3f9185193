//! Command Line Interface (CLI) layer for cogcat.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) that turns command-line entries
//! into one catalog item via `cogcat::api`.
//!
//! If you are embedding cogcat into another application, prefer using
//! the high-level `cogcat::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
