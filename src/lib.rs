//! `circa-fit` library crate.
//!
//! The binary (`circa`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the analyzer can be embedded in other tools (notebook exports, batch jobs)
//! - code stays easy to navigate as the project grows

pub mod analyzer;
pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;

pub use analyzer::SineFitAnalyzer;
