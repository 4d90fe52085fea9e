//! Input/output helpers.
//!
//! - CSV ingest + block slicing (`ingest`)
//! - fit result export (JSON) (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
