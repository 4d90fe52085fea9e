//! Data sources beyond user sheets: synthetic circadian samples.

pub mod sample;

pub use sample::*;
