//! Rendering: SVG charts written to disk (`chart`) and a terminal preview (`ascii`).

pub mod ascii;
pub mod chart;

pub use ascii::*;
pub use chart::*;
