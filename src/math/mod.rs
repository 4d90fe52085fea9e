//! Mathematical utilities: least squares, the bounded nonlinear solver,
//! spectra and summary statistics.

pub mod lm;
pub mod ols;
pub mod spectrum;
pub mod stats;

pub use lm::*;
pub use ols::*;
pub use spectrum::*;
pub use stats::*;
