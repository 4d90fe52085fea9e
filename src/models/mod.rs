//! Sinusoid model evaluation.
//!
//! Models are implemented as small, pure functions so that fitting and
//! propagation code can stay generic over parameter vectors.

pub mod sine;

pub use sine::*;
