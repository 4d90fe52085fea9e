//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - seed sinusoid parameters from the data spectrum (`fitter`)
//! - run the bounded weighted fit and derive parameter uncertainties (`fitter`)
//! - evaluate the fitted curve and its propagated band (`propagate`)

pub mod fitter;
pub mod propagate;

pub use fitter::*;
pub use propagate::*;
