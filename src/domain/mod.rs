//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - sampling grids (`TimeGrid`) and period bounds (`PeriodBounds`)
//! - measurement blocks read from a sheet (`MeasurementBlock`)
//! - fit outputs (`SineFit`, `FittedCurve`, `SeriesCurve`)
//! - analyzer, plot and run configuration

pub mod types;

pub use types::*;
