//! Export fitted series to JSON.
//!
//! The export is the portable representation of one analyzed block:
//! - run metadata (name, block, readings, period bounds, timestamp)
//! - per series: measured points, fitted parameters, uncertainties, the FFT guess
//! - the rendering-grid curve and band for quick re-plotting (`circa show`)

use std::fs::File;
use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::domain::{MeasurementBlock, PeriodBounds, Series, SeriesCurve, SineParams};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitExport {
    pub tool: String,
    pub generated: DateTime<Local>,
    pub name: String,
    pub block: usize,
    pub readings: usize,
    pub bounds: PeriodBounds,
    /// Sampling times of the measured points (hours).
    pub sampling: Vec<f64>,
    pub series: Vec<SeriesExport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesExport {
    pub series: Series,
    pub observed: Vec<f64>,
    pub sem: Vec<f64>,
    pub params: SineParams,
    pub sigmas: SineParams,
    pub guessed_period: f64,
    pub fitted_period: f64,
    pub chi_square: f64,
    pub dof: usize,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub time_hours: Vec<f64>,
    pub value: Vec<f64>,
    pub band: Vec<f64>,
}

impl FitExport {
    pub fn new(
        name: &str,
        block: &MeasurementBlock,
        sampling: &[f64],
        bounds: PeriodBounds,
        curves: &[SeriesCurve],
    ) -> Self {
        let series = curves
            .iter()
            .map(|sc| {
                let (observed, sem) = block.series(sc.series);
                SeriesExport {
                    series: sc.series,
                    observed: observed.to_vec(),
                    sem: sem.to_vec(),
                    params: sc.curve.fit.params,
                    sigmas: sc.curve.fit.sigmas,
                    guessed_period: sc.curve.fit.guessed_period,
                    fitted_period: sc.curve.fit.fitted_period(),
                    chi_square: sc.curve.fit.chi_square,
                    dof: sc.curve.fit.dof,
                    grid: CurveGrid {
                        time_hours: sc.curve.times.clone(),
                        value: sc.curve.values.clone(),
                        band: sc.curve.band.clone(),
                    },
                }
            })
            .collect();

        Self {
            tool: "circa".to_string(),
            generated: Local::now(),
            name: name.to_string(),
            block: block.block,
            readings: sampling.len(),
            bounds,
            sampling: sampling.to_vec(),
            series,
        }
    }
}

/// Write one or more block exports as a pretty-printed JSON array.
pub fn write_fit_json(path: &Path, exports: &[FitExport]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, exports)
        .map_err(|e| AppError::io(format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}

/// Read a fit JSON file written by `write_fit_json`.
pub fn read_fit_json(path: &Path) -> Result<Vec<FitExport>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid fit JSON: {e}")))
}
