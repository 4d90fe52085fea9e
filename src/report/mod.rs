//! Reporting utilities: per-point residuals and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{MeasurementBlock, SeriesCurve};
use crate::error::AppError;
use crate::models::predict;

/// One measured point next to the fitted model.
#[derive(Debug, Clone, PartialEq)]
pub struct PointResidual {
    pub time: f64,
    pub observed: f64,
    pub fitted: f64,
    /// `observed - fitted`
    pub residual: f64,
    /// Residual in units of the point's SEM.
    pub normalized: f64,
}

/// Evaluate the fitted model at each sampling time of the curve's series.
pub fn compute_residuals(
    sampling: &[f64],
    block: &MeasurementBlock,
    curve: &SeriesCurve,
) -> Result<Vec<PointResidual>, AppError> {
    let (values, sem) = block.series(curve.series);
    if values.len() != sampling.len() || sem.len() != sampling.len() {
        return Err(AppError::shape(format!(
            "{} series has {} values for {} sampling times.",
            curve.series.label(),
            values.len(),
            sampling.len()
        )));
    }

    let params = &curve.curve.fit.params;
    let mut out = Vec::with_capacity(sampling.len());
    for ((&time, &observed), &e) in sampling.iter().zip(values).zip(sem) {
        let fitted = predict(params, time);
        if !fitted.is_finite() {
            return Err(AppError::numerical("Non-finite model prediction during residual computation."));
        }
        let residual = observed - fitted;
        let normalized = if e.abs() > 0.0 { residual / e.abs() } else { f64::NAN };
        out.push(PointResidual {
            time,
            observed,
            fitted,
            residual,
            normalized,
        });
    }
    Ok(out)
}
