//! Fitted curve synthesis with a first-order uncertainty band.
//!
//! The band half-width at `t` combines each parameter's contribution in quadrature:
//!
//! ```text
//! δf(t) = sqrt( Σ_k (∂f/∂θ_k(t) · σ_k)² )
//! ```
//!
//! Parameter errors are treated as independent; off-diagonal covariance terms
//! are ignored.

use crate::domain::{FittedCurve, PeriodBounds, SineParams};
use crate::error::AppError;
use crate::fit::fit_sinusoid;
use crate::models::{gradient, predict_all};

/// Band half-width at each time. Always non-negative.
pub fn propagate_band(params: &SineParams, sigmas: &SineParams, times: &[f64]) -> Vec<f64> {
    let s = sigmas.to_array();
    times
        .iter()
        .map(|&t| {
            let g = gradient(params, t);
            let sum_sq: f64 = g.iter().zip(s.iter()).map(|(d, e)| (d * e) * (d * e)).sum();
            sum_sq.sqrt()
        })
        .collect()
}

/// Fit on the sampling grid, then evaluate curve and band on the rendering grid.
pub fn fit_curve(
    sampling: &[f64],
    rendering: &[f64],
    data: &[f64],
    sigma: Option<&[f64]>,
    bounds: &PeriodBounds,
) -> Result<FittedCurve, AppError> {
    let fit = fit_sinusoid(sampling, data, sigma, bounds)?;
    let values = predict_all(&fit.params, rendering);
    let band = propagate_band(&fit.params, &fit.sigmas, rendering);

    if values.iter().chain(band.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::numerical("Fitted curve or band is not finite."));
    }

    Ok(FittedCurve {
        fit,
        times: rendering.to_vec(),
        values,
        band,
    })
}
