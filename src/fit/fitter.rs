//! Sinusoid parameter estimation for a single series.
//!
//! Given:
//! - sampling times `t_i` (a uniform grid)
//! - observed values `y_i`
//! - optional per-point standard errors `σ_i`
//! - a plausible period range
//!
//! we:
//! - guess the dominant frequency from the FFT of `y` and clamp its period into range
//! - seed amplitude from the spread of `y`, offset from its mean, phase at zero
//! - solve the weighted nonlinear least-squares problem with `w` bounded to the
//!   period range and `A, p, c` boxed to `±PARAM_BOUND`
//! - scale `(JᵀJ)⁻¹` by the reduced chi-square to get parameter uncertainties

use nalgebra::{DMatrix, DVector};

use crate::domain::{PeriodBounds, SineFit, SineParams};
use crate::error::AppError;
use crate::math::{LeastSquaresProblem, LmOptions, dominant_frequency, mean, minimize, std_dev, unscaled_covariance};
use crate::models::{gradient, predict};

/// Box applied to amplitude, phase and offset.
pub const PARAM_BOUND: f64 = 1e3;

/// Four parameters plus at least one residual degree of freedom.
pub const MIN_OBSERVATIONS: usize = SineParams::LEN + 1;

/// Starting point for the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineGuess {
    pub params: SineParams,
    /// Period implied by the clamped FFT frequency.
    pub period: f64,
}

/// Weighted residuals `(f(t_i) − y_i) / σ_i`.
struct WeightedSine<'a> {
    times: &'a [f64],
    data: &'a [f64],
    inv_sigma: Vec<f64>,
}

impl LeastSquaresProblem for WeightedSine<'_> {
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
        let params = params_from(x);
        DVector::from_iterator(
            self.times.len(),
            self.times
                .iter()
                .zip(self.data)
                .zip(&self.inv_sigma)
                .map(|((&t, &y), &w)| (predict(&params, t) - y) * w),
        )
    }

    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
        let params = params_from(x);
        let mut jac = DMatrix::<f64>::zeros(self.times.len(), SineParams::LEN);
        for (i, (&t, &w)) in self.times.iter().zip(&self.inv_sigma).enumerate() {
            for (k, g) in gradient(&params, t).into_iter().enumerate() {
                jac[(i, k)] = g * w;
            }
        }
        jac
    }
}

fn params_from(x: &DVector<f64>) -> SineParams {
    SineParams::new(x[0], x[1], x[2], x[3])
}

/// Seed parameters from the data spectrum and moments.
///
/// The guessed period always lies inside `bounds`.
pub fn guess_params(times: &[f64], data: &[f64], bounds: &PeriodBounds) -> Result<SineGuess, AppError> {
    validate_bounds(bounds)?;
    let step = grid_step(times)?;
    if data.len() != times.len() {
        return Err(AppError::shape(format!(
            "Data has {} values but the time grid has {} points.",
            data.len(),
            times.len()
        )));
    }

    let freq = dominant_frequency(data, step)
        .ok_or_else(|| AppError::numerical("Cannot compute a frequency grid from fewer than two samples."))?;
    let period = if freq > 0.0 {
        bounds.clamp_period(1.0 / freq)
    } else {
        bounds.max_period
    };

    let offset = mean(data).ok_or_else(|| AppError::numerical("No data to fit."))?;
    let amplitude = std_dev(data).unwrap_or(0.0) * std::f64::consts::SQRT_2;

    Ok(SineGuess {
        params: SineParams::new(amplitude, std::f64::consts::TAU / period, 0.0, offset),
        period,
    })
}

/// Fit `A·sin(w·t + p) + c` to `data` sampled at `times`.
///
/// `sigma` weights each residual by `1/σ_i`; `None` fits unweighted.
pub fn fit_sinusoid(
    times: &[f64],
    data: &[f64],
    sigma: Option<&[f64]>,
    bounds: &PeriodBounds,
) -> Result<SineFit, AppError> {
    validate_bounds(bounds)?;
    grid_step(times)?;
    if data.len() != times.len() {
        return Err(AppError::shape(format!(
            "Data has {} values but the time grid has {} points.",
            data.len(),
            times.len()
        )));
    }
    if let Some(sigma) = sigma {
        if sigma.len() != data.len() {
            return Err(AppError::shape(format!(
                "Sigma has {} values but data has {}.",
                sigma.len(),
                data.len()
            )));
        }
        if sigma.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(AppError::input("Sigma values must be finite and > 0."));
        }
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(AppError::numerical("Data contains non-finite values."));
    }
    let n = data.len();
    if n < MIN_OBSERVATIONS {
        return Err(AppError::numerical(format!(
            "Need at least {MIN_OBSERVATIONS} observations to fit {} parameters with uncertainties (got {n}).",
            SineParams::LEN
        )));
    }

    let guess = guess_params(times, data, bounds)?;

    let inv_sigma = match sigma {
        Some(s) => s.iter().map(|v| 1.0 / v).collect(),
        None => vec![1.0; n],
    };
    let problem = WeightedSine {
        times,
        data,
        inv_sigma,
    };

    let (w_lo, w_hi) = bounds.angular_range();
    let lower = [-PARAM_BOUND, w_lo, -PARAM_BOUND, -PARAM_BOUND];
    let upper = [PARAM_BOUND, w_hi, PARAM_BOUND, PARAM_BOUND];

    let solution = minimize(
        &problem,
        &guess.params.to_array(),
        &lower,
        &upper,
        &LmOptions::default(),
    )?;

    let dof = n - SineParams::LEN;
    let cov = unscaled_covariance(&solution.jacobian)
        .ok_or_else(|| AppError::numerical("Parameter covariance could not be estimated."))?;
    let scale = solution.cost / dof as f64;
    let sigmas: Vec<f64> = (0..SineParams::LEN)
        .map(|k| (cov[(k, k)] * scale).max(0.0).sqrt())
        .collect();

    Ok(SineFit {
        params: params_from(&solution.x),
        sigmas: SineParams::new(sigmas[0], sigmas[1], sigmas[2], sigmas[3]),
        guessed_period: guess.period,
        chi_square: solution.cost,
        dof,
        evaluations: solution.evaluations,
    })
}

fn validate_bounds(bounds: &PeriodBounds) -> Result<(), AppError> {
    if bounds.is_valid() {
        Ok(())
    } else {
        Err(AppError::input(format!(
            "Invalid period bounds [{}, {}]: both must be finite, positive and ordered.",
            bounds.min_period, bounds.max_period
        )))
    }
}

fn grid_step(times: &[f64]) -> Result<f64, AppError> {
    match times {
        [t0, t1, ..] if (t1 - t0).is_finite() && t1 > t0 => Ok(t1 - t0),
        [_, _, ..] => Err(AppError::numerical("Time grid must be strictly increasing.")),
        _ => Err(AppError::numerical(format!(
            "Time grid needs at least 2 points for a frequency grid (got {}).",
            times.len()
        ))),
    }
}
