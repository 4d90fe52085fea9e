//! Box-constrained Levenberg-Marquardt solver.
//!
//! Minimizes `‖r(x)‖²` subject to `lower ≤ x ≤ upper` for small parameter
//! vectors. Each iteration:
//!
//! - pins parameters that sit on a bound with the gradient pushing outward
//! - solves the damped step `min ‖J δ + r‖² + λ ‖D δ‖²` over the free
//!   parameters (`D` = Jacobian column norms, Marquardt scaling)
//! - projects the trial point back into the box
//! - accepts the step if the cost drops, otherwise raises `λ` and retries
//!
//! `λ` follows the gain ratio `ρ = actual / predicted` reduction (Nielsen's
//! update): good steps shrink it by up to a factor of three, rejected steps
//! grow it geometrically.
//!
//! Convergence is declared on a small relative cost reduction (`ftol`), a small
//! step (`xtol`), or a small projected gradient (`gtol`). Running out of
//! residual evaluations is reported as an error.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::solve_least_squares;

const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

/// A nonlinear least-squares problem: residual vector plus its Jacobian.
pub trait LeastSquaresProblem {
    fn residuals(&self, x: &DVector<f64>) -> DVector<f64>;

    /// `∂r_i/∂x_j`, one row per residual.
    fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64>;
}

#[derive(Debug, Clone)]
pub struct LmOptions {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub max_evaluations: usize,
    pub initial_lambda: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            ftol: 1e-8,
            xtol: 1e-8,
            gtol: 1e-12,
            max_evaluations: 2000,
            initial_lambda: 1e-3,
        }
    }
}

/// Converged solver state.
#[derive(Debug, Clone)]
pub struct LmSolution {
    pub x: DVector<f64>,
    /// `‖r(x)‖²` at the solution.
    pub cost: f64,
    /// Jacobian at the solution.
    pub jacobian: DMatrix<f64>,
    pub evaluations: usize,
}

/// Minimize `‖r(x)‖²` inside `[lower, upper]`, starting from `x0`.
///
/// `x0` is clamped into the box before the first evaluation.
pub fn minimize<P: LeastSquaresProblem>(
    problem: &P,
    x0: &[f64],
    lower: &[f64],
    upper: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, AppError> {
    let n = x0.len();
    if n == 0 {
        return Err(AppError::numerical("Solver needs at least one parameter."));
    }
    if lower.len() != n || upper.len() != n {
        return Err(AppError::shape(format!(
            "Bound vectors must have {n} entries (got {} lower, {} upper).",
            lower.len(),
            upper.len()
        )));
    }
    if lower.iter().zip(upper).any(|(lo, hi)| !(lo <= hi)) {
        return Err(AppError::input("Each lower bound must not exceed its upper bound."));
    }

    let mut x = DVector::from_iterator(
        n,
        x0.iter()
            .zip(lower.iter().zip(upper))
            .map(|(&v, (&lo, &hi))| v.clamp(lo, hi)),
    );
    let mut r = problem.residuals(&x);
    let mut evaluations = 1usize;
    let mut cost = r.norm_squared();
    if !cost.is_finite() {
        return Err(AppError::numerical("Residuals are not finite at the starting point."));
    }

    let mut lambda = opts.initial_lambda.max(LAMBDA_MIN);
    let mut growth = 2.0_f64;

    'outer: loop {
        if cost == 0.0 {
            break;
        }

        let jac = problem.jacobian(&x);
        let grad = jac.transpose() * &r;

        let free: Vec<usize> = (0..n)
            .filter(|&k| {
                let pinned_low = x[k] <= lower[k] && grad[k] > 0.0;
                let pinned_high = x[k] >= upper[k] && grad[k] < 0.0;
                !(pinned_low || pinned_high)
            })
            .collect();
        if free.is_empty() {
            break;
        }

        let grad_norm = free.iter().map(|&k| grad[k].abs()).fold(0.0_f64, f64::max);
        if grad_norm <= opts.gtol {
            break;
        }

        let jf = jac.select_columns(free.iter());
        let scale: Vec<f64> = (0..free.len())
            .map(|j| jf.column(j).norm().max(1e-12))
            .collect();
        let (m, q) = jf.shape();

        loop {
            if evaluations >= opts.max_evaluations {
                return Err(AppError::numerical(format!(
                    "Fit did not converge within {} residual evaluations.",
                    opts.max_evaluations
                )));
            }

            let mut aug = DMatrix::<f64>::zeros(m + q, q);
            aug.rows_mut(0, m).copy_from(&jf);
            let damping = lambda.sqrt();
            for (j, s) in scale.iter().enumerate() {
                aug[(m + j, j)] = damping * s;
            }
            let mut rhs = DVector::<f64>::zeros(m + q);
            rhs.rows_mut(0, m).copy_from(&(-&r));

            let Some(delta) = solve_least_squares(&aug, &rhs) else {
                lambda *= growth;
                growth *= 2.0;
                if lambda > LAMBDA_MAX {
                    return Err(AppError::numerical("Damped step could not be solved."));
                }
                continue;
            };

            let mut trial = x.clone();
            for (j, &k) in free.iter().enumerate() {
                trial[k] = (x[k] + delta[j]).clamp(lower[k], upper[k]);
            }
            let step = &trial - &x;
            let small_step = step.norm() <= opts.xtol * (opts.xtol + x.norm());
            let predicted = cost - (&r + &jac * &step).norm_squared();

            let r_trial = problem.residuals(&trial);
            evaluations += 1;
            let cost_trial = r_trial.norm_squared();

            if cost_trial.is_finite() && cost_trial < cost {
                let reduction = (cost - cost_trial) / cost;
                let rho = if predicted > 0.0 { (cost - cost_trial) / predicted } else { 0.0 };
                x = trial;
                r = r_trial;
                cost = cost_trial;
                let shrink = (1.0 - (2.0 * rho - 1.0).powi(3)).max(1.0 / 3.0);
                lambda = (lambda * shrink).max(LAMBDA_MIN);
                growth = 2.0;
                if reduction < opts.ftol || small_step {
                    break 'outer;
                }
                continue 'outer;
            }

            // No improvement and no room left to move: we are at the minimum.
            if small_step {
                break 'outer;
            }

            lambda *= growth;
            growth *= 2.0;
            if lambda > LAMBDA_MAX {
                return Err(AppError::numerical(
                    "Fit stalled: damping grew without reducing the residual.",
                ));
            }
        }
    }

    let jacobian = problem.jacobian(&x);
    Ok(LmSolution {
        x,
        cost,
        jacobian,
        evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `y = a·exp(b·t)` sampled without noise.
    struct ExpDecay {
        t: Vec<f64>,
        y: Vec<f64>,
    }

    impl LeastSquaresProblem for ExpDecay {
        fn residuals(&self, x: &DVector<f64>) -> DVector<f64> {
            DVector::from_iterator(
                self.t.len(),
                self.t
                    .iter()
                    .zip(&self.y)
                    .map(|(&t, &y)| x[0] * (x[1] * t).exp() - y),
            )
        }

        fn jacobian(&self, x: &DVector<f64>) -> DMatrix<f64> {
            let mut j = DMatrix::zeros(self.t.len(), 2);
            for (i, &t) in self.t.iter().enumerate() {
                let e = (x[1] * t).exp();
                j[(i, 0)] = e;
                j[(i, 1)] = x[0] * t * e;
            }
            j
        }
    }

    fn exp_problem() -> ExpDecay {
        let t: Vec<f64> = (0..10).map(|i| i as f64 * 0.5).collect();
        let y = t.iter().map(|&t| 3.0 * (-0.4 * t).exp()).collect();
        ExpDecay { t, y }
    }

    #[test]
    fn recovers_exponential_parameters() {
        let p = exp_problem();
        let sol = minimize(&p, &[1.0, -0.1], &[-10.0, -5.0], &[10.0, 5.0], &LmOptions::default()).unwrap();
        assert!((sol.x[0] - 3.0).abs() < 1e-6, "a = {}", sol.x[0]);
        assert!((sol.x[1] + 0.4).abs() < 1e-6, "b = {}", sol.x[1]);
        assert!(sol.cost < 1e-12);
    }

    #[test]
    fn respects_active_bound() {
        // True b = -0.4 lies outside [-0.2, 0.0]; the solution must sit on the bound.
        let p = exp_problem();
        let sol = minimize(&p, &[1.0, -0.1], &[-10.0, -0.2], &[10.0, 0.0], &LmOptions::default()).unwrap();
        assert!(sol.x[1] >= -0.2 && sol.x[1] <= 0.0);
        assert!((sol.x[1] + 0.2).abs() < 1e-9, "b = {}", sol.x[1]);
    }

    #[test]
    fn rejects_mismatched_bounds() {
        let p = exp_problem();
        let err = minimize(&p, &[1.0, -0.1], &[0.0], &[1.0, 1.0], &LmOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Shape);
    }

    #[test]
    fn reports_non_convergence() {
        let p = exp_problem();
        let opts = LmOptions {
            max_evaluations: 2,
            ..LmOptions::default()
        };
        let err = minimize(&p, &[1.0, 1.0], &[-10.0, -5.0], &[10.0, 5.0], &opts).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Numerical);
    }
}
