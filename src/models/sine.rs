//! Evaluation of `f(t) = A·sin(w·t + p) + c` and its parameter gradient.
//!
//! The fitter relies on two primitive operations:
//! - predict `f(t)` for a parameter set (residuals, curves, plots)
//! - the partial derivatives `∂f/∂(A, w, p, c)` at `t` (solver Jacobian and
//!   uncertainty propagation)

use crate::domain::SineParams;

/// Predict `f(t)`.
pub fn predict(params: &SineParams, t: f64) -> f64 {
    params.amplitude * (params.angular_frequency * t + params.phase).sin() + params.offset
}

/// Partial derivatives of `f(t)` with respect to `(A, w, p, c)`, in that order.
pub fn gradient(params: &SineParams, t: f64) -> [f64; 4] {
    let angle = params.angular_frequency * t + params.phase;
    let (s, c) = angle.sin_cos();
    [s, params.amplitude * t * c, params.amplitude * c, 1.0]
}

/// Evaluate the model at every time.
pub fn predict_all(params: &SineParams, times: &[f64]) -> Vec<f64> {
    times.iter().map(|&t| predict(params, t)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_matches_closed_form() {
        let p = SineParams::new(2.0, std::f64::consts::TAU / 24.0, 0.0, 1.0);
        assert!((predict(&p, 0.0) - 1.0).abs() < 1e-12);
        assert!((predict(&p, 6.0) - 3.0).abs() < 1e-12);
        assert!((predict(&p, 18.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn gradient_matches_finite_differences() {
        let p = SineParams::new(1.3, 0.27, -0.4, 5.0);
        let t = 7.5;
        let g = gradient(&p, t);
        let h = 1e-6;
        for k in 0..4 {
            let mut hi = p.to_array();
            let mut lo = p.to_array();
            hi[k] += h;
            lo[k] -= h;
            let at = |v: [f64; 4]| predict(&SineParams::new(v[0], v[1], v[2], v[3]), t);
            let fd = (at(hi) - at(lo)) / (2.0 * h);
            assert!((fd - g[k]).abs() < 1e-6, "param {k}: fd={fd} analytic={}", g[k]);
        }
    }
}
