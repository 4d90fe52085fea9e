//! Linear least squares and covariance helpers.
//!
//! The nonlinear solver repeatedly solves small damped linear problems of the form:
//!
//! ```text
//! minimize ‖J δ + r‖² + λ ‖D δ‖²
//! ```
//!
//! which we express as one tall, stacked least-squares system and hand to SVD.
//!
//! Implementation choices:
//! - SVD handles tall (more rows than columns) systems robustly.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Our parameter dimension is tiny (4 columns), so SVD cost is negligible.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Parameter covariance `(JᵀJ)⁻¹` from a Jacobian, via SVD.
///
/// Singular values below `ε · max(m, n) · s_max` are discarded (Moore-Penrose
/// pseudo-inverse), so rank-deficient Jacobians still yield a finite matrix.
pub fn unscaled_covariance(jacobian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let (m, n) = jacobian.shape();
    if m == 0 || n == 0 {
        return None;
    }

    let svd = jacobian.clone().svd(false, true);
    let v_t = svd.v_t.as_ref()?;
    let s_max = svd.singular_values.iter().copied().fold(0.0_f64, f64::max);
    if !(s_max.is_finite() && s_max > 0.0) {
        return None;
    }
    let threshold = f64::EPSILON * m.max(n) as f64 * s_max;

    let mut cov = DMatrix::<f64>::zeros(n, n);
    for (i, &s) in svd.singular_values.iter().enumerate() {
        if s <= threshold {
            continue;
        }
        let row = v_t.row(i);
        cov += row.transpose() * row / (s * s);
    }

    if cov.iter().all(|v| v.is_finite()) {
        Some(cov)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn covariance_inverts_normal_matrix() {
        let j = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let cov = unscaled_covariance(&j).unwrap();
        let normal = j.transpose() * &j;
        let identity = normal * cov;
        for r in 0..2 {
            for c in 0..2 {
                let expected = if r == c { 1.0 } else { 0.0 };
                assert!((identity[(r, c)] - expected).abs() < 1e-10);
            }
        }
    }
}
