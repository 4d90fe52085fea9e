//! Summary statistics over plain slices.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

/// `(min, max)` over finite values.
pub fn finite_extent<'a, I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        if v.is_finite() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if lo.is_finite() && hi.is_finite() {
        Some((lo, hi))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_population_std() {
        let data = [1.0, 2.0, 3.0, 2.0, 1.0, 0.0];
        assert!((mean(&data).unwrap() - 1.5).abs() < 1e-12);
        // var = (0.25 + 0.25 + 2.25 + 0.25 + 0.25 + 2.25) / 6 = 5.5 / 6
        assert!((std_dev(&data).unwrap() - (5.5_f64 / 6.0).sqrt()).abs() < 1e-12);
        assert!(mean(&[]).is_none());
    }

    #[test]
    fn extent_skips_non_finite() {
        let data = [f64::NAN, -1.0, 4.0, f64::INFINITY];
        assert_eq!(finite_extent(&data), Some((-1.0, 4.0)));
        assert_eq!(finite_extent(&[f64::NAN]), None);
    }
}
