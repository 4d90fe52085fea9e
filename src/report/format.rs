//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (see the snapshot tests below)

use std::path::Path;

use crate::domain::{PeriodBounds, SeriesCurve, SineParams};
use crate::report::PointResidual;

/// Header plus one parameter table per fitted series.
pub fn format_fit_summary(name: &str, block: usize, readings: usize, bounds: &PeriodBounds, curves: &[SeriesCurve]) -> String {
    let mut out = String::new();

    out.push_str("=== circa - circadian sine fit ===\n");
    if !name.is_empty() {
        out.push_str(&format!("Name: {name}\n"));
    }
    out.push_str(&format!("Block: {block} | readings={readings}\n"));
    out.push_str(&format!(
        "Period bounds: [{:.2}, {:.2}] hrs\n",
        bounds.min_period, bounds.max_period
    ));

    for sc in curves {
        let fit = &sc.curve.fit;
        out.push('\n');
        out.push_str(&format!("{}:\n", sc.series.label()));
        out.push_str(&format!("- guessed period: {:.3} hrs\n", fit.guessed_period));
        out.push_str(&format!("- fitted period : {:.3} hrs\n", fit.fitted_period()));
        out.push_str(&format!(
            "- chi2={:.4} dof={} evals={}\n",
            fit.chi_square, fit.dof, fit.evaluations
        ));
        out.push_str(&format_params(&fit.params, &fit.sigmas));
    }

    out
}

fn format_params(params: &SineParams, sigmas: &SineParams) -> String {
    let rows = [
        ("A", params.amplitude, sigmas.amplitude),
        ("w", params.angular_frequency, sigmas.angular_frequency),
        ("p", params.phase, sigmas.phase),
        ("c", params.offset, sigmas.offset),
    ];
    let mut out = String::new();
    for (label, value, sigma) in rows {
        out.push_str(&format!("  {label} = {value:>12.6} ± {sigma:.6}\n"));
    }
    out
}

/// Observed vs fitted values at the sampling times.
pub fn format_residuals(label: &str, rows: &[PointResidual]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Residuals ({label}):\n"));
    out.push_str(
        format!(
            "{:>6} {:>12} {:>12} {:>12} {:>8}\n",
            "t", "observed", "fitted", "residual", "z"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<6} {:-<12} {:-<12} {:-<12} {:-<8}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for r in rows {
        let z = if r.normalized.is_finite() {
            format!("{:>8.2}", r.normalized)
        } else {
            format!("{:>8}", "-")
        };
        out.push_str(
            format!(
                "{:>6.1} {:>12.4} {:>12.4} {:>12.4} {z}\n",
                r.time, r.observed, r.fitted, r.residual
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Outcome of one block in a batch run.
#[derive(Debug, Clone)]
pub struct BatchRow<'a> {
    pub block: usize,
    pub curves: &'a [SeriesCurve],
    pub plot: Option<&'a Path>,
}

/// One line per block and series: fitted period and amplitude.
pub fn format_batch_table(rows: &[BatchRow<'_>]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>5} {:<13} {:>10} {:>10} {:>10} {:<24}\n",
            "block", "series", "period", "amplitude", "offset", "plot"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<5} {:-<13} {:-<10} {:-<10} {:-<10} {:-<24}\n", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for row in rows {
        let plot = row.plot.map(|p| p.display().to_string()).unwrap_or_default();
        for sc in row.curves {
            let params = &sc.curve.fit.params;
            out.push_str(
                format!(
                    "{:>5} {:<13} {:>10.3} {:>10.4} {:>10.4} {:<24}\n",
                    row.block,
                    sc.series.label(),
                    params.period(),
                    params.amplitude,
                    params.offset,
                    plot
                )
                .trim_end(),
            );
            out.push('\n');
        }
    }

    out
}
