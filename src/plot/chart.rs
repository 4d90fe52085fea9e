//! Plotters-powered block chart written to SVG.
//!
//! For each fitted series the chart shows:
//! - the measured points with their SEM as vertical error bars
//! - the fitted curve over the rendering grid
//! - the propagated band `curve ± band` as a translucent polygon
//!
//! All series and bounds are computed outside the draw call, which only draws.

use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domain::{MeasurementBlock, PlotRange, Series, SeriesCurve, SeriesSelector};
use crate::error::AppError;
use crate::math::finite_extent;

const CHART_SIZE: (u32, u32) = (600, 480);
const X_RANGE: (f64, f64) = (0.0, 24.0);

/// `{name}_{block:02}.svg`
pub fn plot_file_name(name: &str, block: usize) -> String {
    format!("{name}_{block:02}.svg")
}

/// Output path of a block chart inside `out_dir`.
pub fn plot_path(out_dir: &Path, name: &str, block: usize) -> PathBuf {
    out_dir.join(plot_file_name(name, block))
}

/// Resolve the y-axis range for the series being drawn.
///
/// `Auto` takes the extremes of `value ± sem` over the selected series and
/// doubles the span about its centre.
pub fn resolve_y_range(range: PlotRange, block: &MeasurementBlock, which: SeriesSelector) -> (f64, f64) {
    match range {
        PlotRange::Fixed { lo, hi } => (lo, hi),
        PlotRange::Auto => {
            let mut extremes = Vec::new();
            for &series in which.series() {
                let (values, sem) = block.series(series);
                for (v, e) in values.iter().zip(sem) {
                    extremes.push(v - e.abs());
                    extremes.push(v + e.abs());
                }
            }
            let Some((lo, hi)) = finite_extent(&extremes) else {
                return (-1.0, 1.0);
            };
            let span = hi - lo;
            if span <= f64::EPSILON * hi.abs().max(1.0) {
                return (lo - 1.0, hi + 1.0);
            }
            (lo - span / 2.0, hi + span / 2.0)
        }
    }
}

/// A render-only chart description.
pub struct BlockChart<'a> {
    pub title: &'a str,
    /// Sampling times of the measured points (their count sets the x ticks).
    pub sampling: &'a [f64],
    pub block: &'a MeasurementBlock,
    pub curves: &'a [SeriesCurve],
    pub y_range: (f64, f64),
}

struct SeriesStyle {
    color: RGBColor,
}

impl SeriesStyle {
    fn for_series(series: Series) -> Self {
        match series {
            Series::Control => Self { color: RED },
            Series::Experimental => Self { color: BLUE },
        }
    }
}

/// Draw the chart and write it to `path`.
pub fn render_block_chart(path: &Path, chart: &BlockChart<'_>) -> Result<(), AppError> {
    let (y0, y1) = chart.y_range;
    if !(y0.is_finite() && y1.is_finite()) || y1 <= y0 {
        return Err(AppError::input(format!("Invalid plot range [{y0}, {y1}].")));
    }
    for sc in chart.curves {
        let (values, sem) = chart.block.series(sc.series);
        if values.len() != chart.sampling.len() || sem.len() != chart.sampling.len() {
            return Err(AppError::shape(format!(
                "{} series has {} values and {} errors for {} sampling times.",
                sc.series.label(),
                values.len(),
                sem.len(),
                chart.sampling.len()
            )));
        }
    }

    draw_svg(path, chart).map_err(|e| AppError::io(format!("Failed to render plot '{}': {e}", path.display())))
}

fn draw_svg(path: &Path, chart: &BlockChart<'_>) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (y0, y1) = chart.y_range;
    let mut cc = ChartBuilder::on(&root)
        .caption(chart.title, ("sans-serif", 18))
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .build_cartesian_2d(X_RANGE.0..X_RANGE.1, y0..y1)?;

    cc.configure_mesh()
        .x_labels(chart.sampling.len().max(2))
        .x_desc("time, hrs.")
        .x_label_formatter(&|v| format!("{v:.0}"))
        .y_label_formatter(&|v| format!("{v:.3}"))
        .draw()?;

    for sc in chart.curves {
        let color = SeriesStyle::for_series(sc.series).color;
        let curve = &sc.curve;
        let (values, sem) = chart.block.series(sc.series);

        // 1) Band: upper edge left to right, lower edge right to left.
        let upper = curve
            .times
            .iter()
            .zip(curve.values.iter().zip(&curve.band))
            .map(|(&t, (&v, &b))| (t, v + b));
        let lower = curve
            .times
            .iter()
            .zip(curve.values.iter().zip(&curve.band))
            .rev()
            .map(|(&t, (&v, &b))| (t, v - b));
        let band: Vec<(f64, f64)> = upper.chain(lower).collect();
        cc.draw_series(std::iter::once(Polygon::new(band, color.mix(0.4).filled())))?;

        // 2) Fitted curve.
        cc.draw_series(LineSeries::new(
            curve.times.iter().copied().zip(curve.values.iter().copied()),
            color.stroke_width(2),
        ))?
        .label(sc.series.label())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));

        // 3) Measured points with SEM error bars.
        cc.draw_series(
            chart
                .sampling
                .iter()
                .zip(values.iter().zip(sem))
                .map(|(&t, (&v, &e))| ErrorBar::new_vertical(t, v - e, v, v + e, color.filled(), 8)),
        )?;

        let points = chart.sampling.iter().copied().zip(values.iter().copied());
        match sc.series {
            Series::Control => {
                cc.draw_series(points.map(|p| Cross::new(p, 6, color.stroke_width(2))))?;
            }
            Series::Experimental => {
                cc.draw_series(points.map(|p| TriangleMarker::new(p, 6, color.filled())))?;
            }
        }
    }

    if !chart.curves.is_empty() {
        cc.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
