//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a fit in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - measured points: `x` (control), `d` (experimental)
//! - fitted curves: `-` (control), `:` (experimental)

use crate::domain::{MeasurementBlock, Series, SeriesCurve};
use crate::io::FitExport;
use crate::math::finite_extent;

fn point_char(series: Series) -> char {
    match series {
        Series::Control => 'x',
        Series::Experimental => 'd',
    }
}

fn curve_char(series: Series) -> char {
    match series {
        Series::Control => '-',
        Series::Experimental => ':',
    }
}

/// One series as drawn: measured values at the sampling times plus its curve.
struct Layer<'a> {
    series: Series,
    observed: &'a [f64],
    curve_times: &'a [f64],
    curve_values: &'a [f64],
}

/// Render the measured points and fitted curves of one block.
///
/// Only series that have a curve in `curves` are drawn. The time axis spans the
/// sampling grid; the y axis spans every drawn value with 5% padding.
pub fn render_ascii_plot(
    sampling: &[f64],
    block: &MeasurementBlock,
    curves: &[SeriesCurve],
    width: usize,
    height: usize,
) -> String {
    let layers: Vec<Layer<'_>> = curves
        .iter()
        .map(|sc| Layer {
            series: sc.series,
            observed: block.series(sc.series).0,
            curve_times: &sc.curve.times,
            curve_values: &sc.curve.values,
        })
        .collect();
    render_layers(sampling, &layers, width, height)
}

/// Render a block from a saved fit JSON export.
pub fn render_ascii_plot_from_export(export: &FitExport, width: usize, height: usize) -> String {
    let layers: Vec<Layer<'_>> = export
        .series
        .iter()
        .map(|s| Layer {
            series: s.series,
            observed: &s.observed,
            curve_times: &s.grid.time_hours,
            curve_values: &s.grid.value,
        })
        .collect();
    render_layers(&export.sampling, &layers, width, height)
}

fn render_layers(sampling: &[f64], layers: &[Layer<'_>], width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = match finite_extent(sampling) {
        Some((lo, hi)) if hi > lo => (lo, hi),
        _ => (0.0, 24.0),
    };

    let drawn = layers.iter().flat_map(|l| l.observed.iter().chain(l.curve_values));
    let (y_min, y_max) = match finite_extent(drawn) {
        Some((lo, hi)) if hi > lo => (lo, hi),
        Some((v, _)) => (v - 1.0, v + 1.0),
        None => (0.0, 1.0),
    };
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];
    let frame = Frame {
        t_min,
        t_max,
        y_min,
        y_max,
    };

    // Curves first so points overlay them.
    for l in layers {
        let points: Vec<(f64, f64)> = l
            .curve_times
            .iter()
            .copied()
            .zip(l.curve_values.iter().copied())
            .collect();
        draw_curve(&mut grid, &points, &frame, curve_char(l.series));
    }

    for l in layers {
        for (&t, &v) in sampling.iter().zip(l.observed) {
            if !v.is_finite() {
                continue;
            }
            let (x, y) = frame.map(t, v, width, height);
            grid[y][x] = point_char(l.series);
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: t=[{t_min:.1}, {t_max:.1}] hrs | y=[{y_min:.3}, {y_max:.3}]\n"
    ));
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

struct Frame {
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
}

impl Frame {
    fn map(&self, t: f64, y: f64, width: usize, height: usize) -> (usize, usize) {
        let u = ((t - self.t_min) / (self.t_max - self.t_min)).clamp(0.0, 1.0);
        let v = ((y - self.y_min) / (self.y_max - self.y_min)).clamp(0.0, 1.0);
        let x = (u * (width as f64 - 1.0)).round() as usize;
        // y=top is max -> row 0
        let row = (height as f64 - 1.0 - v * (height as f64 - 1.0)).round() as usize;
        (x, row)
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let pad = ((max - min).abs() * frac).max(1e-12);
    (min - pad, max + pad)
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], frame: &Frame, ch: char) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    if width == 0 {
        return;
    }

    let mut prev = None;
    for &(t, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let (x, row) = frame.map(t, y, width, height);
        match prev {
            Some((x0, y0)) => draw_line(grid, x0, y0, x, row, ch),
            None if grid[row][x] == ' ' => grid[row][x] = ch,
            None => {}
        }
        prev = Some((x, row));
    }
}

/// Integer line drawing (Bresenham-ish). Never overwrites a non-blank cell.
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
            .filter(|c| **c == ' ')
        {
            *cell = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
