//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting and rendering
//! - exported to JSON
//! - passed between the analyzer, the pipeline and the CLI without hidden state

use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// First sampling time of every grid (hours).
pub const GRID_START_HOURS: f64 = 2.0;
/// Last sampling time of every grid (hours).
pub const GRID_END_HOURS: f64 = 22.0;
/// Number of points on the rendering grid.
pub const FINE_GRID_POINTS: usize = 50;
/// Readings per block when none is configured.
pub const DEFAULT_READINGS: usize = 6;

/// Evenly spaced sampling times in hours.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// `n` evenly spaced points over `[start, end]`, endpoints included.
    ///
    /// `n == 1` yields `[start]` and `n == 0` an empty grid.
    pub fn linspace(start: f64, end: f64, n: usize) -> Self {
        let times = match n {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (end - start) / (n as f64 - 1.0);
                (0..n)
                    .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
                    .collect()
            }
        };
        Self { times }
    }

    /// The sampling design: `readings` points over `[2, 22]` hours.
    pub fn sampling(readings: usize) -> Self {
        Self::linspace(GRID_START_HOURS, GRID_END_HOURS, readings)
    }

    /// The rendering grid: 50 points over `[2, 22]` hours.
    pub fn rendering() -> Self {
        Self::linspace(GRID_START_HOURS, GRID_END_HOURS, FINE_GRID_POINTS)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// One of the two measured conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    Control,
    Experimental,
}

impl Series {
    pub fn label(self) -> &'static str {
        match self {
            Series::Control => "control",
            Series::Experimental => "experimental",
        }
    }
}

/// Which series a plot or analysis covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeriesSelector {
    #[default]
    Both,
    Control,
    Experimental,
}

impl SeriesSelector {
    pub fn series(self) -> &'static [Series] {
        match self {
            SeriesSelector::Both => &[Series::Control, Series::Experimental],
            SeriesSelector::Control => &[Series::Control],
            SeriesSelector::Experimental => &[Series::Experimental],
        }
    }
}

/// Plausible circadian period range in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodBounds {
    pub min_period: f64,
    pub max_period: f64,
}

impl Default for PeriodBounds {
    fn default() -> Self {
        Self {
            min_period: 20.0,
            max_period: 28.0,
        }
    }
}

impl PeriodBounds {
    pub fn new(min_period: f64, max_period: f64) -> Self {
        Self {
            min_period,
            max_period,
        }
    }

    /// Both ends finite and positive, `min <= max`.
    pub fn is_valid(&self) -> bool {
        self.min_period.is_finite()
            && self.max_period.is_finite()
            && self.min_period > 0.0
            && self.min_period <= self.max_period
    }

    /// Force a period into `[min_period, max_period]`.
    pub fn clamp_period(&self, period: f64) -> f64 {
        if period < self.min_period {
            self.min_period
        } else if period > self.max_period {
            self.max_period
        } else {
            period
        }
    }

    /// Angular frequency range `(2π/max, 2π/min)` in rad/hour.
    pub fn angular_range(&self) -> (f64, f64) {
        let tau = std::f64::consts::TAU;
        (tau / self.max_period, tau / self.min_period)
    }

    pub fn contains(&self, period: f64) -> bool {
        period >= self.min_period && period <= self.max_period
    }
}

/// Parameters of `A·sin(w·t + p) + c`.
///
/// The same shape carries the 1-sigma uncertainties of a fit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SineParams {
    pub amplitude: f64,
    pub angular_frequency: f64,
    pub phase: f64,
    pub offset: f64,
}

impl SineParams {
    pub const LEN: usize = 4;

    pub fn new(amplitude: f64, angular_frequency: f64, phase: f64, offset: f64) -> Self {
        Self {
            amplitude,
            angular_frequency,
            phase,
            offset,
        }
    }

    pub fn to_array(self) -> [f64; 4] {
        [self.amplitude, self.angular_frequency, self.phase, self.offset]
    }

    /// Period in hours implied by the angular frequency.
    pub fn period(&self) -> f64 {
        std::f64::consts::TAU / self.angular_frequency.abs()
    }
}

/// Output of a single sinusoid fit.
#[derive(Debug, Clone, PartialEq)]
pub struct SineFit {
    pub params: SineParams,
    /// 1-sigma uncertainties (square root of the covariance diagonal).
    pub sigmas: SineParams,
    /// Period implied by the FFT guess after clamping.
    pub guessed_period: f64,
    /// Weighted sum of squared residuals at the solution.
    pub chi_square: f64,
    /// Residual degrees of freedom (`n - 4`).
    pub dof: usize,
    pub evaluations: usize,
}

impl SineFit {
    pub fn fitted_period(&self) -> f64 {
        self.params.period()
    }
}

/// Fitted model and its propagated uncertainty band over the rendering grid.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCurve {
    pub fit: SineFit,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    /// Band half-width at each time, never negative.
    pub band: Vec<f64>,
}

/// A fitted curve tagged with the series it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesCurve {
    pub series: Series,
    pub curve: FittedCurve,
}

/// One block of measurements: four parallel sequences of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementBlock {
    pub block: usize,
    pub control_cq: Vec<f64>,
    pub control_sem: Vec<f64>,
    pub experimental_cq: Vec<f64>,
    pub experimental_sem: Vec<f64>,
}

impl MeasurementBlock {
    /// `(values, sem)` for one series.
    pub fn series(&self, series: Series) -> (&[f64], &[f64]) {
        match series {
            Series::Control => (&self.control_cq, &self.control_sem),
            Series::Experimental => (&self.experimental_cq, &self.experimental_sem),
        }
    }

    pub fn len(&self) -> usize {
        self.control_cq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.control_cq.is_empty()
    }
}

/// Y-axis range for rendered plots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlotRange {
    Fixed { lo: f64, hi: f64 },
    /// Derive from the extremes of the plotted data.
    Auto,
}

impl Default for PlotRange {
    fn default() -> Self {
        PlotRange::Fixed { lo: -0.06, hi: 0.06 }
    }
}

impl FromStr for PlotRange {
    type Err = String;

    /// Accepts `auto` or `LO,HI`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s.eq_ignore_ascii_case("smart") {
            return Ok(PlotRange::Auto);
        }

        let Some((lo, hi)) = s.split_once(',') else {
            return Err(format!("Invalid plot range '{s}'. Expected `auto` or `LO,HI`."));
        };
        let lo: f64 = lo
            .trim()
            .parse()
            .map_err(|_| format!("Invalid lower plot bound '{}'.", lo.trim()))?;
        let hi: f64 = hi
            .trim()
            .parse()
            .map_err(|_| format!("Invalid upper plot bound '{}'.", hi.trim()))?;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(format!("Plot range must satisfy LO < HI (got {lo}, {hi})."));
        }
        Ok(PlotRange::Fixed { lo, hi })
    }
}

/// Rendering options for a block plot.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotOptions {
    pub range: PlotRange,
    pub title: String,
    pub which: SeriesSelector,
    /// Directory the image is written into.
    pub out_dir: PathBuf,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            range: PlotRange::default(),
            title: String::new(),
            which: SeriesSelector::Both,
            out_dir: PathBuf::from("."),
        }
    }
}

/// Construction parameters for an analyzer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    /// CSV sheet path; may be unset when only fitting in-memory data.
    pub source: Option<PathBuf>,
    pub readings: usize,
    pub block: usize,
    /// Display name, used for the output file name.
    pub name: String,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            source: None,
            readings: DEFAULT_READINGS,
            block: 0,
            name: String::new(),
        }
    }
}

/// Everything a CLI run needs, resolved from arguments.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub csv_path: PathBuf,
    pub readings: usize,
    pub name: String,
    pub bounds: PeriodBounds,
    pub plot: PlotOptions,
    pub save: bool,
    pub quiet: bool,
    pub ascii_plot: bool,
    pub ascii_width: usize,
    pub ascii_height: usize,
    pub export_fit: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_grid_matches_design_points() {
        let grid = TimeGrid::sampling(6);
        assert_eq!(grid.times(), &[2.0, 6.0, 10.0, 14.0, 18.0, 22.0]);
    }

    #[test]
    fn rendering_grid_is_strictly_increasing() {
        let grid = TimeGrid::rendering();
        assert_eq!(grid.len(), FINE_GRID_POINTS);
        assert_eq!(grid.times()[0], GRID_START_HOURS);
        assert_eq!(grid.times()[FINE_GRID_POINTS - 1], GRID_END_HOURS);
        assert!(grid.times().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn short_grids_degenerate() {
        assert_eq!(TimeGrid::sampling(1).times(), &[2.0]);
        assert!(TimeGrid::sampling(0).is_empty());
    }

    #[test]
    fn plot_range_parses_auto_and_pairs() {
        assert_eq!("auto".parse::<PlotRange>().unwrap(), PlotRange::Auto);
        assert_eq!(
            "-0.5, 0.5".parse::<PlotRange>().unwrap(),
            PlotRange::Fixed { lo: -0.5, hi: 0.5 }
        );
        assert!("1,0".parse::<PlotRange>().is_err());
        assert!("wide".parse::<PlotRange>().is_err());
    }

    #[test]
    fn period_bounds_clamp_and_angular_range() {
        let b = PeriodBounds::default();
        assert_eq!(b.clamp_period(12.0), 20.0);
        assert_eq!(b.clamp_period(40.0), 28.0);
        assert_eq!(b.clamp_period(24.0), 24.0);
        let (lo, hi) = b.angular_range();
        assert!((lo - std::f64::consts::TAU / 28.0).abs() < 1e-15);
        assert!((hi - std::f64::consts::TAU / 20.0).abs() < 1e-15);
    }
}
