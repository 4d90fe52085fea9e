//! `SineFitAnalyzer`: grids + configuration for one (sheet, block, name) triple.
//!
//! Every operation takes its inputs as arguments and returns its outputs; the
//! analyzer never caches measurements or fits between calls, so operations can
//! be called in any order (and from several threads on clones).

use std::path::PathBuf;

use crate::domain::{
    AnalyzerConfig, FittedCurve, MeasurementBlock, PeriodBounds, PlotOptions, SeriesCurve, SeriesSelector, SineFit,
    TimeGrid,
};
use crate::error::AppError;
use crate::fit::{SineGuess, fit_curve, fit_sinusoid, guess_params};
use crate::io::load_block;
use crate::plot::{BlockChart, plot_file_name, render_block_chart, resolve_y_range};

#[derive(Debug, Clone)]
pub struct SineFitAnalyzer {
    config: AnalyzerConfig,
    sampling: TimeGrid,
    rendering: TimeGrid,
}

impl SineFitAnalyzer {
    /// Build both time grids. No I/O and no validation happen here.
    pub fn new(config: AnalyzerConfig) -> Self {
        let sampling = TimeGrid::sampling(config.readings);
        let rendering = TimeGrid::rendering();
        Self {
            config,
            sampling,
            rendering,
        }
    }

    /// Coarse grid: the measurement times.
    pub fn sampling(&self) -> &TimeGrid {
        &self.sampling
    }

    /// Fine grid used for curves and bands.
    pub fn rendering(&self) -> &TimeGrid {
        &self.rendering
    }

    /// Read the configured sheet and slice the configured block.
    pub fn load_measurements(&self) -> Result<MeasurementBlock, AppError> {
        let path = self
            .config
            .source
            .as_deref()
            .ok_or_else(|| AppError::io("No data source configured."))?;
        load_block(path, self.config.readings, self.config.block)
    }

    /// FFT-seeded starting point for a series.
    pub fn guess_params(&self, data: &[f64], bounds: &PeriodBounds) -> Result<SineGuess, AppError> {
        guess_params(self.sampling.times(), data, bounds)
    }

    /// Fit one series on the sampling grid.
    pub fn estimate_params(
        &self,
        data: &[f64],
        sigma: Option<&[f64]>,
        bounds: &PeriodBounds,
    ) -> Result<SineFit, AppError> {
        fit_sinusoid(self.sampling.times(), data, sigma, bounds)
    }

    /// Fit one series and evaluate curve + band on the rendering grid.
    pub fn fit_curve(&self, data: &[f64], sigma: Option<&[f64]>, bounds: &PeriodBounds) -> Result<FittedCurve, AppError> {
        fit_curve(self.sampling.times(), self.rendering.times(), data, sigma, bounds)
    }

    /// Fit every selected series of a block, weighting by its SEM.
    pub fn fit_selected(
        &self,
        block: &MeasurementBlock,
        which: SeriesSelector,
        bounds: &PeriodBounds,
    ) -> Result<Vec<SeriesCurve>, AppError> {
        which
            .series()
            .iter()
            .map(|&series| {
                let (values, sem) = block.series(series);
                let curve = self.fit_curve(values, Some(sem), bounds).map_err(|e| {
                    AppError::new(e.kind(), format!("{} series, block {}: {}", series.label(), block.block, e.message()))
                })?;
                Ok(SeriesCurve { series, curve })
            })
            .collect()
    }

    /// `{name}_{block:02}.svg`
    pub fn plot_file_name(&self) -> String {
        plot_file_name(&self.config.name, self.config.block)
    }

    /// Draw already-fitted curves and write the chart into `opts.out_dir`.
    pub fn render_curves(
        &self,
        block: &MeasurementBlock,
        curves: &[SeriesCurve],
        opts: &PlotOptions,
    ) -> Result<PathBuf, AppError> {
        let path = opts.out_dir.join(self.plot_file_name());
        let chart = BlockChart {
            title: &opts.title,
            sampling: self.sampling.times(),
            block,
            curves,
            y_range: resolve_y_range(opts.range, block, opts.which),
        };
        render_block_chart(&path, &chart)?;
        Ok(path)
    }

    /// Fit the selected series and save the chart. Returns the written path.
    pub fn render(&self, block: &MeasurementBlock, opts: &PlotOptions, bounds: &PeriodBounds) -> Result<PathBuf, AppError> {
        let curves = self.fit_selected(block, opts.which, bounds)?;
        self.render_curves(block, &curves, opts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlotRange, Series};
    use crate::error::ErrorKind;

    fn sheet(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("circa-analyzer-{}-{name}.csv", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Block 0: the canonical bump; block 1: a clean sinusoid.
    fn two_blocks() -> String {
        let control = [[1.0, 2.0, 3.0, 2.0, 1.0, 0.0], [0.3, 0.5, 0.2, -0.3, -0.5, -0.2]];
        let experimental = [[0.3, 0.5, 0.2, -0.3, -0.5, -0.2], [1.0, 2.0, 3.0, 2.0, 1.0, 0.0]];
        let mut s = String::from("Cq_c,SEM_c,Cq_e,SEM_e\n");
        for b in 0..2 {
            if b > 0 {
                s.push_str(",,,\n");
            }
            for i in 0..6 {
                s.push_str(&format!("{},0.1,{},0.05\n", control[b][i], experimental[b][i]));
            }
        }
        s
    }

    fn analyzer(source: Option<PathBuf>, block: usize) -> SineFitAnalyzer {
        SineFitAnalyzer::new(AnalyzerConfig {
            source,
            readings: 6,
            block,
            name: "per2".to_string(),
        })
    }

    #[test]
    fn defaults_build_standard_grids() {
        let a = SineFitAnalyzer::new(AnalyzerConfig::default());
        assert_eq!(a.sampling().len(), 6);
        assert_eq!(a.rendering().len(), 50);
        assert_eq!(a.plot_file_name(), "_00.svg");
    }

    #[test]
    fn unset_source_is_an_io_error() {
        let err = analyzer(None, 0).load_measurements().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn loads_the_configured_block() {
        let path = sheet("load", &two_blocks());
        let block = analyzer(Some(path.clone()), 1).load_measurements().unwrap();
        assert_eq!(block.block, 1);
        assert_eq!(block.control_cq, vec![0.3, 0.5, 0.2, -0.3, -0.5, -0.2]);
        assert_eq!(block.experimental_sem, vec![0.05; 6]);

        let err = analyzer(Some(path.clone()), 2).load_measurements().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn operations_are_independent_of_call_order() {
        let a = analyzer(None, 0);
        let data = [1.0, 2.0, 3.0, 2.0, 1.0, 0.0];
        let sigma = [0.1; 6];
        let bounds = PeriodBounds::default();

        // Fitting before any load works, and repeated calls agree.
        let first = a.estimate_params(&data, Some(&sigma), &bounds).unwrap();
        let curve = a.fit_curve(&data, Some(&sigma), &bounds).unwrap();
        let again = a.estimate_params(&data, Some(&sigma), &bounds).unwrap();
        assert_eq!(first, again);
        assert_eq!(curve.fit, first);
        assert!(bounds.contains(first.fitted_period()));
        assert!((a.guess_params(&data, &bounds).unwrap().period - 24.0).abs() < 1e-9);
    }

    #[test]
    fn sigma_length_mismatch_is_a_shape_error() {
        let a = analyzer(None, 0);
        let err = a
            .estimate_params(&[1.0, 2.0, 3.0, 2.0, 1.0, 0.0], Some(&[0.1; 5]), &PeriodBounds::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
    }

    #[test]
    fn fit_selected_follows_the_selector() {
        let path = sheet("select", &two_blocks());
        let a = analyzer(Some(path.clone()), 0);
        let block = a.load_measurements().unwrap();
        let bounds = PeriodBounds::default();

        let both = a.fit_selected(&block, SeriesSelector::Both, &bounds).unwrap();
        assert_eq!(
            both.iter().map(|c| c.series).collect::<Vec<_>>(),
            vec![Series::Control, Series::Experimental]
        );
        let only = a.fit_selected(&block, SeriesSelector::Experimental, &bounds).unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].series, Series::Experimental);
        assert_eq!(only[0].curve, both[1].curve);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn render_writes_named_svg() {
        let path = sheet("render", &two_blocks());
        let a = analyzer(Some(path.clone()), 1);
        let block = a.load_measurements().unwrap();
        let out_dir = std::env::temp_dir().join(format!("circa-analyzer-out-{}", std::process::id()));
        std::fs::create_dir_all(&out_dir).unwrap();

        let opts = PlotOptions {
            range: PlotRange::Auto,
            title: "per2 block 1".to_string(),
            which: SeriesSelector::Both,
            out_dir: out_dir.clone(),
        };
        let written = a.render(&block, &opts, &PeriodBounds::default()).unwrap();
        assert_eq!(written, out_dir.join("per2_01.svg"));
        assert!(std::fs::read_to_string(&written).unwrap().contains("<svg"));

        std::fs::remove_dir_all(out_dir).ok();
        std::fs::remove_file(path).ok();
    }
}
