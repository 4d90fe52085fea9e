//! Shared "analysis pipeline" logic used by the `fit` and `batch` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! sheet -> block -> fit selected series -> optional chart
//!
//! The commands can then focus on presentation (printing, previews, exports).

use std::path::PathBuf;

use rayon::prelude::*;

use crate::analyzer::SineFitAnalyzer;
use crate::domain::{AnalyzerConfig, MeasurementBlock, RunConfig, SeriesCurve};
use crate::error::AppError;
use crate::io::Sheet;

/// All computed outputs for one block.
#[derive(Debug, Clone)]
pub struct BlockRun {
    pub analyzer: SineFitAnalyzer,
    pub block: MeasurementBlock,
    pub curves: Vec<SeriesCurve>,
    /// Written chart, when saving was requested.
    pub plot: Option<PathBuf>,
}

fn analyzer_for(config: &RunConfig, block: usize) -> SineFitAnalyzer {
    SineFitAnalyzer::new(AnalyzerConfig {
        source: Some(config.csv_path.clone()),
        readings: config.readings,
        block,
        name: config.name.clone(),
    })
}

/// Load, fit and (optionally) render a single block.
pub fn run_block(config: &RunConfig, block: usize) -> Result<BlockRun, AppError> {
    let analyzer = analyzer_for(config, block);
    let measurements = analyzer.load_measurements()?;
    analyze(config, analyzer, measurements)
}

/// Analyze every complete block of the sheet.
///
/// The sheet is read once; blocks are fitted in parallel and returned in block
/// order. The first failing block aborts the batch.
pub fn run_batch(config: &RunConfig) -> Result<Vec<BlockRun>, AppError> {
    let sheet = Sheet::open(&config.csv_path)?;
    let count = sheet.block_count(config.readings);
    if count == 0 {
        return Err(AppError::range(format!(
            "'{}' has {} data rows, fewer than one block of {} readings.",
            config.csv_path.display(),
            sheet.rows(),
            config.readings
        )));
    }

    (0..count)
        .into_par_iter()
        .map(|block| {
            let measurements = sheet.block(config.readings, block)?;
            analyze(config, analyzer_for(config, block), measurements)
        })
        .collect()
}

fn analyze(config: &RunConfig, analyzer: SineFitAnalyzer, block: MeasurementBlock) -> Result<BlockRun, AppError> {
    let curves = analyzer.fit_selected(&block, config.plot.which, &config.bounds)?;
    let plot = if config.save {
        Some(analyzer.render_curves(&block, &curves, &config.plot)?)
    } else {
        None
    };

    Ok(BlockRun {
        analyzer,
        block,
        curves,
        plot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SampleConfig, generate_sheet, write_sheet_csv};
    use crate::domain::{PeriodBounds, PlotOptions, PlotRange, SeriesSelector};
    use crate::error::ErrorKind;

    fn config(csv_path: PathBuf, out_dir: PathBuf, save: bool) -> RunConfig {
        RunConfig {
            csv_path,
            readings: 6,
            name: "bmal1".to_string(),
            bounds: PeriodBounds::default(),
            plot: PlotOptions {
                range: PlotRange::Auto,
                title: String::new(),
                which: SeriesSelector::Both,
                out_dir,
            },
            save,
            quiet: true,
            ascii_plot: false,
            ascii_width: 60,
            ascii_height: 15,
            export_fit: None,
        }
    }

    fn write_sample(tag: &str, blocks: usize) -> PathBuf {
        let sheet = generate_sheet(&SampleConfig {
            blocks,
            noise: 0.0,
            ..SampleConfig::default()
        })
        .unwrap();
        let path = std::env::temp_dir().join(format!("circa-pipeline-{}-{tag}.csv", std::process::id()));
        write_sheet_csv(&path, &sheet).unwrap();
        path
    }

    #[test]
    fn batch_returns_blocks_in_order_and_writes_charts() {
        let csv = write_sample("batch", 4);
        let out_dir = std::env::temp_dir().join(format!("circa-pipeline-out-{}", std::process::id()));
        std::fs::create_dir_all(&out_dir).unwrap();

        let runs = run_batch(&config(csv.clone(), out_dir.clone(), true)).unwrap();
        assert_eq!(runs.len(), 4);
        for (i, run) in runs.iter().enumerate() {
            assert_eq!(run.block.block, i);
            assert_eq!(run.curves.len(), 2);
            let plot = run.plot.as_ref().unwrap();
            assert_eq!(plot, &out_dir.join(format!("bmal1_{i:02}.svg")));
            assert!(plot.exists());
        }

        std::fs::remove_dir_all(out_dir).ok();
        std::fs::remove_file(csv).ok();
    }

    #[test]
    fn single_block_matches_batch_entry() {
        let csv = write_sample("single", 3);
        let cfg = config(csv.clone(), std::env::temp_dir(), false);

        let one = run_block(&cfg, 2).unwrap();
        assert!(one.plot.is_none());
        let all = run_batch(&cfg).unwrap();
        assert_eq!(one.block, all[2].block);
        assert_eq!(one.curves, all[2].curves);

        let err = run_block(&cfg, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        std::fs::remove_file(csv).ok();
    }
}
