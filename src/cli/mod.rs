//! Command-line parsing for the circadian sine fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_READINGS, PlotRange, SeriesSelector};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "circa", version, about = "Circadian Cq sine fitter")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit one block of a sheet, print the parameters and save the chart.
    Fit(FitArgs),
    /// Fit every block of a sheet (in parallel) and save one chart per block.
    Batch(BatchArgs),
    /// Preview a fit JSON written by `--export-fit` in the terminal.
    Show(ShowArgs),
    /// Write a synthetic sheet of noisy circadian blocks.
    Sample(SampleArgs),
}

/// Options shared by `fit` and `batch`.
#[derive(Debug, Args, Clone)]
pub struct AnalysisArgs {
    /// Input sheet with `Cq_c`, `SEM_c`, `Cq_e`, `SEM_e` columns.
    #[arg(short = 'f', long, value_name = "CSV")]
    pub csv: PathBuf,

    /// Readings per block (rows per time series).
    #[arg(short = 'n', long, default_value_t = DEFAULT_READINGS)]
    pub readings: usize,

    /// Display name; charts are saved as `{name}_{block:02}.svg`.
    #[arg(long, default_value = "")]
    pub name: String,

    /// Which series to fit and draw.
    #[arg(long, value_enum, default_value_t = SeriesSelector::Both)]
    pub which: SeriesSelector,

    /// Y-axis range: `auto` or `LO,HI`.
    #[arg(long, default_value = "-0.06,0.06", allow_hyphen_values = true)]
    pub y_range: PlotRange,

    /// Shortest period (hours) the fit may return.
    #[arg(long, default_value_t = 20.0)]
    pub min_period: f64,

    /// Longest period (hours) the fit may return.
    #[arg(long, default_value_t = 28.0)]
    pub max_period: f64,

    /// Chart title.
    #[arg(long, default_value = "")]
    pub title: String,

    /// Directory charts are written into.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Fit only; do not write charts.
    #[arg(long)]
    pub no_save: bool,

    /// Suppress the printed fit summary.
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Render an ASCII preview in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Preview width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Preview height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,

    /// Export fitted parameters, uncertainties and curves to JSON.
    #[arg(long = "export-fit", value_name = "JSON")]
    pub export_fit: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Zero-based block index.
    #[arg(short = 'b', long, default_value_t = 0)]
    pub block: usize,

    /// Also print observed vs fitted values.
    #[arg(long)]
    pub residuals: bool,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,
}

/// Options for previewing a saved fit.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Fit JSON file produced by `--export-fit`.
    #[arg(long, value_name = "JSON")]
    pub fit: PathBuf,

    /// Preview width (columns).
    #[arg(long, default_value_t = 72)]
    pub width: usize,

    /// Preview height (rows).
    #[arg(long, default_value_t = 18)]
    pub height: usize,
}

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Output CSV path.
    #[arg(short = 'o', long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of blocks to generate.
    #[arg(long, default_value_t = 3)]
    pub blocks: usize,

    /// Readings per block.
    #[arg(short = 'n', long, default_value_t = DEFAULT_READINGS)]
    pub readings: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Standard deviation of the additive noise.
    #[arg(long, default_value_t = 0.01)]
    pub noise: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::try_parse_from(["circa", "fit", "--csv", "data.csv"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.block, 0);
        assert_eq!(args.analysis.readings, 6);
        assert_eq!(args.analysis.which, SeriesSelector::Both);
        assert_eq!(args.analysis.y_range, PlotRange::Fixed { lo: -0.06, hi: 0.06 });
        assert_eq!((args.analysis.min_period, args.analysis.max_period), (20.0, 28.0));
        assert!(!args.analysis.no_save);
    }

    #[test]
    fn batch_accepts_auto_range_and_selector() {
        let cli = Cli::try_parse_from([
            "circa",
            "batch",
            "-f",
            "data.csv",
            "--y-range",
            "auto",
            "--which",
            "experimental",
            "--no-save",
        ])
        .unwrap();
        let Command::Batch(args) = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(args.analysis.y_range, PlotRange::Auto);
        assert_eq!(args.analysis.which, SeriesSelector::Experimental);
        assert!(args.analysis.no_save);
    }

    #[test]
    fn negative_range_pair_parses() {
        let cli = Cli::try_parse_from(["circa", "fit", "-f", "d.csv", "--y-range", "-1.5,2"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.analysis.y_range, PlotRange::Fixed { lo: -1.5, hi: 2.0 });
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(Cli::try_parse_from(["circa", "fit", "-f", "d.csv", "--y-range", "1,0"]).is_err());
    }
}
