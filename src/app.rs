//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs block analysis (single or batch)
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{AnalysisArgs, BatchArgs, Command, FitArgs, SampleArgs, ShowArgs};
use crate::data::{SampleConfig, generate_sheet, write_sheet_csv};
use crate::domain::{PeriodBounds, PlotOptions, RunConfig};
use crate::error::AppError;
use crate::fit::MIN_OBSERVATIONS;
use crate::io::{FitExport, read_fit_json, write_fit_json};
use crate::report::{BatchRow, compute_residuals, format_batch_table, format_fit_summary, format_residuals};

pub mod pipeline;

/// Entry point for the `circa` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Batch(args) => handle_batch(args),
        Command::Show(args) => handle_show(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.analysis)?;
    let run = pipeline::run_block(&config, args.block)?;
    let sampling = run.analyzer.sampling().times();

    if !config.quiet {
        println!(
            "{}",
            format_fit_summary(&config.name, args.block, config.readings, &config.bounds, &run.curves)
        );
        if args.residuals {
            for sc in &run.curves {
                let rows = compute_residuals(sampling, &run.block, sc)?;
                println!("{}", format_residuals(sc.series.label(), &rows));
            }
        }
    }

    if config.ascii_plot {
        let plot = crate::plot::render_ascii_plot(
            sampling,
            &run.block,
            &run.curves,
            config.ascii_width,
            config.ascii_height,
        );
        println!("{plot}");
    }

    if let Some(path) = &run.plot {
        if !config.quiet {
            println!("Saved {}", path.display());
        }
    }

    if let Some(path) = &config.export_fit {
        let export = FitExport::new(&config.name, &run.block, sampling, config.bounds, &run.curves);
        write_fit_json(path, &[export])?;
    }

    Ok(())
}

fn handle_batch(args: BatchArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.analysis)?;
    let runs = pipeline::run_batch(&config)?;

    if !config.quiet {
        let rows: Vec<BatchRow<'_>> = runs
            .iter()
            .map(|r| BatchRow {
                block: r.block.block,
                curves: &r.curves,
                plot: r.plot.as_deref(),
            })
            .collect();
        println!("{}", format_batch_table(&rows));
    }

    if config.ascii_plot {
        for r in &runs {
            println!("Block {}:", r.block.block);
            println!(
                "{}",
                crate::plot::render_ascii_plot(
                    r.analyzer.sampling().times(),
                    &r.block,
                    &r.curves,
                    config.ascii_width,
                    config.ascii_height,
                )
            );
        }
    }

    if let Some(path) = &config.export_fit {
        let exports: Vec<FitExport> = runs
            .iter()
            .map(|r| FitExport::new(&config.name, &r.block, r.analyzer.sampling().times(), config.bounds, &r.curves))
            .collect();
        write_fit_json(path, &exports)?;
    }

    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let exports = read_fit_json(&args.fit)?;
    if exports.is_empty() {
        return Err(AppError::input(format!("'{}' contains no fits.", args.fit.display())));
    }

    for export in &exports {
        println!("{} block {} (generated {})", export.name, export.block, export.generated.format("%Y-%m-%d %H:%M"));
        for s in &export.series {
            println!(
                "  {:<13} period={:.3} hrs  A={:.4} ± {:.4}",
                s.series.label(),
                s.fitted_period,
                s.params.amplitude,
                s.sigmas.amplitude
            );
        }
        println!("{}", crate::plot::render_ascii_plot_from_export(export, args.width, args.height));
    }
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        blocks: args.blocks,
        readings: args.readings,
        seed: args.seed,
        noise: args.noise,
    };
    let sheet = generate_sheet(&config)?;
    write_sheet_csv(&args.out, &sheet)?;
    println!(
        "Wrote {} blocks of {} readings to {}",
        sheet.blocks.len(),
        sheet.readings,
        args.out.display()
    );
    Ok(())
}

/// Resolve CLI arguments into a validated run configuration.
pub fn run_config_from_args(args: &AnalysisArgs) -> Result<RunConfig, AppError> {
    if args.readings < MIN_OBSERVATIONS {
        return Err(AppError::input(format!(
            "Readings per block must be >= {MIN_OBSERVATIONS} to fit a sinusoid with uncertainties (got {}).",
            args.readings
        )));
    }
    let bounds = PeriodBounds::new(args.min_period, args.max_period);
    if !bounds.is_valid() {
        return Err(AppError::input(format!(
            "Invalid period bounds [{}, {}]: need 0 < min <= max.",
            args.min_period, args.max_period
        )));
    }

    Ok(RunConfig {
        csv_path: args.csv.clone(),
        readings: args.readings,
        name: args.name.clone(),
        bounds,
        plot: PlotOptions {
            range: args.y_range,
            title: args.title.clone(),
            which: args.which,
            out_dir: args.out_dir.clone(),
        },
        save: !args.no_save,
        quiet: args.quiet,
        ascii_plot: args.plot,
        ascii_width: args.width,
        ascii_height: args.height,
        export_fit: args.export_fit.clone(),
    })
}
