//! Synthetic circadian sheet generation.
//!
//! Each block holds a control and an experimental sinusoid sampled on the
//! coarse grid, with Gaussian noise and per-point SEM. Blocks are separated
//! by one spacer row, matching the layout `io::ingest` slices.

use std::fs::File;
use std::path::Path;

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{MeasurementBlock, SineParams, TimeGrid};
use crate::error::AppError;
use crate::io::{COL_CONTROL_CQ, COL_CONTROL_SEM, COL_EXPERIMENTAL_CQ, COL_EXPERIMENTAL_SEM};
use crate::models::predict;

/// Smallest SEM written, so generated sheets are always fittable with weights.
const MIN_SEM: f64 = 1e-4;

/// Periods are drawn from this range (hours), inside the default fit bounds.
const PERIOD_RANGE: (f64, f64) = (21.0, 27.0);

/// Amplitudes are drawn from this range; offsets from `±OFFSET_SPREAD`.
const AMPLITUDE_RANGE: (f64, f64) = (0.02, 0.05);
const OFFSET_SPREAD: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub blocks: usize,
    pub readings: usize,
    pub seed: u64,
    /// Standard deviation of the additive noise.
    pub noise: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            blocks: 3,
            readings: crate::domain::DEFAULT_READINGS,
            seed: 42,
            noise: 0.01,
        }
    }
}

/// One generated block and the parameters it was drawn from.
#[derive(Debug, Clone)]
pub struct SyntheticBlock {
    pub control: SineParams,
    pub experimental: SineParams,
    pub measurements: MeasurementBlock,
}


#[derive(Debug, Clone)]
pub struct SyntheticSheet {
    pub readings: usize,
    pub times: Vec<f64>,
    pub blocks: Vec<SyntheticBlock>,
}

pub fn generate_sheet(config: &SampleConfig) -> Result<SyntheticSheet, AppError> {
    if config.blocks == 0 {
        return Err(AppError::input("Block count must be > 0."));
    }
    if config.readings < 2 {
        return Err(AppError::input("Readings per block must be >= 2."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::input("Noise level must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| AppError::numerical(format!("Noise distribution error: {e}")))?;
    let grid = TimeGrid::sampling(config.readings);

    let mut blocks = Vec::with_capacity(config.blocks);
    for block in 0..config.blocks {
        let control = draw_params(&mut rng);
        let experimental = draw_params(&mut rng);

        let (control_cq, control_sem) = sample_series(&mut rng, &normal, &control, grid.times(), config.noise);
        let (experimental_cq, experimental_sem) =
            sample_series(&mut rng, &normal, &experimental, grid.times(), config.noise);

        blocks.push(SyntheticBlock {
            control,
            experimental,
            measurements: MeasurementBlock {
                block,
                control_cq,
                control_sem,
                experimental_cq,
                experimental_sem,
            },
        });
    }

    Ok(SyntheticSheet {
        readings: config.readings,
        times: grid.times().to_vec(),
        blocks,
    })
}

fn draw_params(rng: &mut StdRng) -> SineParams {
    let period = rng.gen_range(PERIOD_RANGE.0..=PERIOD_RANGE.1);
    SineParams::new(
        rng.gen_range(AMPLITUDE_RANGE.0..=AMPLITUDE_RANGE.1),
        std::f64::consts::TAU / period,
        rng.gen_range(0.0..std::f64::consts::TAU),
        rng.gen_range(-OFFSET_SPREAD..=OFFSET_SPREAD),
    )
}

fn sample_series(
    rng: &mut StdRng,
    normal: &Normal<f64>,
    params: &SineParams,
    times: &[f64],
    noise: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut values = Vec::with_capacity(times.len());
    let mut sem = Vec::with_capacity(times.len());
    for &t in times {
        let z: f64 = normal.sample(rng);
        values.push(predict(params, t) + noise * z);
        // Reported SEM scatters around the true noise level.
        let scale: f64 = rng.gen_range(0.75..1.25);
        sem.push((noise * scale).max(MIN_SEM));
    }
    (values, sem)
}

/// Write the sheet as CSV: a time column, the four measurement columns, and a
/// blank spacer row between blocks.
pub fn write_sheet_csv(path: &Path, sheet: &SyntheticSheet) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create sample CSV '{}': {e}", path.display())))?;
    let mut w = csv::Writer::from_writer(file);

    w.write_record(["time_hrs", COL_CONTROL_CQ, COL_CONTROL_SEM, COL_EXPERIMENTAL_CQ, COL_EXPERIMENTAL_SEM])
        .map_err(|e| AppError::io(format!("Failed to write sample CSV header: {e}")))?;

    for (i, b) in sheet.blocks.iter().enumerate() {
        if i > 0 {
            w.write_record(["", "", "", "", ""])
                .map_err(|e| AppError::io(format!("Failed to write sample CSV row: {e}")))?;
        }
        let m = &b.measurements;
        for (row, &t) in sheet.times.iter().enumerate() {
            w.write_record([
                t.to_string(),
                m.control_cq[row].to_string(),
                m.control_sem[row].to_string(),
                m.experimental_cq[row].to_string(),
                m.experimental_sem[row].to_string(),
            ])
            .map_err(|e| AppError::io(format!("Failed to write sample CSV row: {e}")))?;
        }
    }

    w.flush()
        .map_err(|e| AppError::io(format!("Failed to flush sample CSV '{}': {e}", path.display())))?;
    Ok(())
}
