//! CSV ingest and block slicing.
//!
//! A sheet holds consecutive blocks of `NN` readings separated by one spacer
//! row. Block `b` occupies data rows `[(NN+1)·b, (NN+1)·b + NN)`.
//!
//! Design goals:
//! - **Strict schema** for the four required columns (clear errors)
//! - **Strict slicing**: a block that runs past the end of the table is a range
//!   error, never a shorter block
//! - **Lazy cell parsing**: only the selected rows must be numeric, so spacer
//!   rows may be blank or carry labels

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::MeasurementBlock;
use crate::error::AppError;

/// Control Cq column.
pub const COL_CONTROL_CQ: &str = "Cq_c";
/// Control standard-error column.
pub const COL_CONTROL_SEM: &str = "SEM_c";
/// Experimental Cq column.
pub const COL_EXPERIMENTAL_CQ: &str = "Cq_e";
/// Experimental standard-error column.
pub const COL_EXPERIMENTAL_SEM: &str = "SEM_e";

const REQUIRED_COLUMNS: [&str; 4] = [COL_CONTROL_CQ, COL_CONTROL_SEM, COL_EXPERIMENTAL_CQ, COL_EXPERIMENTAL_SEM];

/// Data rows `[start, end)` covered by a block, or `None` if the row index
/// does not fit in `usize`.
pub fn block_rows(readings: usize, block: usize) -> Option<(usize, usize)> {
    let start = readings.checked_add(1)?.checked_mul(block)?;
    Some((start, start.checked_add(readings)?))
}

/// A loaded sheet: raw records plus the positions of the required columns.
#[derive(Debug, Clone)]
pub struct Sheet {
    path: PathBuf,
    records: Vec<StringRecord>,
    columns: [usize; 4],
}

impl Sheet {
    /// Read the whole table and validate the schema.
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path)
            .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| AppError::io(format!("Failed to read CSV headers: {e}")))?
            .clone();
        let header_map = build_header_map(&headers);

        let mut columns = [0usize; 4];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = *header_map
                .get(&normalize_header_name(name))
                .ok_or_else(|| AppError::io(format!("Missing required column: `{name}`")))?;
        }

        let mut records = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            // +2: records start after the header, and lines are 1-based.
            let line = idx + 2;
            let record = result.map_err(|e| AppError::io(format!("CSV parse error on line {line}: {e}")))?;
            records.push(record);
        }

        Ok(Self {
            path: path.to_path_buf(),
            records,
            columns,
        })
    }

    /// Number of data rows (header excluded).
    pub fn rows(&self) -> usize {
        self.records.len()
    }

    /// Number of complete blocks of `readings` rows the sheet holds.
    pub fn block_count(&self, readings: usize) -> usize {
        if readings == 0 || self.rows() < readings {
            return 0;
        }
        (self.rows() - readings) / (readings + 1) + 1
    }

    /// Slice block `block` of `readings` rows and parse its four columns.
    pub fn block(&self, readings: usize, block: usize) -> Result<MeasurementBlock, AppError> {
        let (start, end) = match block_rows(readings, block) {
            Some((start, end)) if end <= self.rows() => (start, end),
            _ => {
                return Err(AppError::range(format!(
                    "Block {block} of {readings} readings out of range: '{}' has {} data rows.",
                    self.path.display(),
                    self.rows()
                )));
            }
        };

        let mut out = [
            Vec::with_capacity(readings),
            Vec::with_capacity(readings),
            Vec::with_capacity(readings),
            Vec::with_capacity(readings),
        ];
        for row in start..end {
            let record = &self.records[row];
            for ((values, &col), name) in out.iter_mut().zip(&self.columns).zip(REQUIRED_COLUMNS) {
                values.push(parse_cell(record, col, name, row + 2)?);
            }
        }

        let [control_cq, control_sem, experimental_cq, experimental_sem] = out;
        Ok(MeasurementBlock {
            block,
            control_cq,
            control_sem,
            experimental_cq,
            experimental_sem,
        })
    }
}

/// Open `path` and slice one block.
pub fn load_block(path: &Path, readings: usize, block: usize) -> Result<MeasurementBlock, AppError> {
    Sheet::open(path)?.block(readings, block)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report missing columns.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_cell(record: &StringRecord, col: usize, name: &str, line: usize) -> Result<f64, AppError> {
    let raw = record.get(col).map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(AppError::io(format!("Missing `{name}` value on line {line}.")));
    }
    let v: f64 = raw
        .parse()
        .map_err(|_| AppError::io(format!("Invalid `{name}` value '{raw}' on line {line}.")))?;
    if !v.is_finite() {
        return Err(AppError::io(format!("Non-finite `{name}` value on line {line}.")));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("circa-ingest-{}-{name}.csv", std::process::id()));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    /// Two blocks of three readings; values encode `block*100 + row`.
    fn two_block_sheet() -> String {
        let mut s = String::from("Gene,Cq_c,SEM_c,Cq_e,SEM_e\n");
        for block in 0..2 {
            for row in 0..3 {
                let v = (block * 100 + row) as f64;
                s.push_str(&format!("g,{v},0.1,{},0.2\n", v + 0.5));
            }
            if block == 0 {
                s.push_str(",,,,\n");
            }
        }
        s
    }

    #[test]
    fn block_rows_are_disjoint() {
        for readings in 2..10 {
            for block in 0..20 {
                let (a0, a1) = block_rows(readings, block).unwrap();
                let (b0, b1) = block_rows(readings, block + 1).unwrap();
                assert_eq!(a1 - a0, readings);
                assert!(a1 < b0 || b1 <= a0, "blocks {block} and {} overlap", block + 1);
            }
        }
    }

    #[test]
    fn slices_consecutive_blocks() {
        let path = write_temp("two-blocks", &two_block_sheet());
        let sheet = Sheet::open(&path).unwrap();
        assert_eq!(sheet.rows(), 7);
        assert_eq!(sheet.block_count(3), 2);

        let b0 = sheet.block(3, 0).unwrap();
        assert_eq!(b0.control_cq, vec![0.0, 1.0, 2.0]);
        assert_eq!(b0.experimental_cq, vec![0.5, 1.5, 2.5]);
        assert_eq!(b0.control_sem, vec![0.1; 3]);
        assert_eq!(b0.experimental_sem, vec![0.2; 3]);

        let b1 = sheet.block(3, 1).unwrap();
        assert_eq!(b1.block, 1);
        assert_eq!(b1.control_cq, vec![100.0, 101.0, 102.0]);
        assert!(b0.control_cq.iter().all(|v| !b1.control_cq.contains(v)));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn out_of_range_block_is_a_range_error() {
        let path = write_temp("range", &two_block_sheet());
        let err = load_block(&path, 3, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);

        // Block 1 of 4 readings would need rows 5..9 but only 7 exist.
        let err = load_block(&path, 4, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn overflowing_block_index_is_a_range_error() {
        assert_eq!(block_rows(6, usize::MAX), None);
        assert_eq!(block_rows(usize::MAX, 1), None);

        // 13 rows: blocks 0 and 1 of six readings, values 1..=13.
        let mut csv = String::from("Cq_c,SEM_c,Cq_e,SEM_e\n");
        for v in 1..=13 {
            csv.push_str(&format!("{v},0.1,{v},0.1\n"));
        }
        let path = write_temp("overflow", &csv);
        let sheet = Sheet::open(&path).unwrap();

        // 7 * this index wraps to 1 in usize arithmetic.
        let wrapping = 0x6db6_db6d_b6db_6db7_usize;
        assert_eq!(7usize.wrapping_mul(wrapping), 1);
        for block in [wrapping, usize::MAX] {
            let err = sheet.block(6, block).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Range, "block {block}");
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_column_is_an_io_error() {
        let path = write_temp("schema", "Cq_c,SEM_c,Cq_e\n1,2,3\n");
        let err = Sheet::open(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.message().contains("SEM_e"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn headers_are_case_insensitive_and_bom_tolerant() {
        let path = write_temp("bom", "\u{feff}cq_c, sem_c ,CQ_E,Sem_E\n1,0.1,2,0.2\n3,0.1,4,0.2\n");
        let block = load_block(&path, 2, 0).unwrap();
        assert_eq!(block.control_cq, vec![1.0, 3.0]);
        assert_eq!(block.experimental_cq, vec![2.0, 4.0]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn blank_cell_in_block_is_reported_with_line() {
        let path = write_temp("blank", "Cq_c,SEM_c,Cq_e,SEM_e\n1,0.1,2,0.2\n,0.1,4,0.2\n");
        let err = load_block(&path, 2, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.message().contains("line 3"), "{}", err.message());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn unreadable_source_is_an_io_error() {
        let err = Sheet::open(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
