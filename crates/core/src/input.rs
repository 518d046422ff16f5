//! Input point table.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::InputConfig;
use crate::log::Logger;
use crate::log_warn;
use crate::types::Point;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input table not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read input table {path}: {source}")]
    Read { path: PathBuf, source: csv::Error },
}

/// Points read from the input table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointTable {
    pub points: Vec<Point>,
    /// Rows dropped for missing columns or non-numeric coordinates.
    pub skipped_rows: usize,
}

fn parse_coordinate(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(|_| raw)
}

/// FIDs name tile and panorama files, so they must stay a single plain
/// path component.
fn is_safe_fid(fid: &str) -> bool {
    fid != "."
        && fid != ".."
        && !fid
            .chars()
            .any(|c| c == '/' || c == '\\' || c == ':' || c.is_control())
}

/// Read the point table at `path`. The first row is a header.
pub fn read_points(
    path: &Path,
    columns: &InputConfig,
    logger: &dyn Logger,
) -> Result<PointTable, InputError> {
    if !path.exists() {
        return Err(InputError::NotFound(path.to_path_buf()));
    }

    let read_err = |source: csv::Error| InputError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;

    let mut table = PointTable::default();
    for (index, record) in reader.records().enumerate() {
        // Header is line 1
        let line = index + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                log_warn!(logger, "input line {}: unreadable row: {}", line, e);
                table.skipped_rows += 1;
                continue;
            }
        };

        let fid = record
            .get(columns.fid_column)
            .map(str::trim)
            .filter(|fid| !fid.is_empty());
        let x = record.get(columns.x_column).and_then(parse_coordinate);
        let y = record.get(columns.y_column).and_then(parse_coordinate);

        match (fid, x, y) {
            (Some(fid), _, _) if !is_safe_fid(fid) => {
                log_warn!(
                    logger,
                    "input line {}: FID {:?} is not a valid file name, skipped",
                    line,
                    fid
                );
                table.skipped_rows += 1;
            }
            (Some(fid), Some(x), Some(y)) => table.points.push(Point::new(fid, x, y)),
            _ => {
                log_warn!(
                    logger,
                    "input line {}: missing FID or non-numeric coordinates, skipped",
                    line
                );
                table.skipped_rows += 1;
            }
        }
    }

    Ok(table)
}
