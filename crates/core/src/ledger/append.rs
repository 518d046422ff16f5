//! Durable append-only CSV files.

use std::fs::OpenOptions;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::LedgerError;

/// Appends rows of `R` to a CSV file, writing `header` first when the file is
/// new or empty. Every append is flushed and synced before returning.
#[derive(Debug, Clone)]
pub struct CsvAppendLog<R> {
    path: PathBuf,
    header: &'static [&'static str],
    _row: PhantomData<fn(&R)>,
}

impl<R: Serialize> CsvAppendLog<R> {
    pub fn new(path: impl Into<PathBuf>, header: &'static [&'static str]) -> Self {
        Self {
            path: path.into(),
            header,
            _row: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, row: &R) -> Result<(), LedgerError> {
        let io_err = |source: std::io::Error| LedgerError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        let needs_header = file.metadata().map_err(io_err)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(self.header)?;
        }
        writer.serialize(row)?;
        writer.flush().map_err(io_err)?;

        let file = writer
            .into_inner()
            .map_err(|e| io_err(e.into_error()))?;
        file.sync_data().map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::IncompleteRow;
    use crate::types::Fid;
    use tempfile::TempDir;

    #[test]
    fn test_header_written_once() {
        let temp = TempDir::new().unwrap();
        let log = CsvAppendLog::new(temp.path().join("incomplete.csv"), IncompleteRow::HEADER);

        log.append(&IncompleteRow::new(&Fid::new("1"), 5)).unwrap();
        log.append(&IncompleteRow::new(&Fid::new("2"), 7)).unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "FID,ImageCount\n1,5\n2,7\n");
    }

    #[test]
    fn test_creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let log = CsvAppendLog::new(
            temp.path().join("nested").join("incomplete.csv"),
            IncompleteRow::HEADER,
        );

        log.append(&IncompleteRow::new(&Fid::new("1"), 3)).unwrap();
        assert!(log.path().exists());
    }
}
