//! CSV-backed ledger file

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use tracing::debug;

use super::{LedgerEntry, TransferLedger};
use crate::error::{Error, Result};

/// Appends ledger rows to a CSV file, flushing after every row
pub struct CsvLedger {
    writer: ::csv::Writer<File>,
}

impl CsvLedger {
    /// Open `path` for appending. The header row is written only when the
    /// file is new or empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let needs_header = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::Ledger(format!("cannot open {}: {}", path.display(), e)))?;

        let writer = ::csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        debug!("Ledger opened at {} (header: {})", path.display(), needs_header);
        Ok(Self { writer })
    }
}

impl TransferLedger for CsvLedger {
    fn record(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.writer.serialize(entry)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Read the newest `limit` rows of a ledger file, newest first.
///
/// A missing file is an empty history.
pub fn read_history(path: impl AsRef<Path>, limit: usize) -> Result<Vec<LedgerEntry>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = ::csv::Reader::from_path(path)?;
    let mut entries = reader
        .deserialize::<LedgerEntry>()
        .collect::<std::result::Result<Vec<_>, _>>()?;

    entries.reverse();
    entries.truncate(limit);
    Ok(entries)
}
