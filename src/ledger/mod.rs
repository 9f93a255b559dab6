//! Transfer ledger
//!
//! Append-only record of every batch item, one row per item, whatever its
//! outcome. A ledger write failure is the caller's to log; it never undoes or
//! blocks a transfer that already happened.

pub mod csv;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::batch::BatchMode;
use crate::error::Result;
use crate::transfer::TransferOutcome;

pub use self::csv::{read_history, CsvLedger};

/// One ledger row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub batch_id: Uuid,
    pub mode: BatchMode,
    pub sender: String,
    pub recipient: String,
    /// Display-unit amount, e.g. `4.9bbn`
    pub amount: String,
    /// `sent`, `skipped` or `failed`
    pub status: String,
    /// Transaction hash when sent, reason otherwise
    pub detail: String,
    pub attempts: u32,
}

impl LedgerEntry {
    pub fn new(
        batch_id: Uuid,
        mode: BatchMode,
        sender: &str,
        recipient: &str,
        amount: String,
        outcome: &TransferOutcome,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            batch_id,
            mode,
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            status: outcome.status().to_string(),
            detail: outcome.detail(),
            attempts: outcome.attempts(),
        }
    }
}

/// Destination for ledger rows
pub trait TransferLedger: Send {
    fn record(&mut self, entry: &LedgerEntry) -> Result<()>;
}

impl<T: TransferLedger + ?Sized> TransferLedger for Box<T> {
    fn record(&mut self, entry: &LedgerEntry) -> Result<()> {
        (**self).record(entry)
    }
}

/// In-memory ledger, used for dry runs
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Vec<LedgerEntry>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }
}

impl TransferLedger for MemoryLedger {
    fn record(&mut self, entry: &LedgerEntry) -> Result<()> {
        self.entries.push(entry.clone());
        Ok(())
    }
}
