//! Batch orchestration
//!
//! # Architecture
//!
//! ```text
//!   sweep:      seed_1 ─┐
//!               seed_2 ─┼──▶ BatchOrchestrator ──▶ recipient
//!               seed_n ─┘
//!
//!   distribute: sender ──▶ BatchOrchestrator ─┬──▶ recipient_1
//!                                             ├──▶ recipient_2
//!                                             └──▶ recipient_n
//!
//!   per item:   BalanceOracle ─▶ TransferPlanner ─▶ TransactionSubmitter ─▶ TransferLedger
//! ```
//!
//! Items run strictly one after another, in list order. A failing item is
//! recorded and the batch moves on; only validation and the distribute
//! preflight can stop a batch before its first item.

pub mod orchestrator;

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transfer::{Amount, TransferOutcome};

pub use orchestrator::{BatchOrchestrator, BatchSettings};

/// Direction of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchMode {
    /// Many wallets into one recipient
    Sweep,
    /// One wallet out to many recipients
    Distribute,
}

impl fmt::Display for BatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchMode::Sweep => write!(f, "sweep"),
            BatchMode::Distribute => write!(f, "distribute"),
        }
    }
}

/// Orchestrator lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Init,
    Validating,
    Processing,
    Done,
}

/// Result of one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// Position in the input list, zero-based
    pub index: usize,
    pub sender: String,
    pub recipient: String,
    /// Amount sent or attempted (planned, for dry runs); zero for other skips
    pub amount: Amount,
    pub outcome: TransferOutcome,
}

/// Result of a whole batch
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub mode: BatchMode,
    pub dry_run: bool,
    pub total_items: usize,
    pub items: Vec<ItemReport>,
}

impl BatchReport {
    pub fn new(mode: BatchMode, dry_run: bool, total_items: usize) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            mode,
            dry_run,
            total_items,
            items: Vec::with_capacity(total_items),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.count("sent")
    }

    pub fn skipped_count(&self) -> usize {
        self.count("skipped")
    }

    pub fn failed_count(&self) -> usize {
        self.count("failed")
    }

    /// Sum of all amounts that were actually broadcast
    pub fn total_sent(&self) -> Amount {
        Amount::new(
            self.items
                .iter()
                .filter_map(|item| item.outcome.sent_amount())
                .fold(0u128, |acc, amount| acc.saturating_add(amount.base_units())),
        )
    }

    fn count(&self, status: &str) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome.status() == status)
            .count()
    }
}
