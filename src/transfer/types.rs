//! Transfer requests and outcomes

use std::fmt;

use super::Amount;
use super::planner::{Plan, TransferPlanner};
use crate::wallet::Wallet;

/// One batch item about to be planned. Built per item and dropped right after.
#[derive(Debug)]
pub struct TransferRequest<'a> {
    pub sender: &'a Wallet,
    pub recipient: &'a str,
    pub requested: Amount,
    pub reserve: Amount,
}

impl TransferRequest<'_> {
    /// Apply the planner rules to this request given an observed balance
    pub fn plan(&self, balance: Amount) -> Plan {
        TransferPlanner::plan(balance, self.requested, self.reserve)
    }
}

/// Why an item did not reach submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Balance does not exceed the reserve
    InsufficientBalance { balance: Amount, reserve: Amount },
    /// Requested amount was zero
    NothingToSend,
    /// Recipient failed address validation
    InvalidRecipient(String),
    /// Dry run: would have sent this much
    DryRun { planned: Amount },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientBalance { balance, reserve } => {
                write!(f, "insufficient balance ({} <= reserve {})", balance, reserve)
            }
            SkipReason::NothingToSend => write!(f, "nothing to send"),
            SkipReason::InvalidRecipient(reason) => write!(f, "invalid recipient: {}", reason),
            SkipReason::DryRun { planned } => write!(f, "dry run (would send {})", planned),
        }
    }
}

/// Final result of one batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Sent {
        amount: Amount,
        tx_hash: String,
        attempts: u32,
    },
    Skipped {
        reason: SkipReason,
    },
    Failed {
        reason: String,
        attempts: u32,
    },
}

impl TransferOutcome {
    /// Short status label used in the ledger and summaries
    pub fn status(&self) -> &'static str {
        match self {
            TransferOutcome::Sent { .. } => "sent",
            TransferOutcome::Skipped { .. } => "skipped",
            TransferOutcome::Failed { .. } => "failed",
        }
    }

    pub fn sent_amount(&self) -> Option<Amount> {
        match self {
            TransferOutcome::Sent { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            TransferOutcome::Sent { attempts, .. } | TransferOutcome::Failed { attempts, .. } => {
                *attempts
            }
            TransferOutcome::Skipped { .. } => 0,
        }
    }

    /// Transaction hash for sent items, the reason otherwise
    pub fn detail(&self) -> String {
        match self {
            TransferOutcome::Sent { tx_hash, .. } => tx_hash.clone(),
            TransferOutcome::Skipped { reason } => reason.to_string(),
            TransferOutcome::Failed { reason, .. } => reason.clone(),
        }
    }
}
