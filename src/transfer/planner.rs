//! Send-amount planning
//!
//! Rules, in order:
//! 1. `balance <= reserve` → skip, nothing is submitted
//! 2. otherwise send `min(requested, balance - reserve)`
//!
//! A sweep requests the wallet's whole balance and ends up sending
//! `balance - reserve`; a distribute request is clamped to what the sender
//! can actually spare.

use super::types::SkipReason;
use super::Amount;

/// Planner decision for one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Submit exactly this much (always > 0)
    Send(Amount),
    Skip(SkipReason),
}

/// Stateless amount planner
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferPlanner;

impl TransferPlanner {
    pub fn plan(balance: Amount, requested: Amount, reserve: Amount) -> Plan {
        let Some(spendable) = balance.checked_sub(reserve).filter(|s| !s.is_zero()) else {
            return Plan::Skip(SkipReason::InsufficientBalance { balance, reserve });
        };

        let send = requested.min(spendable);
        if send.is_zero() {
            return Plan::Skip(SkipReason::NothingToSend);
        }

        Plan::Send(send)
    }
}
