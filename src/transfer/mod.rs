//! Per-transfer pipeline
//!
//! ```text
//! BalanceOracle ──balance──▶ TransferPlanner ──Send(amount)──▶ TransactionSubmitter
//!                                   │
//!                                   └──Skip(reason)──▶ (no submission)
//! ```

pub mod amount;
pub mod balance;
pub mod planner;
pub mod submitter;
pub mod types;

pub use amount::{Amount, Denomination};
pub use balance::BalanceOracle;
pub use planner::{Plan, TransferPlanner};
pub use submitter::{SubmitReceipt, SubmitSettings, TransactionSubmitter};
pub use types::{SkipReason, TransferOutcome, TransferRequest};
