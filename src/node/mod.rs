//! Node API access
//!
//! Everything the pipeline needs from a chain node goes through [`NodeApi`]:
//! a liveness check, a balance-by-denom read, the account lookup needed for
//! signing, and the broadcast route.
//!
//! # Architecture
//!
//! ```text
//! EndpointSelector ──probe──▶ RestClient (per candidate URL)
//!        │
//!        └──▶ SelectedEndpoint { endpoint, client: Arc<N> } ──▶ BalanceOracle
//!                                                         └──▶ TransactionSubmitter
//! ```

pub mod endpoint;
pub mod rest;

use async_trait::async_trait;

use crate::error::Result;
use crate::transfer::Amount;

pub use endpoint::{Endpoint, EndpointSelector, ProbeReport, SelectedEndpoint};
pub use rest::RestClient;

/// Answer to a balance query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceReading {
    /// Account exists, this much of the denom is spendable
    Amount(Amount),
    /// The node reports no such account
    NoAccount,
}

impl BalanceReading {
    /// "No account" is a zero balance, not an error
    pub fn amount(&self) -> Amount {
        match self {
            BalanceReading::Amount(amount) => *amount,
            BalanceReading::NoAccount => Amount::ZERO,
        }
    }
}

/// Account data required to sign a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account_number: u64,
    pub sequence: u64,
}

/// Node identity returned by the liveness route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatus {
    pub network: String,
    pub version: String,
}

/// Result of an accepted broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReceipt {
    pub tx_hash: String,
}

/// Remote node capability used by the transfer pipeline
#[async_trait]
pub trait NodeApi: Send + Sync {
    /// Base URL this client talks to
    fn url(&self) -> &str;

    /// Liveness check
    async fn node_status(&self) -> Result<NodeStatus>;

    /// Spendable balance of `address` in `denom`
    async fn balance(&self, address: &str, denom: &str) -> Result<BalanceReading>;

    /// Account number and sequence, `None` when the account does not exist yet
    async fn account(&self, address: &str) -> Result<Option<AccountInfo>>;

    /// Submit signed transaction bytes. A non-zero response code is an error.
    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<BroadcastReceipt>;
}
