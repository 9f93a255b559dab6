//! Spendable balance lookups with bounded retry

use std::sync::Arc;

use tracing::debug;

use super::Amount;
use crate::error::{Error, Result};
use crate::node::NodeApi;
use crate::retry::{retry_fixed, RetryPolicy};

/// Reads balances in the fee denomination from the selected endpoint
pub struct BalanceOracle<N: ?Sized> {
    node: Arc<N>,
    denom: String,
    policy: RetryPolicy,
}

impl<N: NodeApi + ?Sized> BalanceOracle<N> {
    pub fn new(node: Arc<N>, denom: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            node,
            denom: denom.into(),
            policy,
        }
    }

    /// Spendable balance of `address`. A missing account reads as zero.
    ///
    /// Fails with [`Error::BalanceQueryFailed`] once the retry policy is spent.
    pub async fn balance(&self, address: &str) -> Result<Amount> {
        let reading = retry_fixed(&self.policy, "balance query", || {
            self.node.balance(address, &self.denom)
        })
        .await
        .map_err(|exhausted| Error::BalanceQueryFailed {
            attempts: exhausted.attempts,
            cause: exhausted.last_error.to_string(),
        })?;

        debug!(
            "Balance of {}: {:?} (attempt {})",
            address, reading.value, reading.attempts
        );
        Ok(reading.value.amount())
    }
}
