//! Cosmos Batch Transfer Library
//!
//! Sweeps many wallets into one address, or distributes from one wallet to
//! many, through the REST API of a Cosmos-SDK node.

pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod node;
pub mod retry;
pub mod transfer;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
