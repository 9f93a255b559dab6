//! Wallets and the signing boundary
//!
//! The pipeline never touches key material directly. A [`Wallet`] pairs an
//! address with an opaque [`TransferSigner`]; wallets come from a
//! [`WalletDeriver`] fed with seed phrases.
//!
//! # Architecture
//!
//! ```text
//! seed.txt ──▶ sources::read_lines ──▶ WalletDeriver ──▶ Wallet { address, signer }
//!                                                            │
//!                              TransactionSubmitter ──sign───┘
//! ```

pub mod keyring;
pub mod sources;

use std::fmt;

use crate::error::Result;
use crate::node::AccountInfo;
use crate::transfer::Amount;

pub use keyring::{Bip44Deriver, COSMOS_HD_PATH};
pub use sources::{read_lines, AddressValidator};

/// Everything a signer needs to produce one single-message bank transfer
#[derive(Debug, Clone, Copy)]
pub struct TransferMessage<'a> {
    pub chain_id: &'a str,
    pub from: &'a str,
    pub to: &'a str,
    pub amount: Amount,
    pub denom: &'a str,
    pub fee: Amount,
    pub gas_limit: u64,
    pub memo: &'a str,
    pub account: AccountInfo,
}

/// Encoded, signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub tx_bytes: Vec<u8>,
}

/// Opaque signing capability bound to one address
pub trait TransferSigner: Send + Sync {
    fn sign_transfer(&self, message: &TransferMessage<'_>) -> Result<SignedTransfer>;
}

/// Turns a seed phrase into a wallet
pub trait WalletDeriver: Send + Sync {
    fn derive(&self, seed_phrase: &str) -> Result<Wallet>;
}

/// An address plus the capability to sign for it. Never persisted.
pub struct Wallet {
    address: String,
    signer: Box<dyn TransferSigner>,
}

impl Wallet {
    pub fn new(address: impl Into<String>, signer: Box<dyn TransferSigner>) -> Self {
        Self {
            address: address.into(),
            signer,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn sign_transfer(&self, message: &TransferMessage<'_>) -> Result<SignedTransfer> {
        self.signer.sign_transfer(message)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Shorten an address for log lines: `bbn1qqqq…q7`
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 14 {
        return address.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}…{}", head, tail)
}
