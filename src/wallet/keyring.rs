//! BIP-39/BIP-44 key derivation and direct-mode signing
//!
//! Derives the standard Cosmos account key (`m/44'/118'/0'/0/0`) from a
//! mnemonic and signs single `MsgSend` transactions with it.

use cosmrs::bank::MsgSend;
use cosmrs::bip32::{DerivationPath, XPrv};
use cosmrs::crypto::secp256k1::SigningKey;
use cosmrs::tendermint::chain;
use cosmrs::tx::{self, Fee, Msg, SignDoc, SignerInfo};
use cosmrs::{AccountId, Coin};
use tracing::debug;
use zeroize::{ZeroizeOnDrop, Zeroizing};

use super::{SignedTransfer, TransferMessage, TransferSigner, Wallet, WalletDeriver};
use crate::error::{Error, Result};

/// Default HD path for Cosmos-SDK chains (coin type 118)
pub const COSMOS_HD_PATH: &str = "m/44'/118'/0'/0/0";

/// Derives wallets from BIP-39 mnemonics
#[derive(Debug, Clone)]
pub struct Bip44Deriver {
    prefix: String,
    path: DerivationPath,
}

impl Bip44Deriver {
    /// `prefix` is the bech32 human-readable part, e.g. "bbn"
    pub fn new(prefix: impl Into<String>, path: &str) -> Result<Self> {
        let path = path
            .parse::<DerivationPath>()
            .map_err(|e| Error::Config(format!("Invalid derivation path {}: {}", path, e)))?;

        Ok(Self {
            prefix: prefix.into(),
            path,
        })
    }
}

impl WalletDeriver for Bip44Deriver {
    fn derive(&self, seed_phrase: &str) -> Result<Wallet> {
        let mnemonic = bip39::Mnemonic::parse_normalized(seed_phrase.trim())
            .map_err(|e| Error::Derivation(format!("invalid mnemonic: {}", e)))?;
        let seed = Zeroizing::new(mnemonic.to_seed(""));

        let xprv = XPrv::derive_from_path(&*seed, &self.path)
            .map_err(|e| Error::Derivation(e.to_string()))?;
        let signer = KeySigner {
            secret: xprv.to_bytes(),
        };

        let address = signer
            .signing_key()?
            .public_key()
            .account_id(&self.prefix)
            .map_err(|e| Error::Derivation(e.to_string()))?
            .to_string();

        debug!("Derived wallet {}", address);
        Ok(Wallet::new(address, Box::new(signer)))
    }
}

/// Holds the raw secp256k1 secret; a cosmrs key is rebuilt per signature
#[derive(ZeroizeOnDrop)]
struct KeySigner {
    secret: [u8; 32],
}

impl KeySigner {
    fn signing_key(&self) -> Result<SigningKey> {
        SigningKey::from_slice(&self.secret).map_err(|e| Error::Derivation(e.to_string()))
    }
}

fn signing_error(e: impl std::fmt::Display) -> Error {
    Error::Signing(e.to_string())
}

impl TransferSigner for KeySigner {
    fn sign_transfer(&self, message: &TransferMessage<'_>) -> Result<SignedTransfer> {
        let key = self.signing_key()?;

        let from_address = message.from.parse::<AccountId>().map_err(signing_error)?;
        let to_address = message.to.parse::<AccountId>().map_err(signing_error)?;
        let amount = Coin::new(message.amount.base_units(), message.denom).map_err(signing_error)?;
        let fee_coin = Coin::new(message.fee.base_units(), message.denom).map_err(signing_error)?;

        let send = MsgSend {
            from_address,
            to_address,
            amount: vec![amount],
        }
        .to_any()
        .map_err(signing_error)?;

        let body = tx::Body::new(vec![send], message.memo, 0u32);
        let auth_info = SignerInfo::single_direct(Some(key.public_key()), message.account.sequence)
            .auth_info(Fee::from_amount_and_gas(fee_coin, message.gas_limit));

        let chain_id = message.chain_id.parse::<chain::Id>().map_err(signing_error)?;
        let sign_doc = SignDoc::new(&body, &auth_info, &chain_id, message.account.account_number)
            .map_err(signing_error)?;

        let tx_bytes = sign_doc
            .sign(&key)
            .and_then(|raw| raw.to_bytes())
            .map_err(signing_error)?;

        Ok(SignedTransfer { tx_bytes })
    }
}
