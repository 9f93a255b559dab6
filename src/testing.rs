//! Test doubles shared by the unit tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use cosmrs::AccountId;

use crate::error::{Error, Result};
use crate::node::{AccountInfo, BalanceReading, BroadcastReceipt, NodeApi, NodeStatus};
use crate::transfer::{Amount, Denomination, SubmitSettings};
use crate::wallet::{SignedTransfer, TransferMessage, TransferSigner, Wallet, WalletDeriver};

/// A checksummed `bbn1...` account address, distinct per `n`
pub fn addr(n: u8) -> String {
    AccountId::new("bbn", &[n; 20]).unwrap().to_string()
}

pub fn bbn() -> Denomination {
    Denomination::new("ubbn", "bbn", 6).unwrap()
}

/// `bbn(x)` in base units, e.g. `ubbn(0.1)` == 100_000
pub fn ubbn(display: &str) -> Amount {
    bbn().parse(&format!("{}bbn", display)).unwrap()
}

pub fn settings() -> SubmitSettings {
    SubmitSettings {
        chain_id: "bbn-test-5".into(),
        denom: "ubbn".into(),
        gas_limit: 200_000,
        fee: Amount::new(500),
        memo: String::new(),
    }
}

pub fn mock_wallet(n: u8) -> Wallet {
    let address = addr(n);
    Wallet::new(address.clone(), Box::new(MockSigner::new(address)))
}

fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// A transaction the mock chain accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandedTx {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub sequence: u64,
    pub tx_hash: String,
}

/// Scripted in-memory node
pub struct MockNode {
    url: String,
    live: bool,
    broken_balance_route: bool,
    balances: HashMap<String, Amount>,
    failing_balances: HashSet<String>,
    accounts: Mutex<HashMap<String, AccountInfo>>,
    balance_failures: AtomicU32,
    broadcast_failures: AtomicU32,
    rejections: AtomicU32,
    lost_confirmations: AtomicU32,
    balance_calls: AtomicU32,
    broadcast_calls: AtomicU32,
    landed: Mutex<Vec<LandedTx>>,
}

impl MockNode {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            live: true,
            broken_balance_route: false,
            balances: HashMap::new(),
            failing_balances: HashSet::new(),
            accounts: Mutex::new(HashMap::new()),
            balance_failures: AtomicU32::new(0),
            broadcast_failures: AtomicU32::new(0),
            rejections: AtomicU32::new(0),
            lost_confirmations: AtomicU32::new(0),
            balance_calls: AtomicU32::new(0),
            broadcast_calls: AtomicU32::new(0),
            landed: Mutex::new(Vec::new()),
        }
    }

    /// Node that refuses every connection
    pub fn down(url: &str) -> Self {
        Self {
            live: false,
            ..Self::new(url)
        }
    }

    /// Liveness works but the balance route answers with an HTML 404
    pub fn with_broken_balance_route(mut self) -> Self {
        self.broken_balance_route = true;
        self
    }

    pub fn with_balance(mut self, address: &str, amount: Amount) -> Self {
        self.balances.insert(address.to_string(), amount);
        self
    }

    pub fn with_account(self, address: &str, account_number: u64, sequence: u64) -> Self {
        self.accounts.lock().unwrap().insert(
            address.to_string(),
            AccountInfo {
                account_number,
                sequence,
            },
        );
        self
    }

    /// Balance plus an on-chain account, so the address can send
    pub fn with_funded(self, address: &str, amount: Amount) -> Self {
        let number = self.accounts.lock().unwrap().len() as u64 + 1;
        self.with_balance(address, amount).with_account(address, number, 0)
    }

    /// Balance queries for this address always time out
    pub fn with_failing_balance(mut self, address: &str) -> Self {
        self.failing_balances.insert(address.to_string());
        self
    }

    /// The next `n` balance queries time out
    pub fn with_balance_failures(self, n: u32) -> Self {
        self.balance_failures.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` broadcasts fail before reaching the chain
    pub fn with_broadcast_failures(self, n: u32) -> Self {
        self.broadcast_failures.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` broadcasts are rejected by the chain
    pub fn with_rejections(self, n: u32) -> Self {
        self.rejections.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` broadcasts land but the response never arrives
    pub fn with_lost_confirmations(self, n: u32) -> Self {
        self.lost_confirmations.store(n, Ordering::SeqCst);
        self
    }

    pub fn balance_calls(&self) -> u32 {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn broadcast_calls(&self) -> u32 {
        self.broadcast_calls.load(Ordering::SeqCst)
    }

    pub fn landed(&self) -> Vec<LandedTx> {
        self.landed.lock().unwrap().clone()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.live {
            Ok(())
        } else {
            Err(Error::Http(format!("{}: connection refused", self.url)))
        }
    }
}

#[async_trait]
impl NodeApi for MockNode {
    fn url(&self) -> &str {
        &self.url
    }

    async fn node_status(&self) -> Result<NodeStatus> {
        self.ensure_live()?;
        Ok(NodeStatus {
            network: "bbn-test-5".into(),
            version: "mock".into(),
        })
    }

    async fn balance(&self, address: &str, _denom: &str) -> Result<BalanceReading> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_live()?;

        if self.broken_balance_route {
            return Err(Error::Status {
                status: 404,
                body: "<html>Not Found</html>".into(),
            });
        }
        if self.failing_balances.contains(address) || take(&self.balance_failures) {
            return Err(Error::Http("operation timed out".into()));
        }

        Ok(match self.balances.get(address) {
            Some(amount) => BalanceReading::Amount(*amount),
            None => BalanceReading::NoAccount,
        })
    }

    async fn account(&self, address: &str) -> Result<Option<AccountInfo>> {
        self.ensure_live()?;
        Ok(self.accounts.lock().unwrap().get(address).copied())
    }

    async fn broadcast(&self, tx_bytes: &[u8]) -> Result<BroadcastReceipt> {
        self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_live()?;

        if take(&self.rejections) {
            return Err(Error::BroadcastRejected {
                code: 32,
                log: "account sequence mismatch".into(),
            });
        }
        if take(&self.broadcast_failures) {
            return Err(Error::Http("connection reset by peer".into()));
        }

        let tx = MockSigner::decode(tx_bytes)?;
        let tx_hash = {
            let mut landed = self.landed.lock().unwrap();
            let tx_hash = format!("TX{:04}", landed.len() + 1);
            landed.push(LandedTx {
                tx_hash: tx_hash.clone(),
                ..tx.clone()
            });
            tx_hash
        };

        if let Some(account) = self.accounts.lock().unwrap().get_mut(&tx.from) {
            account.sequence += 1;
        }

        if take(&self.lost_confirmations) {
            return Err(Error::Http("timed out waiting for broadcast response".into()));
        }

        Ok(BroadcastReceipt { tx_hash })
    }
}

/// Signer that encodes the transfer as plain text
pub struct MockSigner {
    address: String,
}

impl MockSigner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    fn decode(tx_bytes: &[u8]) -> Result<LandedTx> {
        let text = String::from_utf8(tx_bytes.to_vec())
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        let parts: Vec<&str> = text.split('|').collect();
        let [from, to, amount, sequence] = parts.as_slice() else {
            return Err(Error::MalformedResponse(format!("bad mock tx {}", text)));
        };

        Ok(LandedTx {
            from: from.to_string(),
            to: to.to_string(),
            amount: Amount::new(amount.parse().map_err(|_| Error::MalformedResponse(text.clone()))?),
            sequence: sequence.parse().map_err(|_| Error::MalformedResponse(text.clone()))?,
            tx_hash: String::new(),
        })
    }
}

impl TransferSigner for MockSigner {
    fn sign_transfer(&self, message: &TransferMessage<'_>) -> Result<SignedTransfer> {
        if message.from != self.address {
            return Err(Error::Signing(format!(
                "signer for {} asked to sign for {}",
                self.address, message.from
            )));
        }

        Ok(SignedTransfer {
            tx_bytes: format!(
                "{}|{}|{}|{}",
                message.from,
                message.to,
                message.amount.base_units(),
                message.account.sequence
            )
            .into_bytes(),
        })
    }
}

/// Deriver with a fixed seed → address table
pub struct MockDeriver {
    table: HashMap<String, String>,
}

impl MockDeriver {
    pub fn new(entries: &[(&str, String)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(seed, address)| (seed.to_string(), address.clone()))
                .collect(),
        }
    }
}

impl WalletDeriver for MockDeriver {
    fn derive(&self, seed_phrase: &str) -> Result<Wallet> {
        let address = self
            .table
            .get(seed_phrase)
            .ok_or_else(|| Error::Derivation("invalid mnemonic".into()))?;
        Ok(Wallet::new(address.clone(), Box::new(MockSigner::new(address.clone()))))
    }
}
