//! Error types for the batch transfer pipeline

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the batch transfer pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Source file {path}: {reason}")]
    Source { path: String, reason: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    // Endpoint errors
    #[error("No healthy endpoint among {tried} candidates")]
    NoHealthyEndpoint { tried: usize },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Node returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed node response: {0}")]
    MalformedResponse(String),

    // Balance errors
    #[error("Balance query failed after {attempts} attempts: {cause}")]
    BalanceQueryFailed { attempts: u32, cause: String },

    #[error("Preflight failed: balance {balance} < needed {needed} (incl. reserve {reserve})")]
    PreconditionViolation {
        balance: String,
        needed: String,
        reserve: String,
    },

    // Transaction errors
    #[error("Account {0} not found on chain")]
    AccountNotFound(String),

    #[error("Key derivation failed: {0}")]
    Derivation(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Transaction rejected (code {code}): {log}")]
    BroadcastRejected { code: u32, log: String },

    #[error("Broadcast failed after {attempts} attempts: {cause}")]
    BroadcastFailed { attempts: u32, cause: String },

    // Ledger errors
    #[error("Ledger error: {0}")]
    Ledger(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// No endpoint can serve the run; the process exits with its own code
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::NoHealthyEndpoint { .. })
    }
}

// Conversion from reqwest errors
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from csv errors
impl From<csv::Error> for Error {
    fn from(e: csv::Error) -> Self {
        Error::Ledger(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}
