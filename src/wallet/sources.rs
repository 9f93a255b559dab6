//! Line-delimited seed and recipient sources, plus address checks

use std::path::Path;

use cosmrs::AccountId;

use crate::error::{Error, Result};

/// Read one entry per line, trimming whitespace and skipping blank lines.
///
/// A missing file or a file with no entries is an error: a batch with an
/// empty work list is a configuration mistake, not a no-op.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let source_error = |reason: String| Error::Source {
        path: path.display().to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| source_error(e.to_string()))?;

    let lines: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if lines.is_empty() {
        return Err(source_error("no entries found".into()));
    }

    Ok(lines)
}

/// Checks that an address decodes as bech32 with a valid checksum, carries the
/// configured prefix, and holds a 20-byte account or 32-byte contract payload
#[derive(Debug, Clone)]
pub struct AddressValidator {
    prefix: String,
}

impl AddressValidator {
    pub fn new(prefix: &str) -> Result<Self> {
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return Err(Error::Config(format!("Invalid address prefix '{}'", prefix)));
        }

        Ok(Self {
            prefix: prefix.to_string(),
        })
    }

    pub fn is_valid(&self, address: &str) -> bool {
        self.validate(address).is_ok()
    }

    pub fn validate(&self, address: &str) -> Result<()> {
        let invalid = |reason: String| Error::InvalidAddress(format!("'{}': {}", address, reason));

        // bech32 accepts all-uppercase strings; node APIs and ledgers use lowercase
        if address.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(invalid("must be lowercase".into()));
        }

        let account = address
            .parse::<AccountId>()
            .map_err(|e| invalid(e.to_string()))?;

        if account.prefix() != self.prefix {
            return Err(invalid(format!("expected a {}1... address", self.prefix)));
        }

        match account.to_bytes().len() {
            20 | 32 => Ok(()),
            n => Err(invalid(format!("unexpected {}-byte payload", n))),
        }
    }
}
