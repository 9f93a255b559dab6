//! CLI command implementations

use anyhow::{Context, Result};
use dialoguer::{Confirm, Password};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::batch::{BatchOrchestrator, BatchReport, BatchSettings};
use crate::config::Config;
use crate::error::Error;
use crate::ledger::{read_history, CsvLedger, MemoryLedger, TransferLedger};
use crate::node::{EndpointSelector, RestClient, SelectedEndpoint};
use crate::transfer::{BalanceOracle, Denomination};
use crate::wallet::keyring::Bip44Deriver;
use crate::wallet::sources::{read_lines, AddressValidator};
use crate::wallet::{short_address, WalletDeriver};

/// Sweep every seed wallet into `recipient`
pub async fn sweep(
    config: &Config,
    recipient: &str,
    seeds_file: Option<&str>,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let validator = AddressValidator::new(&config.chain.address_prefix)?;
    validator.validate(recipient)?;

    let seeds_path = seeds_file.unwrap_or(&config.files.seeds);
    check_seed_permissions(Path::new(seeds_path))?;
    let seeds = read_lines(Path::new(seeds_path))?;
    let deriver = Bip44Deriver::new(config.chain.address_prefix.clone(), &config.chain.hd_path)?;
    let denom = config.denomination()?;

    println!("\n=== SWEEP PLAN ===\n");
    println!("Wallets:   {} (from {})", seeds.len(), seeds_path);
    println!("Recipient: {}", recipient);
    println!("Reserve:   {} left in each wallet", denom.format(config.reserve()?));
    println!("Fee:       {} per transfer", denom.format(config.fee()?));
    if dry_run {
        println!("Mode:      DRY RUN (nothing will be broadcast)");
    }
    println!();

    if !force && !dry_run && !confirm(&format!("Sweep {} wallets into {}?", seeds.len(), recipient))? {
        info!("Sweep cancelled by user");
        return Ok(());
    }

    let selected = connect(config, recipient).await?;
    let mut orchestrator = build_orchestrator(config, selected.client, validator, dry_run)?;

    let report = orchestrator.sweep(&seeds, &deriver, recipient).await?;
    print_report(&report, &denom);

    Ok(())
}

/// Send the same amount from one wallet to every recipient
pub async fn distribute(
    config: &Config,
    sender_seed: Option<String>,
    amount: Option<&str>,
    recipients_file: Option<&str>,
    force: bool,
    dry_run: bool,
) -> Result<()> {
    let denom = config.denomination()?;
    let validator = AddressValidator::new(&config.chain.address_prefix)?;

    let amount = match amount {
        Some(raw) => denom.parse(raw)?,
        None => config
            .distribute_amount()?
            .context("No amount given: pass --amount or set transfer.distribute_amount")?,
    };

    let recipients_path = recipients_file.unwrap_or(&config.files.recipients);
    let recipients = read_lines(Path::new(recipients_path))?;

    let invalid = recipients.iter().filter(|r| !validator.is_valid(r)).count();
    if invalid > 0 {
        warn!("{} recipient(s) in {} are not valid addresses and will be skipped", invalid, recipients_path);
    }

    let seed = Zeroizing::new(match sender_seed {
        Some(seed) => seed,
        None => Password::new()
            .with_prompt("Sender seed phrase")
            .interact()
            .context("Failed to read sender seed phrase")?,
    });

    let deriver = Bip44Deriver::new(config.chain.address_prefix.clone(), &config.chain.hd_path)?;
    let sender = deriver.derive(seed.trim())?;
    drop(seed);

    let total = amount
        .checked_mul(recipients.len())
        .context("Total distribution amount overflows")?;

    println!("\n=== DISTRIBUTE PLAN ===\n");
    println!("Sender:     {}", sender.address());
    println!("Recipients: {} (from {})", recipients.len(), recipients_path);
    println!("Amount:     {} each, {} total", denom.format(amount), denom.format(total));
    println!("Reserve:    {}", denom.format(config.reserve()?));
    println!("Fee:        {} per transfer", denom.format(config.fee()?));
    if dry_run {
        println!("Mode:       DRY RUN (nothing will be broadcast)");
    }
    println!();

    if !force
        && !dry_run
        && !confirm(&format!(
            "Send {} to each of {} recipients?",
            denom.format(amount),
            recipients.len()
        ))?
    {
        info!("Distribution cancelled by user");
        return Ok(());
    }

    let selected = connect(config, sender.address()).await?;
    let mut orchestrator = build_orchestrator(config, selected.client, validator, dry_run)?;

    let report = orchestrator.distribute(&sender, &recipients, amount).await?;
    print_report(&report, &denom);

    Ok(())
}

/// Probe every configured endpoint
pub async fn health(config: &Config, address: Option<&str>) -> Result<()> {
    println!("\n=== ENDPOINT HEALTH CHECK ===\n");

    let probe_address = address
        .map(str::to_string)
        .or_else(|| config.network.probe_address.clone())
        .context("No probe address: pass --address or set network.probe_address")?;
    AddressValidator::new(&config.chain.address_prefix)?.validate(&probe_address)?;

    let selector = EndpointSelector::new(
        config.network.endpoints.clone(),
        probe_address,
        config.chain.base_denom.clone(),
    )?;
    let timeout = config.timeout();
    let reports = selector.probe_all(|url| RestClient::new(url, timeout)).await;

    let mut selected = None;
    for (i, report) in reports.iter().enumerate() {
        print!("{}. {}... ", i + 1, report.url);
        match &report.result {
            Ok(status) => {
                println!("OK ({}ms, {} {})", report.latency_ms, status.network, status.version);
                if selected.is_none() {
                    selected = Some(report.url.clone());
                }
            }
            Err(e) => println!("FAILED: {}", e),
        }
    }

    println!();
    match selected {
        Some(url) => {
            println!("Batches would use: {}", url);
            Ok(())
        }
        None => {
            error!("No healthy endpoint among {} candidates", reports.len());
            println!("No healthy endpoint. Check the errors above.");
            Err(Error::NoHealthyEndpoint { tried: reports.len() }.into())
        }
    }
}

/// Show the spendable balance of one address
pub async fn balance(config: &Config, address: &str) -> Result<()> {
    AddressValidator::new(&config.chain.address_prefix)?.validate(address)?;
    let denom = config.denomination()?;

    let selected = connect(config, address).await?;
    let oracle = BalanceOracle::new(selected.client, config.chain.base_denom.clone(), config.retry_policy());
    let balance = oracle.balance(address).await?;
    let reserve = config.reserve()?;

    println!("\n=== BALANCE ===\n");
    println!("Address:   {}", address);
    println!("Balance:   {} ({}{})", denom.format(balance), balance, denom.base);
    println!("Spendable: {} above reserve {}", denom.format(balance.saturating_sub(reserve)), denom.format(reserve));
    println!();

    Ok(())
}

/// View transfer history
pub fn history(config: &Config, limit: usize) -> Result<()> {
    println!("\n=== TRANSFER HISTORY ===\n");

    let entries = read_history(&config.files.ledger, limit)?;
    if entries.is_empty() {
        println!("No transfer history found.");
        println!();
        return Ok(());
    }

    println!(
        "{:<20} {:<11} {:<8} {:<14} {:<14} {:<14} {}",
        "DATE", "MODE", "STATUS", "AMOUNT", "FROM", "TO", "DETAIL"
    );
    println!("{}", "-".repeat(100));

    for entry in entries {
        println!(
            "{:<20} {:<11} {:<8} {:<14} {:<14} {:<14} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.mode,
            entry.status,
            entry.amount,
            short_address(&entry.sender),
            short_address(&entry.recipient),
            entry.detail
        );
    }

    println!();
    Ok(())
}

/// Show current configuration (secrets masked)
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.masked_display());
    Ok(())
}

/// Refuse seed files that group or others can read (Unix only)
fn check_seed_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        // A missing file is reported by the reader with its own message
        let Ok(metadata) = std::fs::metadata(path) else {
            return Ok(());
        };

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            anyhow::bail!(
                "Seed file {} has insecure permissions {:o}. \
                 Run 'chmod 600 {}' to fix. \
                 Refusing to sweep with group- or world-readable seeds.",
                path.display(),
                mode & 0o777,
                path.display()
            );
        }

        info!("Seed file permissions OK");
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

/// Select the first healthy endpoint, probing with `anchor` unless a probe
/// address is configured
async fn connect(config: &Config, anchor: &str) -> Result<SelectedEndpoint<RestClient>> {
    let probe_address = config
        .network
        .probe_address
        .clone()
        .unwrap_or_else(|| anchor.to_string());

    let selector = EndpointSelector::new(
        config.network.endpoints.clone(),
        probe_address,
        config.chain.base_denom.clone(),
    )?;

    let timeout = config.timeout();
    let selected = selector.select(|url| RestClient::new(url, timeout)).await?;
    println!("Using endpoint {} ({})\n", selected.endpoint.url, selected.status.network);

    Ok(selected)
}

fn build_orchestrator(
    config: &Config,
    node: Arc<RestClient>,
    validator: AddressValidator,
    dry_run: bool,
) -> Result<BatchOrchestrator<RestClient, Box<dyn TransferLedger>>> {
    let ledger: Box<dyn TransferLedger> = if dry_run {
        Box::new(MemoryLedger::new())
    } else {
        Box::new(
            CsvLedger::open(&config.files.ledger)
                .with_context(|| format!("Failed to open ledger {}", config.files.ledger))?,
        )
    };

    Ok(BatchOrchestrator::new(
        node,
        config.submit_settings()?,
        config.retry_policy(),
        validator,
        BatchSettings {
            denomination: config.denomination()?,
            reserve: config.reserve()?,
            dry_run,
        },
        ledger,
    ))
}

fn confirm(prompt: &str) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

fn print_report(report: &BatchReport, denom: &Denomination) {
    println!(
        "\n=== {} SUMMARY{} ===\n",
        report.mode.to_string().to_uppercase(),
        if report.dry_run { " (DRY RUN)" } else { "" }
    );
    println!("Batch: {}\n", report.batch_id);

    println!(
        "{:<5} {:<8} {:<14} {:<14} {:<14} {}",
        "#", "STATUS", "AMOUNT", "FROM", "TO", "DETAIL"
    );
    println!("{}", "-".repeat(80));

    for item in &report.items {
        println!(
            "{:<5} {:<8} {:<14} {:<14} {:<14} {}",
            item.index + 1,
            item.outcome.status(),
            denom.format(item.amount),
            short_address(&item.sender),
            short_address(&item.recipient),
            item.outcome.detail()
        );
    }

    println!();
    println!(
        "Sent: {}  Skipped: {}  Failed: {}  Total sent: {}",
        report.sent_count(),
        report.skipped_count(),
        report.failed_count(),
        denom.format(report.total_sent())
    );
    if report.failed_count() > 0 {
        println!("Some transfers failed. The ledger has the causes.");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{BatchMode, ItemReport};
    use crate::testing::{addr, bbn};
    use crate::transfer::{Amount, TransferOutcome};

    #[test]
    fn test_print_report_handles_every_outcome() {
        let mut report = BatchReport::new(BatchMode::Sweep, true, 2);
        report.items.push(ItemReport {
            index: 0,
            sender: addr(1),
            recipient: addr(2),
            amount: Amount::new(4_900_000),
            outcome: TransferOutcome::Failed {
                reason: "Broadcast failed after 3 attempts".into(),
                attempts: 3,
            },
        });
        report.items.push(ItemReport {
            index: 1,
            sender: "seed #2".into(),
            recipient: addr(2),
            amount: Amount::ZERO,
            outcome: TransferOutcome::Failed {
                reason: "Key derivation failed".into(),
                attempts: 0,
            },
        });

        print_report(&report, &bbn());
    }

    #[test]
    fn test_history_on_empty_ledger() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::default();
        config.files.ledger = dir.path().join("none.csv").to_string_lossy().into_owned();

        history(&config, 10).unwrap();
    }

    #[tokio::test]
    async fn test_health_without_healthy_endpoint_is_an_error() {
        let mut config = Config::default();
        config.network.endpoints = vec!["ftp://nowhere".into(), "not a url".into()];

        let err = health(&config, Some(&addr(1))).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoHealthyEndpoint { tried: 2 })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_seed_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seed.txt");
        std::fs::write(&path, "abandon\n").unwrap();

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
        let err = check_seed_permissions(&path).unwrap_err();
        assert!(err.to_string().contains("insecure permissions 644"));

        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        check_seed_permissions(&path).unwrap();

        // missing files are left to the reader
        check_seed_permissions(&dir.path().join("absent.txt")).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sweep_refuses_readable_seed_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seed.txt");
        std::fs::write(&path, "abandon\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        let config = Config::default();
        let err = sweep(&config, &addr(9), path.to_str(), true, true).await.unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));
    }
}
