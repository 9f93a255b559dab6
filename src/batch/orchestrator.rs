//! Sweep and distribute drivers

use std::sync::Arc;

use tracing::{info, warn};

use super::{BatchMode, BatchReport, BatchState, ItemReport};
use crate::error::{Error, Result};
use crate::ledger::{LedgerEntry, TransferLedger};
use crate::node::NodeApi;
use crate::retry::RetryPolicy;
use crate::transfer::{
    Amount, BalanceOracle, Denomination, Plan, SkipReason, SubmitSettings, TransactionSubmitter,
    TransferOutcome, TransferRequest,
};
use crate::wallet::sources::AddressValidator;
use crate::wallet::{short_address, Wallet, WalletDeriver};

/// Per-batch knobs
#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub denomination: Denomination,
    /// Minimum balance left in every sending wallet
    pub reserve: Amount,
    /// Plan every item but broadcast nothing
    pub dry_run: bool,
}

/// Drives a batch through validation, per-item processing and recording
pub struct BatchOrchestrator<N: ?Sized, L> {
    oracle: BalanceOracle<N>,
    submitter: TransactionSubmitter<N>,
    validator: AddressValidator,
    settings: BatchSettings,
    ledger: L,
    state: BatchState,
}

impl<N, L> BatchOrchestrator<N, L>
where
    N: NodeApi + ?Sized,
    L: TransferLedger,
{
    pub fn new(
        node: Arc<N>,
        submit: SubmitSettings,
        policy: RetryPolicy,
        validator: AddressValidator,
        settings: BatchSettings,
        ledger: L,
    ) -> Self {
        Self {
            oracle: BalanceOracle::new(node.clone(), submit.denom.clone(), policy),
            submitter: TransactionSubmitter::new(node, submit, policy),
            validator,
            settings,
            ledger,
            state: BatchState::Init,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Move everything above the reserve from each seed's wallet to `recipient`.
    ///
    /// Fails before touching any wallet if the recipient is not a valid
    /// address or there are no seeds. Afterwards every seed yields exactly
    /// one item, in input order.
    pub async fn sweep(
        &mut self,
        seeds: &[String],
        deriver: &dyn WalletDeriver,
        recipient: &str,
    ) -> Result<BatchReport> {
        let mut report = self.begin(BatchMode::Sweep, seeds.len());

        if let Err(e) = self.validate_sweep(seeds, recipient) {
            return Err(self.abort(e));
        }

        self.transition(BatchState::Processing);

        for (index, seed) in seeds.iter().enumerate() {
            let item = match deriver.derive(seed) {
                Ok(wallet) => {
                    let (amount, outcome) = self.sweep_one(&wallet, recipient).await;
                    ItemReport {
                        index,
                        sender: wallet.address().to_string(),
                        recipient: recipient.to_string(),
                        amount,
                        outcome,
                    }
                }
                Err(e) => ItemReport {
                    index,
                    sender: format!("seed #{}", index + 1),
                    recipient: recipient.to_string(),
                    amount: Amount::ZERO,
                    outcome: failed(e),
                },
            };

            self.finish_item(&mut report, item);
        }

        self.complete(&report);
        Ok(report)
    }

    /// Send `amount` from `sender` to each recipient in order.
    ///
    /// The sender balance is read once. If it cannot cover
    /// `amount * recipients + reserve` nothing is sent and nothing is recorded.
    pub async fn distribute(
        &mut self,
        sender: &Wallet,
        recipients: &[String],
        amount: Amount,
    ) -> Result<BatchReport> {
        let mut report = self.begin(BatchMode::Distribute, recipients.len());

        let mut remaining = match self.preflight(sender, recipients, amount).await {
            Ok(balance) => balance,
            Err(e) => return Err(self.abort(e)),
        };

        self.transition(BatchState::Processing);

        for (index, recipient) in recipients.iter().enumerate() {
            let (planned, outcome) = match self.validator.validate(recipient) {
                Err(e) => (
                    Amount::ZERO,
                    TransferOutcome::Skipped {
                        reason: SkipReason::InvalidRecipient(e.to_string()),
                    },
                ),
                Ok(()) => {
                    let request = TransferRequest {
                        sender,
                        recipient,
                        requested: amount,
                        reserve: self.settings.reserve,
                    };

                    match request.plan(remaining) {
                        Plan::Skip(reason) => (Amount::ZERO, TransferOutcome::Skipped { reason }),
                        Plan::Send(send) => {
                            remaining = remaining.saturating_sub(send);
                            (send, self.send(&request, send).await)
                        }
                    }
                }
            };

            self.finish_item(
                &mut report,
                ItemReport {
                    index,
                    sender: sender.address().to_string(),
                    recipient: recipient.clone(),
                    amount: planned,
                    outcome,
                },
            );
        }

        self.complete(&report);
        Ok(report)
    }

    fn validate_sweep(&self, seeds: &[String], recipient: &str) -> Result<()> {
        self.validator.validate(recipient)?;
        if seeds.is_empty() {
            return Err(Error::Config("Seed list is empty".into()));
        }
        Ok(())
    }

    async fn preflight(&self, sender: &Wallet, recipients: &[String], amount: Amount) -> Result<Amount> {
        if recipients.is_empty() {
            return Err(Error::Config("Recipient list is empty".into()));
        }
        if amount.is_zero() {
            return Err(Error::InvalidAmount("Amount per recipient must be positive".into()));
        }

        let denom = &self.settings.denomination;
        let needed = amount
            .checked_mul(recipients.len())
            .and_then(|total| total.checked_add(self.settings.reserve))
            .ok_or_else(|| {
                Error::InvalidAmount(format!(
                    "{} x {} recipients overflows",
                    denom.format(amount),
                    recipients.len()
                ))
            })?;

        let balance = self.oracle.balance(sender.address()).await?;
        info!(
            "Preflight: sender {} holds {}, batch needs {} (incl. reserve {})",
            short_address(sender.address()),
            denom.format(balance),
            denom.format(needed),
            denom.format(self.settings.reserve)
        );

        if balance < needed {
            return Err(Error::PreconditionViolation {
                balance: denom.format(balance),
                needed: denom.format(needed),
                reserve: denom.format(self.settings.reserve),
            });
        }

        Ok(balance)
    }

    async fn sweep_one(&self, wallet: &Wallet, recipient: &str) -> (Amount, TransferOutcome) {
        let balance = match self.oracle.balance(wallet.address()).await {
            Ok(balance) => balance,
            Err(e) => return (Amount::ZERO, failed(e)),
        };

        let request = TransferRequest {
            sender: wallet,
            recipient,
            requested: balance,
            reserve: self.settings.reserve,
        };

        match request.plan(balance) {
            Plan::Skip(reason) => (Amount::ZERO, TransferOutcome::Skipped { reason }),
            Plan::Send(amount) => (amount, self.send(&request, amount).await),
        }
    }

    async fn send(&self, request: &TransferRequest<'_>, amount: Amount) -> TransferOutcome {
        if self.settings.dry_run {
            return TransferOutcome::Skipped {
                reason: SkipReason::DryRun { planned: amount },
            };
        }

        match self.submitter.submit(request.sender, request.recipient, amount).await {
            Ok(receipt) => TransferOutcome::Sent {
                amount,
                tx_hash: receipt.tx_hash,
                attempts: receipt.attempts,
            },
            Err(e) => failed(e),
        }
    }

    /// Log, record and collect one finished item
    fn finish_item(&mut self, report: &mut BatchReport, item: ItemReport) {
        let shown = self.settings.denomination.format(item.amount);
        let position = format!("[{}/{}]", item.index + 1, report.total_items);

        match &item.outcome {
            TransferOutcome::Sent { tx_hash, attempts, .. } => info!(
                "{} {} -> {}: sent {} (tx {}, attempts {})",
                position,
                short_address(&item.sender),
                short_address(&item.recipient),
                shown,
                tx_hash,
                attempts
            ),
            TransferOutcome::Skipped { reason } => info!(
                "{} {} -> {}: skipped ({})",
                position,
                short_address(&item.sender),
                short_address(&item.recipient),
                reason
            ),
            TransferOutcome::Failed { reason, attempts } => warn!(
                "{} {} -> {}: failed after {} attempts: {}",
                position,
                short_address(&item.sender),
                short_address(&item.recipient),
                attempts,
                reason
            ),
        }

        let entry = LedgerEntry::new(
            report.batch_id,
            report.mode,
            &item.sender,
            &item.recipient,
            shown,
            &item.outcome,
        );
        if let Err(e) = self.ledger.record(&entry) {
            warn!("Ledger write failed for item {}: {}", position, e);
        }

        report.items.push(item);
    }

    fn begin(&mut self, mode: BatchMode, total_items: usize) -> BatchReport {
        self.state = BatchState::Init;
        let report = BatchReport::new(mode, self.settings.dry_run, total_items);
        info!(
            "Starting {} batch {} ({} items{})",
            mode,
            report.batch_id,
            total_items,
            if self.settings.dry_run { ", dry run" } else { "" }
        );
        self.transition(BatchState::Validating);
        report
    }

    fn complete(&mut self, report: &BatchReport) {
        self.transition(BatchState::Done);
        info!(
            "Batch {} finished: {} sent, {} skipped, {} failed, total {}",
            report.batch_id,
            report.sent_count(),
            report.skipped_count(),
            report.failed_count(),
            self.settings.denomination.format(report.total_sent())
        );
    }

    fn abort(&mut self, error: Error) -> Error {
        warn!("Batch aborted before processing: {}", error);
        self.transition(BatchState::Done);
        error
    }

    fn transition(&mut self, next: BatchState) {
        info!("Batch state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Per-item failure, keeping the attempt count when the error carries one
fn failed(error: Error) -> TransferOutcome {
    let attempts = match &error {
        Error::BalanceQueryFailed { attempts, .. } | Error::BroadcastFailed { attempts, .. } => *attempts,
        _ => 0,
    };

    TransferOutcome::Failed {
        reason: error.to_string(),
        attempts,
    }
}
