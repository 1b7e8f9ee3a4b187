//! Ledger Reconciliation
//!
//! Walks the pending records of a ledger in stored order, asks the chain
//! whether each one has landed, and folds the confirmed ones into the
//! balances. Records are never removed; a confirmed record is never
//! applied twice because only pending records are examined.
//!
//! Balance effects of a newly confirmed record:
//!
//! | type       | balance | addr_balance |
//! |------------|---------|--------------|
//! | deposit    | +amount | +amount      |
//! | withdrawal | -amount | -amount      |
//! | centralize |         | -amount      |

use futures_util::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::info;

use crate::chain::ChainClient;
use crate::common::error::Result;
use crate::common::logging::ledger_event;
use crate::storage::{LedgerStore, PoolStore};
use crate::types::{Amount, Ledger, TxStatus, TxType};

/// Chain verdict for one pending record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finality {
    Confirmed,
    Pending,
}

/// What one fold changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldSummary {
    pub confirmed: usize,
    pub still_pending: usize,
}

/// Balances of one address after reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub address: String,
    pub addr_balance: Amount,
    pub pending_balance: Amount,
    pub confirmed: usize,
    pub still_pending: usize,
}

/// Fold chain verdicts into a ledger
///
/// `verdicts[i]` belongs to the i-th pending record in stored order. A
/// record with no verdict is left pending.
///
/// While any record stays pending, each pending withdrawal sets
/// `pending_balance` to `balance - amount`, with `balance` as it stands at
/// that point of the walk; the last such withdrawal wins. Once nothing is
/// pending, `pending_balance` equals `balance`.
pub fn apply_finality(ledger: &mut Ledger, verdicts: &[Finality]) -> FoldSummary {
    let mut summary = FoldSummary::default();
    let mut verdicts = verdicts.iter();

    for record in ledger.transactions.iter_mut().filter(|t| t.is_pending()) {
        match verdicts.next().copied().unwrap_or(Finality::Pending) {
            Finality::Confirmed => {
                record.status = TxStatus::Confirmed;
                summary.confirmed += 1;
                match record.tx_type {
                    TxType::Deposit => {
                        ledger.balance += &record.amount;
                        ledger.addr_balance += &record.amount;
                    }
                    TxType::Withdrawal => {
                        ledger.balance -= &record.amount;
                        ledger.addr_balance -= &record.amount;
                    }
                    TxType::Centralize => {
                        ledger.addr_balance -= &record.amount;
                    }
                }
            }
            Finality::Pending => {
                summary.still_pending += 1;
                if record.tx_type == TxType::Withdrawal {
                    ledger.pending_balance = &ledger.balance - &record.amount;
                }
            }
        }
    }

    if summary.still_pending == 0 {
        ledger.pending_balance = ledger.balance.clone();
    }

    summary
}

/// Reconciles ledgers against chain state
pub struct Reconciler {
    chain: Arc<dyn ChainClient>,
    ledgers: Arc<dyn LedgerStore>,
    pool: Arc<dyn PoolStore>,
    concurrency: usize,
}

impl Reconciler {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        ledgers: Arc<dyn LedgerStore>,
        pool: Arc<dyn PoolStore>,
        concurrency: usize,
    ) -> Self {
        Self {
            chain,
            ledgers,
            pool,
            concurrency: concurrency.max(1),
        }
    }

    /// Reconcile one address and persist its ledger
    ///
    /// The ledger guard is held from load to save. Any lookup or storage
    /// failure aborts the pass and leaves the stored ledger untouched.
    pub async fn reconcile(&self, address: &str) -> Result<ReconcileOutcome> {
        let _guard = self.ledgers.lock(address).await;
        let mut ledger = self.ledgers.load(address).await?;

        let mut verdicts = Vec::with_capacity(ledger.pending_count());
        for record in ledger.transactions.iter().filter(|t| t.is_pending()) {
            let lookup = self.chain.transaction_by_hash(&record.hash).await?;
            verdicts.push(if lookup.is_pending {
                Finality::Pending
            } else {
                Finality::Confirmed
            });
        }

        let summary = apply_finality(&mut ledger, &verdicts);
        self.ledgers.save(address, &ledger).await?;

        ledger_event(
            address,
            summary.confirmed,
            summary.still_pending,
            &ledger.addr_balance.to_string(),
            &ledger.pending_balance.to_string(),
        )
        .emit();

        Ok(ReconcileOutcome {
            address: address.to_lowercase(),
            addr_balance: ledger.addr_balance,
            pending_balance: ledger.pending_balance,
            confirmed: summary.confirmed,
            still_pending: summary.still_pending,
        })
    }

    /// Reconcile every assigned address
    ///
    /// Returns the outcomes whose `addr_balance` is non-zero, in pool
    /// order. At most `concurrency` addresses are in flight; the first
    /// failure aborts the batch.
    pub async fn reconcile_all(&self) -> Result<Vec<ReconcileOutcome>> {
        let addresses = self.pool.load().await?.assigned_addresses();
        let total = addresses.len();

        let outcomes: Vec<ReconcileOutcome> = stream::iter(addresses)
            .map(|address| async move { self.reconcile(&address).await })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let funded: Vec<ReconcileOutcome> = outcomes
            .into_iter()
            .filter(|o| !o.addr_balance.is_zero())
            .collect();

        info!(
            target: "custody::ledger",
            reconciled = total,
            funded = funded.len(),
            "Reconciled all assigned ledgers"
        );

        Ok(funded)
    }
}
