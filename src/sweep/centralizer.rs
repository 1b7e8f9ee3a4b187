//! Centralization Sweep
//!
//! Moves funds resting at user addresses into the treasury address.
//!
//! # Flow:
//! 1. Reconcile every assigned ledger
//! 2. For each address whose `addr_balance` is non-zero, resolve its key
//! 3. Transfer `addr_balance` to the treasury
//! 4. Record a pending centralize entry in that address's ledger
//!
//! The recorded amount is the address's `pending_balance`, not the swept
//! value. The two differ while a withdrawal is outstanding, and the
//! difference shows up in `addr_balance` once the sweep is confirmed.
//!
//! The first failure stops the run. Addresses swept before it keep their
//! broadcast transfers and their pending records.

use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::KeyResolver;
use crate::common::error::{CustodyError, Result};
use crate::common::logging::{generate_correlation_id, sweep_event};
use crate::ledger::{ReconcileOutcome, Reconciler};
use crate::transfer::TransferSubmitter;
use crate::types::{Amount, TxType};

/// One address moved to the treasury
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepEntry {
    pub address: String,
    /// Value transferred on chain
    pub swept: Amount,
    /// Amount written to the centralize record
    pub recorded: Amount,
    pub hash: String,
}

/// Result of one centralization run
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub run_id: String,
    pub treasury: String,
    pub entries: Vec<SweepEntry>,
}

impl SweepReport {
    /// Total value sent to the treasury
    pub fn total_swept(&self) -> Amount {
        self.entries
            .iter()
            .fold(Amount::zero(), |acc, e| &acc + &e.swept)
    }
}

/// Sweeps funded user addresses into the treasury
pub struct Centralizer {
    reconciler: Arc<Reconciler>,
    submitter: Arc<TransferSubmitter>,
    keys: Arc<dyn KeyResolver>,
}

impl Centralizer {
    pub fn new(
        reconciler: Arc<Reconciler>,
        submitter: Arc<TransferSubmitter>,
        keys: Arc<dyn KeyResolver>,
    ) -> Self {
        Self {
            reconciler,
            submitter,
            keys,
        }
    }

    /// Run one sweep into `treasury`
    pub async fn centralize(&self, treasury: &str) -> Result<SweepReport> {
        let mut report = SweepReport {
            run_id: generate_correlation_id(),
            treasury: treasury.to_lowercase(),
            entries: Vec::new(),
        };

        match self.sweep_into(&mut report).await {
            Ok(()) => {
                sweep_event(&report.run_id, report.entries.len(), None).emit();
                info!(
                    target: "custody::sweep",
                    run_id = %report.run_id,
                    swept = report.entries.len(),
                    total = %report.total_swept(),
                    "Centralization complete"
                );
                Ok(report)
            }
            Err(e) => {
                sweep_event(&report.run_id, report.entries.len(), Some(&e.to_string())).emit();
                Err(e)
            }
        }
    }

    async fn sweep_into(&self, report: &mut SweepReport) -> Result<()> {
        let funded = self.reconciler.reconcile_all().await?;

        for outcome in funded {
            let entry = self.sweep_one(&outcome, &report.treasury).await?;
            report.entries.push(entry);
        }

        Ok(())
    }

    async fn sweep_one(&self, outcome: &ReconcileOutcome, treasury: &str) -> Result<SweepEntry> {
        // Must fail before anything is broadcast
        if outcome.pending_balance.is_negative() {
            warn!(
                target: "custody::sweep",
                address = %outcome.address,
                pending_balance = %outcome.pending_balance,
                "Refusing to sweep address with negative pending balance"
            );
            return Err(CustodyError::Conversion(format!(
                "negative pending balance {} at {}",
                outcome.pending_balance, outcome.address
            )));
        }

        let signer = self.keys.resolve(&outcome.address).await?;
        let hash = self
            .submitter
            .submit(&outcome.addr_balance, &outcome.address, treasury, signer.as_ref())
            .await?;

        self.submitter
            .record_pending(
                &outcome.address,
                &hash,
                TxType::Centralize,
                &outcome.pending_balance,
            )
            .await?;

        Ok(SweepEntry {
            address: outcome.address.clone(),
            swept: outcome.addr_balance.clone(),
            recorded: outcome.pending_balance.clone(),
            hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::{ScriptedChain, StaticKeyring};
    use crate::storage::{LedgerStore, MemoryLedgerStore, MemoryPoolStore};
    use crate::types::{AccountStatus, Ledger, PoolDocument, PoolEntry, TxStatus};

    const TREASURY: &str = "0xc0093215bec3cbb9522352dcb4e3fa8fd5b665d1";

    struct Harness {
        centralizer: Centralizer,
        chain: ScriptedChain,
        ledgers: MemoryLedgerStore,
    }

    fn harness(addresses: &[&str], keys: &[&str]) -> Harness {
        let accounts = addresses
            .iter()
            .map(|a| PoolEntry {
                address: a.to_string(),
                mnemonic: format!("phrase {}", a),
                status: AccountStatus::Assigned,
            })
            .collect();
        let chain = ScriptedChain::new();
        let ledgers = MemoryLedgerStore::new();
        let pool = MemoryPoolStore::with_pool(PoolDocument { accounts });

        let reconciler = Arc::new(Reconciler::new(
            Arc::new(chain.clone()),
            Arc::new(ledgers.clone()),
            Arc::new(pool),
            4,
        ));
        let submitter = Arc::new(TransferSubmitter::new(
            Arc::new(chain.clone()),
            Arc::new(ledgers.clone()),
            80_000,
            Amount::zero(),
        ));
        let centralizer = Centralizer::new(reconciler, submitter, Arc::new(StaticKeyring::new(keys)));

        Harness {
            centralizer,
            chain,
            ledgers,
        }
    }

    fn funded(value: u64) -> Ledger {
        let mut ledger = Ledger::empty();
        ledger.balance = Amount::from(value);
        ledger.addr_balance = Amount::from(value);
        ledger.pending_balance = Amount::from(value);
        ledger
    }

    #[tokio::test]
    async fn test_sweeps_funded_addresses_only() {
        let h = harness(&["0xa1", "0xa2"], &["0xa1", "0xa2"]);
        h.ledgers.insert("0xa1", funded(50)).await;
        h.ledgers.insert("0xa2", Ledger::empty()).await;

        let report = h.centralizer.centralize(TREASURY).await.unwrap();

        assert_eq!(report.entries.len(), 1);
        let entry = &report.entries[0];
        assert_eq!(entry.address, "0xa1");
        assert_eq!(entry.swept, Amount::from(50u64));
        assert_eq!(h.chain.broadcasts(), vec![entry.hash.clone()]);

        let ledger = h.ledgers.load("0xa1").await.unwrap();
        let record = ledger.transactions.last().unwrap();
        assert_eq!(record.tx_type, TxType::Centralize);
        assert_eq!(record.status, TxStatus::Pending);
        assert_eq!(record.amount, Amount::from(50u64));
    }

    #[tokio::test]
    async fn test_confirmed_sweep_keeps_user_balance() {
        let h = harness(&["0xa1"], &["0xa1"]);
        h.ledgers.insert("0xa1", funded(50)).await;

        let report = h.centralizer.centralize(TREASURY).await.unwrap();
        h.chain.set_confirmed(&report.entries[0].hash);

        let second = h.centralizer.centralize(TREASURY).await.unwrap();
        assert!(second.entries.is_empty());

        let ledger = h.ledgers.load("0xa1").await.unwrap();
        assert_eq!(ledger.balance, Amount::from(50u64));
        assert!(ledger.addr_balance.is_zero());
    }

    #[tokio::test]
    async fn test_records_pending_balance_not_swept_value() {
        let h = harness(&["0xa1"], &["0xa1"]);
        let mut ledger = funded(100);
        ledger.push_pending("0xw", TxType::Withdrawal, Amount::from(30u64));
        h.ledgers.insert("0xa1", ledger).await;
        h.chain.set_pending("0xw");

        let report = h.centralizer.centralize(TREASURY).await.unwrap();

        let entry = &report.entries[0];
        assert_eq!(entry.swept, Amount::from(100u64));
        assert_eq!(entry.recorded, Amount::from(70u64));
    }

    #[tokio::test]
    async fn test_unknown_key_stops_run() {
        let h = harness(&["0xa1", "0xa2"], &["0xa2"]);
        h.ledgers.insert("0xa1", funded(10)).await;
        h.ledgers.insert("0xa2", funded(20)).await;

        let result = h.centralizer.centralize(TREASURY).await;

        assert!(matches!(result, Err(CustodyError::Signer(_))));
        assert!(h.chain.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_failure_records_nothing() {
        let h = harness(&["0xa1"], &["0xa1"]);
        h.ledgers.insert("0xa1", funded(10)).await;
        h.chain.fail_broadcasts();

        let result = h.centralizer.centralize(TREASURY).await;

        assert!(matches!(result, Err(CustodyError::Chain(_))));
        assert!(h.ledgers.load("0xa1").await.unwrap().transactions.is_empty());
    }
}
