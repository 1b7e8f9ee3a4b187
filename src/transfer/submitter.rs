//! Transfer Submission
//!
//! Builds a legacy value transfer, has it signed by the key owner, and
//! broadcasts it. Recording the transfer in a ledger is a separate step
//! so the caller picks which ledger and which type the hash belongs to.

use std::sync::Arc;
use tracing::{info, warn};

use crate::chain::{ChainClient, TransferSigner, UnsignedTransfer};
use crate::common::error::{CustodyError, Result};
use crate::common::logging::{generate_correlation_id, transfer_event, TransferFields};
use crate::storage::LedgerStore;
use crate::types::{Amount, TxType};

/// Submits transfers and appends pending records
pub struct TransferSubmitter {
    chain: Arc<dyn ChainClient>,
    ledgers: Arc<dyn LedgerStore>,
    gas_limit: u64,
    gas_premium: Amount,
}

impl TransferSubmitter {
    pub fn new(
        chain: Arc<dyn ChainClient>,
        ledgers: Arc<dyn LedgerStore>,
        gas_limit: u64,
        gas_premium: Amount,
    ) -> Self {
        Self {
            chain,
            ledgers,
            gas_limit,
            gas_premium,
        }
    }

    /// Assemble the unsigned transfer from live chain parameters
    ///
    /// Gas price is the suggested price plus the configured premium; the
    /// nonce counts the sender's pending transactions. Both addresses are
    /// lowercased before use.
    pub async fn prepare(&self, value: &Amount, from: &str, to: &str) -> Result<UnsignedTransfer> {
        let from = from.to_lowercase();
        let to = to.to_lowercase();

        if value.is_negative() {
            return Err(CustodyError::Conversion(format!(
                "cannot transfer negative amount {}",
                value
            )));
        }

        let suggested = self.chain.suggest_gas_price().await?;
        let nonce = self.chain.pending_nonce_at(&from).await?;
        let chain_id = self.chain.network_id().await?;

        Ok(UnsignedTransfer {
            from,
            to,
            value: value.clone(),
            nonce,
            gas_limit: self.gas_limit,
            gas_price: &suggested + &self.gas_premium,
            chain_id,
        })
    }

    /// Sign and broadcast a transfer of `value` wei from `from` to `to`
    ///
    /// Returns the hash reported by the node.
    pub async fn submit(
        &self,
        value: &Amount,
        from: &str,
        to: &str,
        signer: &dyn TransferSigner,
    ) -> Result<String> {
        let correlation_id = generate_correlation_id();
        let amount_wei = value.to_string();
        let fields = TransferFields {
            from,
            to,
            amount_wei: &amount_wei,
            signer: signer.signer_type(),
        };

        let result = self.sign_and_send(value, from, to, signer).await;
        let event = match &result {
            Ok(hash) => transfer_event(fields, Ok(hash.as_str())),
            Err(e) => transfer_event(fields, Err(e.to_string().as_str())),
        };
        event.with_correlation_id(correlation_id).emit();

        result
    }

    async fn sign_and_send(
        &self,
        value: &Amount,
        from: &str,
        to: &str,
        signer: &dyn TransferSigner,
    ) -> Result<String> {
        let transfer = self.prepare(value, from, to).await?;
        let signed = signer.sign(&transfer).await?;
        let hash = self.chain.send_raw_transaction(&signed.raw).await?;

        if !hash.eq_ignore_ascii_case(&signed.hash) {
            warn!(
                target: "custody::transfer",
                signed = %signed.hash,
                broadcast = %hash,
                "Node reported a different hash than the signer"
            );
        }

        Ok(hash)
    }

    /// Append a pending record to the ledger of `address`
    ///
    /// Balances are untouched until reconciliation confirms the hash.
    pub async fn record_pending(
        &self,
        address: &str,
        hash: &str,
        tx_type: TxType,
        amount: &Amount,
    ) -> Result<()> {
        if hash.trim().is_empty() {
            return Err(CustodyError::format("transaction hash is empty"));
        }
        if amount.is_negative() {
            return Err(CustodyError::Conversion(format!(
                "cannot record negative amount {}",
                amount
            )));
        }

        let _guard = self.ledgers.lock(address).await;
        let mut ledger = self.ledgers.load(address).await?;
        ledger.push_pending(hash, tx_type, amount.clone());
        self.ledgers.save(address, &ledger).await?;

        info!(
            target: "custody::ledger",
            address = %address,
            hash = %hash,
            tx_type = ?tx_type,
            amount = %amount,
            "Recorded pending transaction"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::MockChainClient;
    use crate::chain::testing::{ScriptedChain, StaticSigner};
    use crate::chain::ChainError;
    use crate::storage::MemoryLedgerStore;
    use crate::types::{Ledger, TxStatus};

    const GWEI: u64 = 1_000_000_000;

    fn submitter_with(chain: Arc<dyn ChainClient>, ledgers: MemoryLedgerStore) -> TransferSubmitter {
        TransferSubmitter::new(chain, Arc::new(ledgers), 80_000, Amount::from(5 * GWEI))
    }

    #[tokio::test]
    async fn test_prepare_uses_chain_parameters() {
        let mut chain = MockChainClient::new();
        chain
            .expect_suggest_gas_price()
            .returning(|| Ok(Amount::from(2 * GWEI)));
        chain
            .expect_pending_nonce_at()
            .returning(|address| Ok(if address == "0xa1" { 7 } else { 0 }));
        chain.expect_network_id().returning(|| Ok(15));

        let submitter = submitter_with(Arc::new(chain), MemoryLedgerStore::new());
        let transfer = submitter
            .prepare(&Amount::from(100u64), "0xA1", "0xB2")
            .await
            .unwrap();

        assert_eq!(transfer.nonce, 7);
        assert_eq!(transfer.chain_id, 15);
        assert_eq!(transfer.gas_limit, 80_000);
        assert_eq!(transfer.gas_price, Amount::from(7 * GWEI));
        assert_eq!(transfer.from, "0xa1");
        assert_eq!(transfer.to, "0xb2");
    }

    #[tokio::test]
    async fn test_submit_broadcasts_signed_payload() {
        let chain = ScriptedChain::new();
        let submitter = submitter_with(Arc::new(chain.clone()), MemoryLedgerStore::new());
        let signer = StaticSigner::new("0xa1");

        let hash = submitter
            .submit(&Amount::from(50u64), "0xa1", "0xb2", &signer)
            .await
            .unwrap();

        assert_eq!(hash, "0xa1-b2-0-50");
        assert_eq!(chain.broadcasts(), vec![hash]);
    }

    #[tokio::test]
    async fn test_submit_rejects_foreign_signer() {
        let chain = ScriptedChain::new();
        let submitter = submitter_with(Arc::new(chain.clone()), MemoryLedgerStore::new());
        let signer = StaticSigner::new("0xc3");

        let result = submitter
            .submit(&Amount::from(50u64), "0xa1", "0xb2", &signer)
            .await;

        assert!(matches!(result, Err(CustodyError::Signer(_))));
        assert!(chain.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn test_submit_surfaces_broadcast_failure() {
        let mut chain = MockChainClient::new();
        chain
            .expect_suggest_gas_price()
            .returning(|| Ok(Amount::from(GWEI)));
        chain.expect_pending_nonce_at().returning(|_| Ok(0));
        chain.expect_network_id().returning(|| Ok(1));
        chain
            .expect_send_raw_transaction()
            .times(1)
            .returning(|_| Err(ChainError::BroadcastFailed("nonce too low".to_string())));

        let submitter = submitter_with(Arc::new(chain), MemoryLedgerStore::new());
        let result = submitter
            .submit(&Amount::from(1u64), "0xa1", "0xb2", &StaticSigner::new("0xa1"))
            .await;

        assert!(matches!(result, Err(CustodyError::Chain(_))));
    }

    #[tokio::test]
    async fn test_submit_rejects_negative_value_before_chain_access() {
        let chain = MockChainClient::new();
        let submitter = submitter_with(Arc::new(chain), MemoryLedgerStore::new());
        let negative: Amount = "-5".parse().unwrap();

        let result = submitter
            .submit(&negative, "0xa1", "0xb2", &StaticSigner::new("0xa1"))
            .await;

        assert!(matches!(result, Err(CustodyError::Conversion(_))));
    }

    #[tokio::test]
    async fn test_record_pending_appends_only() {
        let ledgers = MemoryLedgerStore::new();
        let mut ledger = Ledger::empty();
        ledger.balance = Amount::from(10u64);
        ledgers.insert("0xa1", ledger).await;

        let submitter = submitter_with(Arc::new(ScriptedChain::new()), ledgers.clone());
        submitter
            .record_pending("0xa1", "0xabc", TxType::Deposit, &Amount::from(100u64))
            .await
            .unwrap();
        submitter
            .record_pending("0xa1", "0xdef", TxType::Withdrawal, &Amount::from(3u64))
            .await
            .unwrap();

        let stored = ledgers.load("0xa1").await.unwrap();
        assert_eq!(stored.balance, Amount::from(10u64));
        assert_eq!(stored.transactions.len(), 2);
        assert_eq!(stored.transactions[0].hash, "0xabc");
        assert_eq!(stored.transactions[1].tx_type, TxType::Withdrawal);
        assert!(stored.transactions.iter().all(|t| t.status == TxStatus::Pending));
    }

    #[tokio::test]
    async fn test_record_pending_concurrent_appends_survive() {
        let ledgers = MemoryLedgerStore::new();
        ledgers.insert("0xa1", Ledger::empty()).await;
        let submitter = Arc::new(submitter_with(Arc::new(ScriptedChain::new()), ledgers.clone()));

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let submitter = submitter.clone();
                tokio::spawn(async move {
                    submitter
                        .record_pending("0xa1", &format!("0x{}", i), TxType::Deposit, &Amount::from(1u64))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(ledgers.load("0xa1").await.unwrap().transactions.len(), 16);
    }

    #[tokio::test]
    async fn test_record_pending_missing_ledger() {
        let submitter = submitter_with(Arc::new(ScriptedChain::new()), MemoryLedgerStore::new());
        let result = submitter
            .record_pending("0xa1", "0xabc", TxType::Deposit, &Amount::from(1u64))
            .await;
        assert!(matches!(result, Err(CustodyError::Io(_))));
    }
}
