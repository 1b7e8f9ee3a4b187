//! Scripted chain and key fakes shared by unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::client::{BlockSummary, ChainClient, ChainError, TransactionLookup, TransactionReceipt};
use super::signer::{check_sender, KeyResolver, SignedTransfer, SignerError, TransferSigner, UnsignedTransfer};
use crate::types::Amount;

#[derive(Default)]
struct ChainState {
    /// hash -> still pending
    txs: HashMap<String, bool>,
    nonces: HashMap<String, u64>,
    broadcasts: Vec<String>,
    lookups: usize,
    fail_broadcast: bool,
}

/// In-memory chain whose transaction states are set by the test
#[derive(Clone, Default)]
pub struct ScriptedChain {
    state: Arc<Mutex<ChainState>>,
}

impl ScriptedChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pending(&self, hash: &str) {
        self.state.lock().unwrap().txs.insert(hash.to_string(), true);
    }

    pub fn set_confirmed(&self, hash: &str) {
        self.state.lock().unwrap().txs.insert(hash.to_string(), false);
    }

    pub fn fail_broadcasts(&self) {
        self.state.lock().unwrap().fail_broadcast = true;
    }

    pub fn broadcasts(&self) -> Vec<String> {
        self.state.lock().unwrap().broadcasts.clone()
    }

    pub fn lookups(&self) -> usize {
        self.state.lock().unwrap().lookups
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    async fn balance_at(&self, _address: &str) -> Result<Amount, ChainError> {
        Ok(Amount::zero())
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockSummary, ChainError> {
        Err(ChainError::BlockNotFound(number))
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<TransactionLookup, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.lookups += 1;
        let is_pending = *state
            .txs
            .get(hash)
            .ok_or_else(|| ChainError::TxNotFound(hash.to_string()))?;

        Ok(TransactionLookup {
            hash: hash.to_string(),
            is_pending,
            block_number: if is_pending { None } else { Some(1) },
            from: String::new(),
            to: None,
            value: Amount::zero(),
        })
    }

    async fn transaction_receipt(&self, _hash: &str) -> Result<Option<TransactionReceipt>, ChainError> {
        Ok(None)
    }

    async fn suggest_gas_price(&self) -> Result<Amount, ChainError> {
        Ok(Amount::from(1_000_000_000u64))
    }

    async fn pending_nonce_at(&self, address: &str) -> Result<u64, ChainError> {
        Ok(*self.state.lock().unwrap().nonces.get(address).unwrap_or(&0))
    }

    async fn network_id(&self) -> Result<u64, ChainError> {
        Ok(1337)
    }

    async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String, ChainError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_broadcast {
            return Err(ChainError::BroadcastFailed("node unavailable".to_string()));
        }

        // Fake signers use the raw payload as the hash
        let hash = raw_tx.to_string();
        state.txs.insert(hash.clone(), true);
        state.broadcasts.push(hash.clone());
        Ok(hash)
    }
}

/// Signer producing a readable, unique payload per (from, nonce)
pub struct StaticSigner {
    address: String,
}

impl StaticSigner {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_lowercase(),
        }
    }
}

#[async_trait]
impl TransferSigner for StaticSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, transfer: &UnsignedTransfer) -> Result<SignedTransfer, SignerError> {
        check_sender(&self.address, transfer)?;
        let raw = format!(
            "0x{}-{}-{}-{}",
            transfer.from.trim_start_matches("0x"),
            transfer.to.trim_start_matches("0x"),
            transfer.nonce,
            transfer.value
        );
        Ok(SignedTransfer {
            hash: raw.clone(),
            raw,
        })
    }

    fn signer_type(&self) -> &'static str {
        "static"
    }
}

/// Keyring resolving only the listed addresses
#[derive(Default)]
pub struct StaticKeyring {
    known: Vec<String>,
}

impl StaticKeyring {
    pub fn new(addresses: &[&str]) -> Self {
        Self {
            known: addresses.iter().map(|a| a.to_lowercase()).collect(),
        }
    }
}

#[async_trait]
impl KeyResolver for StaticKeyring {
    async fn resolve(&self, address: &str) -> Result<Arc<dyn TransferSigner>, SignerError> {
        let wanted = address.to_lowercase();
        if !self.known.contains(&wanted) {
            return Err(SignerError::UnknownKey(wanted));
        }
        Ok(Arc::new(StaticSigner::new(&wanted)))
    }
}
