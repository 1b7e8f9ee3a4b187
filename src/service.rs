//! Custody Service
//!
//! Operator-facing entry points. Every call takes the `Session` it acts
//! for; there is no process-wide current user.

use std::sync::Arc;
use tracing::info;

use crate::chain::{
    BlockReport, ChainClient, ChainInspector, EthRpcClient, KeyResolver, NodeKeyring,
    TransactionDetail, TransferSigner,
};
use crate::common::config::CustodyConfig;
use crate::common::error::{CustodyError, Result};
use crate::common::logging::security_event;
use crate::ledger::{ReconcileOutcome, Reconciler};
use crate::pool::{Allocation, PoolAllocator, Session};
use crate::storage::{DocumentLocks, FileLedgerStore, FilePoolStore, LedgerStore, PoolStore};
use crate::sweep::{Centralizer, SweepReport};
use crate::transfer::TransferSubmitter;
use crate::types::{Amount, TxType};

/// Custody engine wired to its collaborators
pub struct CustodyService {
    treasury: String,
    admin_password: String,
    allocator: PoolAllocator,
    reconciler: Arc<Reconciler>,
    submitter: Arc<TransferSubmitter>,
    centralizer: Centralizer,
    keys: Arc<dyn KeyResolver>,
    inspector: ChainInspector,
    withdrawals: DocumentLocks,
}

impl CustodyService {
    /// Build a service over explicit collaborators
    pub fn new(
        config: &CustodyConfig,
        chain: Arc<dyn ChainClient>,
        pool: Arc<dyn PoolStore>,
        ledgers: Arc<dyn LedgerStore>,
        keys: Arc<dyn KeyResolver>,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(
            chain.clone(),
            ledgers.clone(),
            pool.clone(),
            config.reconcile_concurrency,
        ));
        let inspector = ChainInspector::new(chain.clone());
        let submitter = Arc::new(TransferSubmitter::new(
            chain,
            ledgers.clone(),
            config.gas_limit,
            Amount::from(config.gas_premium_wei),
        ));
        let centralizer = Centralizer::new(reconciler.clone(), submitter.clone(), keys.clone());

        Self {
            treasury: config.treasury_address.to_lowercase(),
            admin_password: config.admin_password.clone(),
            allocator: PoolAllocator::new(pool, ledgers),
            reconciler,
            submitter,
            centralizer,
            keys,
            inspector,
            withdrawals: DocumentLocks::new(),
        }
    }

    /// File-backed stores, JSON-RPC node and node keystore
    pub fn from_config(config: &CustodyConfig) -> Self {
        let rpc = EthRpcClient::new(&config.rpc_url);
        let keys = NodeKeyring::new(rpc.clone(), config.keystore_password.clone());

        Self::new(
            config,
            Arc::new(rpc),
            Arc::new(FilePoolStore::new(config.pool_path())),
            Arc::new(FileLedgerStore::new(config.ledger_dir())),
            Arc::new(keys),
        )
    }

    pub fn treasury(&self) -> &str {
        &self.treasury
    }

    /// Signer for an address held by the configured keyring
    pub async fn signer_for(&self, address: &str) -> Result<Arc<dyn TransferSigner>> {
        Ok(self.keys.resolve(address).await?)
    }

    /// Assign a pool address to a new user
    pub async fn register(&self) -> Result<Allocation> {
        self.allocator.allocate().await
    }

    /// Open a user session from a recovery phrase
    pub async fn login(&self, mnemonic: &str) -> Result<Session> {
        self.allocator.login(mnemonic).await
    }

    /// Open an operator session
    pub fn login_admin(&self, password: &str) -> Result<Session> {
        if password != self.admin_password {
            security_event("admin_login", false, serde_json::json!({})).emit();
            return Err(CustodyError::unauthorized("wrong admin password"));
        }

        security_event("admin_login", true, serde_json::json!({ "treasury": self.treasury }))
            .emit();
        Ok(Session::admin(&self.treasury))
    }

    /// Reconcile the caller's ledger and return its spendable balance
    pub async fn check_balance(&self, session: &Session) -> Result<Amount> {
        let address = user_address(session)?;
        Ok(self.reconciler.reconcile(address).await?.pending_balance)
    }

    /// Deposit from an externally held key into the caller's address
    pub async fn recharge(
        &self,
        session: &Session,
        source: &dyn TransferSigner,
        value: &Amount,
    ) -> Result<String> {
        let address = user_address(session)?;

        let hash = self
            .submitter
            .submit(value, source.address(), address, source)
            .await?;
        self.submitter
            .record_pending(address, &hash, TxType::Deposit, value)
            .await?;

        Ok(hash)
    }

    /// Pay `value` from the treasury to `destination` on the caller's behalf
    ///
    /// Fails with `InsufficientFunds` when the reconciled pending balance
    /// is below `value`. Withdrawals of one user are serialized.
    pub async fn withdraw(&self, session: &Session, destination: &str, value: &Amount) -> Result<String> {
        let address = user_address(session)?;
        let _guard = self.withdrawals.acquire(address).await;

        let available = self.reconciler.reconcile(address).await?.pending_balance;
        if &available < value {
            return Err(CustodyError::InsufficientFunds {
                available: available.to_string(),
                requested: value.to_string(),
            });
        }

        let signer = self.keys.resolve(&self.treasury).await?;
        let hash = self
            .submitter
            .submit(value, &self.treasury, destination, signer.as_ref())
            .await?;
        self.submitter
            .record_pending(address, &hash, TxType::Withdrawal, value)
            .await?;

        info!(
            target: "custody::transfer",
            address = %address,
            destination = %destination,
            hash = %hash,
            "Withdrawal submitted"
        );

        Ok(hash)
    }

    /// Reconcile one address
    pub async fn reconcile(&self, address: &str) -> Result<ReconcileOutcome> {
        self.reconciler.reconcile(address).await
    }

    /// Reconcile every assigned address; funded ones are returned
    pub async fn reconcile_all(&self) -> Result<Vec<ReconcileOutcome>> {
        self.reconciler.reconcile_all().await
    }

    /// Sweep user addresses into the treasury (operators only)
    pub async fn centralize(&self, session: &Session) -> Result<SweepReport> {
        if !session.is_admin() {
            return Err(CustodyError::unauthorized("centralize requires an admin session"));
        }
        self.centralizer.centralize(&self.treasury).await
    }

    /// On-chain balance of any address
    pub async fn inspect_balance(&self, address: &str) -> Result<Amount> {
        Ok(self.inspector.balance(address).await?)
    }

    /// Transactions of one block with their receipt status
    pub async fn inspect_block(&self, number: u64) -> Result<BlockReport> {
        Ok(self.inspector.block(number).await?)
    }

    pub async fn inspect_transaction(&self, hash: &str) -> Result<TransactionDetail> {
        Ok(self.inspector.transaction(hash).await?)
    }
}

fn user_address(session: &Session) -> Result<&str> {
    if session.is_admin() {
        return Err(CustodyError::unauthorized("admin sessions have no ledger"));
    }
    Ok(session.address())
}
