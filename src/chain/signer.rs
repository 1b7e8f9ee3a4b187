//! Transfer Signing
//!
//! The `TransferSigner` trait abstracts who holds the key for an address,
//! so the engine never touches private keys. `NodeSigner` asks the node to
//! sign with an account from its keystore; `KeyResolver` maps an address
//! to the signer able to spend from it.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::rpc::EthRpcClient;
use crate::types::Amount;

/// Legacy value transfer ready for signing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransfer {
    pub from: String,
    pub to: String,
    pub value: Amount,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: Amount,
    /// EIP-155 replay protection id
    pub chain_id: u64,
}

/// Signed transfer ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    /// 0x-prefixed RLP encoding
    pub raw: String,
    pub hash: String,
}

/// Signer for transfers from one address
#[async_trait]
pub trait TransferSigner: Send + Sync {
    /// Address this signer spends from (lowercase)
    fn address(&self) -> &str;

    /// Sign a transfer; `transfer.from` must equal `address()`
    async fn sign(&self, transfer: &UnsignedTransfer) -> Result<SignedTransfer, SignerError>;

    /// Get signer type description
    fn signer_type(&self) -> &'static str;
}

/// Resolves the signer able to spend from an address
#[async_trait]
pub trait KeyResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Arc<dyn TransferSigner>, SignerError>;
}

/// Signer errors
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("no key available for {0}")]
    UnknownKey(String),

    #[error("signer for {expected} cannot sign transfer from {got}")]
    AddressMismatch { expected: String, got: String },

    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("node signing failed: {0}")]
    Node(String),
}

/// Signs with a keystore account held by the node
pub struct NodeSigner {
    rpc: EthRpcClient,
    address: String,
    password: String,
}

impl NodeSigner {
    pub fn new(rpc: EthRpcClient, address: &str, password: impl Into<String>) -> Self {
        Self {
            rpc,
            address: address.to_lowercase(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl TransferSigner for NodeSigner {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign(&self, transfer: &UnsignedTransfer) -> Result<SignedTransfer, SignerError> {
        check_sender(&self.address, transfer)?;

        let value = transfer
            .value
            .to_hex_quantity()
            .map_err(|e| SignerError::InvalidTransfer(e.to_string()))?;
        let gas_price = transfer
            .gas_price
            .to_hex_quantity()
            .map_err(|e| SignerError::InvalidTransfer(e.to_string()))?;

        let tx = json!({
            "from": transfer.from,
            "to": transfer.to,
            "value": value,
            "nonce": format!("0x{:x}", transfer.nonce),
            "gas": format!("0x{:x}", transfer.gas_limit),
            "gasPrice": gas_price,
            "chainId": format!("0x{:x}", transfer.chain_id),
        });

        let (raw, hash) = self
            .rpc
            .sign_transaction(tx, &self.password)
            .await
            .map_err(|e| SignerError::Node(e.to_string()))?;

        Ok(SignedTransfer { raw, hash })
    }

    fn signer_type(&self) -> &'static str {
        "node-keystore"
    }
}

/// Resolves any account the node keystore holds
pub struct NodeKeyring {
    rpc: EthRpcClient,
    password: String,
}

impl NodeKeyring {
    pub fn new(rpc: EthRpcClient, password: impl Into<String>) -> Self {
        Self {
            rpc,
            password: password.into(),
        }
    }
}

#[async_trait]
impl KeyResolver for NodeKeyring {
    async fn resolve(&self, address: &str) -> Result<Arc<dyn TransferSigner>, SignerError> {
        let wanted = address.to_lowercase();
        let accounts = self
            .rpc
            .accounts()
            .await
            .map_err(|e| SignerError::Node(e.to_string()))?;

        if !accounts.contains(&wanted) {
            return Err(SignerError::UnknownKey(wanted));
        }

        Ok(Arc::new(NodeSigner::new(
            self.rpc.clone(),
            &wanted,
            self.password.clone(),
        )))
    }
}

/// Reject transfers whose sender is not the signer's address
pub fn check_sender(address: &str, transfer: &UnsignedTransfer) -> Result<(), SignerError> {
    if !transfer.from.eq_ignore_ascii_case(address) {
        return Err(SignerError::AddressMismatch {
            expected: address.to_string(),
            got: transfer.from.clone(),
        });
    }
    Ok(())
}
