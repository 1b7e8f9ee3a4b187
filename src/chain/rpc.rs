//! Ethereum JSON-RPC Client
//!
//! Minimal JSON-RPC 2.0 client over HTTP covering the calls the custody
//! engine needs: transaction lookups, gas price, nonces, broadcast and
//! node-side signing of keystore accounts.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::client::{BlockSummary, ChainClient, ChainError, TransactionLookup, TransactionReceipt};
use crate::types::Amount;

/// Default endpoint of a local development node
pub const LOCAL_URL: &str = "http://localhost:8545";

/// JSON-RPC HTTP client
#[derive(Debug, Clone)]
pub struct EthRpcClient {
    client: Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTransaction {
    hash: String,
    block_number: Option<String>,
    from: String,
    to: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcBlock {
    number: Option<String>,
    hash: Option<String>,
    #[serde(default)]
    transactions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RpcSignedTransaction {
    raw: String,
    tx: RpcSignedTxBody,
}

#[derive(Debug, Deserialize)]
struct RpcSignedTxBody {
    hash: String,
}

impl EthRpcClient {
    /// Create a new client with custom URL
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Create a client for a local node
    pub fn local() -> Self {
        Self::new(LOCAL_URL)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call a method whose result may legitimately be `null`
    async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(target: "custody::chain", method, id, "JSON-RPC call");

        let resp = self.client.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChainError::Rpc(format!("{} returned HTTP {}: {}", method, status, text)));
        }

        let envelope: RpcResponse<T> = resp.json().await?;

        if let Some(err) = envelope.error {
            return Err(ChainError::Rpc(format!(
                "{}: {} (code {})",
                method, err.message, err.code
            )));
        }

        Ok(envelope.result)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, ChainError> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| ChainError::Rpc(format!("{}: empty result", method)))
    }

    /// Accounts whose keys the node keystore holds
    pub async fn accounts(&self) -> Result<Vec<String>, ChainError> {
        let accounts: Vec<String> = self.call("eth_accounts", json!([])).await?;
        Ok(accounts.into_iter().map(|a| a.to_lowercase()).collect())
    }

    /// Sign a legacy transaction with a node-held key unlocked by `password`
    ///
    /// Returns the raw RLP and its hash.
    pub async fn sign_transaction(
        &self,
        tx: Value,
        password: &str,
    ) -> Result<(String, String), ChainError> {
        let signed: RpcSignedTransaction = self
            .call("personal_signTransaction", json!([tx, password]))
            .await?;
        Ok((signed.raw, signed.tx.hash))
    }
}

#[async_trait]
impl ChainClient for EthRpcClient {
    async fn balance_at(&self, address: &str) -> Result<Amount, ChainError> {
        let hex: String = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_amount(&hex)
    }

    async fn block_by_number(&self, number: u64) -> Result<BlockSummary, ChainError> {
        let block: RpcBlock = self
            .call_optional("eth_getBlockByNumber", json!([format!("0x{:x}", number), false]))
            .await?
            .ok_or(ChainError::BlockNotFound(number))?;

        Ok(BlockSummary {
            number: block
                .number
                .as_deref()
                .map(parse_u64)
                .transpose()?
                .unwrap_or(number),
            hash: block.hash.unwrap_or_default(),
            transactions: block.transactions,
        })
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<TransactionLookup, ChainError> {
        let tx: RpcTransaction = self
            .call_optional("eth_getTransactionByHash", json!([hash]))
            .await?
            .ok_or_else(|| ChainError::TxNotFound(hash.to_string()))?;

        let block_number = tx.block_number.as_deref().map(parse_u64).transpose()?;

        Ok(TransactionLookup {
            hash: tx.hash,
            is_pending: block_number.is_none(),
            block_number,
            from: tx.from,
            to: tx.to,
            value: parse_amount(&tx.value)?,
        })
    }

    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let receipt: Option<RpcReceipt> = self
            .call_optional("eth_getTransactionReceipt", json!([hash]))
            .await?;

        receipt
            .map(|r| -> Result<TransactionReceipt, ChainError> {
                Ok(TransactionReceipt {
                    hash: r.transaction_hash,
                    block_number: r.block_number.as_deref().map(parse_u64).transpose()?,
                    success: r.status.as_deref() == Some("0x1"),
                })
            })
            .transpose()
    }

    async fn suggest_gas_price(&self) -> Result<Amount, ChainError> {
        let hex: String = self.call("eth_gasPrice", json!([])).await?;
        parse_amount(&hex)
    }

    async fn pending_nonce_at(&self, address: &str) -> Result<u64, ChainError> {
        let hex: String = self
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_u64(&hex)
    }

    async fn network_id(&self) -> Result<u64, ChainError> {
        let id: String = self.call("net_version", json!([])).await?;
        id.trim()
            .parse()
            .map_err(|_| ChainError::ParseError(format!("invalid network id: {}", id)))
    }

    async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String, ChainError> {
        self.call("eth_sendRawTransaction", json!([raw_tx]))
            .await
            .map_err(|e| match e {
                ChainError::Rpc(msg) => ChainError::BroadcastFailed(msg),
                other => other,
            })
    }
}

/// Parse a `0x` quantity into a u64
pub fn parse_u64(hex: &str) -> Result<u64, ChainError> {
    let digits = hex
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::ParseError(format!("missing 0x prefix: {}", hex)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::ParseError(format!("invalid quantity {}: {}", hex, e)))
}

fn parse_amount(hex: &str) -> Result<Amount, ChainError> {
    Amount::from_hex_quantity(hex).map_err(|e| ChainError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_url() {
        let client = EthRpcClient::new("http://node:8545/");
        assert_eq!(client.url(), "http://node:8545");
        assert_eq!(EthRpcClient::local().url(), LOCAL_URL);
    }

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64("0x0").unwrap(), 0);
        assert_eq!(parse_u64("0x2a").unwrap(), 42);
        assert!(parse_u64("2a").is_err());
        assert!(parse_u64("0xzz").is_err());
    }

    #[test]
    fn test_pending_transaction_shape() {
        let raw = r#"{
            "hash": "0xabc",
            "blockNumber": null,
            "from": "0xa1",
            "to": "0xb2",
            "value": "0x32"
        }"#;
        let tx: RpcTransaction = serde_json::from_str(raw).unwrap();
        assert!(tx.block_number.is_none());
        assert_eq!(parse_amount(&tx.value).unwrap(), Amount::from(50u64));
    }

    #[test]
    fn test_null_result_envelope() {
        let raw = r#"{"jsonrpc":"2.0","id":1,"result":null}"#;
        let resp: RpcResponse<RpcTransaction> = serde_json::from_str(raw).unwrap();
        assert!(resp.result.is_none());
        assert!(resp.error.is_none());

        let raw = r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#;
        let resp: RpcResponse<String> = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.error.unwrap().message, "nonce too low");
    }
}
