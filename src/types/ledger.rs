//! Ledger Types
//!
//! A ledger belongs to exactly one address. On disk it is a flat document
//! with decimal-string balances and an append-only transaction list:
//!
//! ```json
//! {
//!   "balance": "100", "addrbalance": "100", "pendingbalance": "100",
//!   "transactions": [ { "hash": "0xabc", "type": "0", "status": "0", "amount": "50" } ]
//! }
//! ```
//!
//! `LedgerDocument` is the wire schema; `Ledger` is the validated domain
//! value the engine works on.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::amount::{Amount, AmountError};

/// Kind of transfer a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxType {
    /// User funds arriving at the user's address
    #[serde(rename = "0")]
    Deposit,
    /// Treasury paying out on behalf of the user
    #[serde(rename = "1")]
    Withdrawal,
    /// Sweep of address-resident funds into the treasury
    #[serde(rename = "2")]
    Centralize,
}

impl fmt::Display for TxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Centralize => "centralize",
        };
        write!(f, "{}", s)
    }
}

/// Chain finality of a transfer as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxStatus {
    #[serde(rename = "0")]
    Pending,
    #[serde(rename = "1")]
    Confirmed,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Confirmed => write!(f, "confirmed"),
        }
    }
}

/// Transaction entry as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDocument {
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: TxType,
    pub status: TxStatus,
    pub amount: String,
}

/// Ledger document as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDocument {
    pub balance: String,
    pub addrbalance: String,
    pub pendingbalance: String,
    #[serde(default)]
    pub transactions: Vec<TransactionDocument>,
}

/// One transfer affecting a ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub hash: String,
    pub tx_type: TxType,
    pub status: TxStatus,
    pub amount: Amount,
}

impl TransactionRecord {
    pub fn pending(hash: impl Into<String>, tx_type: TxType, amount: Amount) -> Self {
        Self {
            hash: hash.into(),
            tx_type,
            status: TxStatus::Pending,
            amount,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TxStatus::Pending
    }
}

/// Balances and history of one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ledger {
    /// Confirmed, user-facing net balance
    pub balance: Amount,
    /// Confirmed value resident at the address itself
    pub addr_balance: Amount,
    /// Provisional balance net of an outstanding withdrawal
    pub pending_balance: Amount,
    /// Chronological, append-only
    pub transactions: Vec<TransactionRecord>,
}

impl Ledger {
    /// Zero balances, no history
    pub fn empty() -> Self {
        Self {
            balance: Amount::zero(),
            addr_balance: Amount::zero(),
            pending_balance: Amount::zero(),
            transactions: Vec::new(),
        }
    }

    /// Append a pending record; balances are untouched
    pub fn push_pending(&mut self, hash: impl Into<String>, tx_type: TxType, amount: Amount) {
        self.transactions
            .push(TransactionRecord::pending(hash, tx_type, amount));
    }

    pub fn has_pending(&self) -> bool {
        self.transactions.iter().any(|t| t.is_pending())
    }

    pub fn pending_count(&self) -> usize {
        self.transactions.iter().filter(|t| t.is_pending()).count()
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<TransactionDocument> for TransactionRecord {
    type Error = AmountError;

    fn try_from(doc: TransactionDocument) -> Result<Self, Self::Error> {
        let amount = Amount::parse_non_negative(&doc.amount)
            .map_err(|e| e.in_field(format!("transaction {} amount", doc.hash)))?;

        Ok(Self {
            hash: doc.hash,
            tx_type: doc.tx_type,
            status: doc.status,
            amount,
        })
    }
}

impl From<&TransactionRecord> for TransactionDocument {
    fn from(record: &TransactionRecord) -> Self {
        Self {
            hash: record.hash.clone(),
            tx_type: record.tx_type,
            status: record.status,
            amount: record.amount.to_string(),
        }
    }
}

impl TryFrom<LedgerDocument> for Ledger {
    type Error = AmountError;

    fn try_from(doc: LedgerDocument) -> Result<Self, Self::Error> {
        let balance: Amount = doc.balance.parse().map_err(|e: AmountError| e.in_field("balance"))?;
        let addr_balance: Amount = doc
            .addrbalance
            .parse()
            .map_err(|e: AmountError| e.in_field("addrbalance"))?;
        let pending_balance: Amount = doc
            .pendingbalance
            .parse()
            .map_err(|e: AmountError| e.in_field("pendingbalance"))?;

        let transactions = doc
            .transactions
            .into_iter()
            .map(TransactionRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            balance,
            addr_balance,
            pending_balance,
            transactions,
        })
    }
}

impl From<&Ledger> for LedgerDocument {
    fn from(ledger: &Ledger) -> Self {
        Self {
            balance: ledger.balance.to_string(),
            addrbalance: ledger.addr_balance.to_string(),
            pendingbalance: ledger.pending_balance.to_string(),
            transactions: ledger.transactions.iter().map(TransactionDocument::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "balance": "100",
        "addrbalance": "100",
        "pendingbalance": "100",
        "transactions": [
            {"hash": "0xabc", "type": "0", "status": "0", "amount": "50"},
            {"hash": "0xdef", "type": "2", "status": "1", "amount": "7"}
        ]
    }"#;

    #[test]
    fn test_document_to_ledger() {
        let doc: LedgerDocument = serde_json::from_str(SAMPLE).unwrap();
        let ledger = Ledger::try_from(doc).unwrap();

        assert_eq!(ledger.balance, Amount::from(100u64));
        assert_eq!(ledger.transactions.len(), 2);
        assert_eq!(ledger.transactions[0].tx_type, TxType::Deposit);
        assert!(ledger.transactions[0].is_pending());
        assert_eq!(ledger.transactions[1].tx_type, TxType::Centralize);
        assert_eq!(ledger.pending_count(), 1);
    }

    #[test]
    fn test_wire_codes_survive_rewrite() {
        let doc: LedgerDocument = serde_json::from_str(SAMPLE).unwrap();
        let ledger = Ledger::try_from(doc.clone()).unwrap();
        let back = LedgerDocument::from(&ledger);
        assert_eq!(back, doc);

        let json = serde_json::to_value(&back).unwrap();
        assert_eq!(json["transactions"][1]["type"], "2");
        assert_eq!(json["transactions"][1]["status"], "1");
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{"balance": "1", "addrbalance": "1", "transactions": []}"#;
        assert!(serde_json::from_str::<LedgerDocument>(json).is_err());

        let json = r#"{"balance": "1", "addrbalance": "1", "pendingbalance": "1"}"#;
        let doc: LedgerDocument = serde_json::from_str(json).unwrap();
        assert!(doc.transactions.is_empty());
    }

    #[test]
    fn test_bad_amount_names_field() {
        let mut doc: LedgerDocument = serde_json::from_str(SAMPLE).unwrap();
        doc.addrbalance = "12x".to_string();
        let err = Ledger::try_from(doc).unwrap_err();
        assert!(err.to_string().starts_with("addrbalance"));
    }

    #[test]
    fn test_negative_record_amount_rejected() {
        let mut doc: LedgerDocument = serde_json::from_str(SAMPLE).unwrap();
        doc.transactions[0].amount = "-5".to_string();
        assert!(Ledger::try_from(doc).is_err());
    }

    #[test]
    fn test_push_pending_leaves_balances() {
        let mut ledger = Ledger::empty();
        ledger.push_pending("0x1", TxType::Withdrawal, Amount::from(5u64));
        assert!(ledger.has_pending());
        assert!(ledger.balance.is_zero());
        assert!(ledger.pending_balance.is_zero());
    }
}
