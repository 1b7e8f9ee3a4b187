//! Address Pool Types
//!
//! The pool document lists pre-provisioned addresses in stored order:
//!
//! ```json
//! { "accounts": [ { "address": "0x..", "mnemonic": "...", "status": "0" } ] }
//! ```
//!
//! Status `"0"` is available, `"1"` is assigned. Entries are created at
//! provisioning time and only ever toggled, never removed.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Assignment state of a pool entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    #[serde(rename = "0")]
    Available,
    #[serde(rename = "1")]
    Assigned,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Assigned => write!(f, "assigned"),
        }
    }
}

/// One pre-provisioned address
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub address: String,
    /// Recovery phrase handed to the user at registration
    pub mnemonic: String,
    pub status: AccountStatus,
}

impl PoolEntry {
    pub fn available(address: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            mnemonic: mnemonic.into(),
            status: AccountStatus::Available,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.status == AccountStatus::Assigned
    }
}

impl fmt::Debug for PoolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolEntry")
            .field("address", &self.address)
            .field("mnemonic", &"<redacted>")
            .field("status", &self.status)
            .finish()
    }
}

/// The whole pool document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDocument {
    pub accounts: Vec<PoolEntry>,
}

impl PoolDocument {
    /// Flip the first available entry (in stored order) to assigned
    pub fn assign_first_available(&mut self) -> Option<&PoolEntry> {
        let entry = self
            .accounts
            .iter_mut()
            .find(|e| e.status == AccountStatus::Available)?;

        entry.status = AccountStatus::Assigned;
        Some(entry)
    }

    /// Addresses of all assigned entries, in stored order
    pub fn assigned_addresses(&self) -> Vec<String> {
        self.accounts
            .iter()
            .filter(|e| e.is_assigned())
            .map(|e| e.address.clone())
            .collect()
    }

    /// Assigned entry holding this recovery phrase
    pub fn find_assigned_by_mnemonic(&self, mnemonic: &str) -> Option<&PoolEntry> {
        let wanted = normalize_mnemonic(mnemonic);
        self.accounts
            .iter()
            .find(|e| e.is_assigned() && normalize_mnemonic(&e.mnemonic) == wanted)
    }

    pub fn available_count(&self) -> usize {
        self.accounts.iter().filter(|e| !e.is_assigned()).count()
    }
}

/// Collapse whitespace so phrases typed with extra spaces still match
fn normalize_mnemonic(phrase: &str) -> String {
    phrase.split_whitespace().collect::<Vec<_>>().join(" ")
}
