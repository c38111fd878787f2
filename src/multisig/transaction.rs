//! Ledger entries for multisig wallets
//!
//! A `Transaction` is a proposed outgoing transfer/call that collects owner
//! confirmations until it is executed.

use chrono::{DateTime, Utc};
use hex::FromHexError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lifecycle state of a ledger entry
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Collecting confirmations
    Pending,
    /// Executed (terminal)
    Executed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Executed => "executed",
        }
    }
}

/// A transaction request tracked by a wallet's ledger
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    /// Position in the ledger
    pub index: usize,
    /// Destination address
    pub to: String,
    /// Amount to transfer
    pub value: u128,
    /// Opaque call payload
    pub data: Vec<u8>,
    /// Whether the transaction has been executed
    pub executed: bool,
    /// Number of owners currently confirming
    pub num_confirmations: usize,
    /// Owners currently confirming
    confirmed_by: BTreeSet<String>,
    /// Owner that submitted the request
    pub submitted_by: String,
    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
    /// Execution timestamp
    pub executed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new pending transaction
    pub fn new(index: usize, submitted_by: String, to: String, value: u128, data: Vec<u8>) -> Self {
        Self {
            index,
            to,
            value,
            data,
            executed: false,
            num_confirmations: 0,
            confirmed_by: BTreeSet::new(),
            submitted_by,
            submitted_at: Utc::now(),
            executed_at: None,
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> TransactionStatus {
        if self.executed {
            TransactionStatus::Executed
        } else {
            TransactionStatus::Pending
        }
    }

    /// Check whether an owner has confirmed this transaction
    pub fn is_confirmed_by(&self, owner: &str) -> bool {
        self.confirmed_by.contains(owner)
    }

    /// Owners currently confirming, in sorted order
    pub fn confirmed_by(&self) -> Vec<&str> {
        self.confirmed_by.iter().map(|s| s.as_str()).collect()
    }

    /// Check if enough confirmations have been collected
    pub fn has_quorum(&self, quorum: usize) -> bool {
        self.confirmed_by.len() >= quorum
    }

    /// Record a confirmation. Returns false if the owner had already confirmed.
    pub(crate) fn add_confirmation(&mut self, owner: &str) -> bool {
        if !self.confirmed_by.insert(owner.to_string()) {
            return false;
        }
        self.num_confirmations = self.confirmed_by.len();
        true
    }

    /// Remove a confirmation. Returns false if the owner had not confirmed.
    pub(crate) fn remove_confirmation(&mut self, owner: &str) -> bool {
        if !self.confirmed_by.remove(owner) {
            return false;
        }
        self.num_confirmations = self.confirmed_by.len();
        true
    }

    /// Describe the first inconsistency with ledger position `position`
    /// and the wallet's owners, if any
    pub(crate) fn integrity_error(
        &self,
        position: usize,
        is_owner: impl Fn(&str) -> bool,
    ) -> Option<String> {
        if self.index != position {
            return Some(format!("tx at position {} has index {}", position, self.index));
        }
        if self.num_confirmations != self.confirmed_by.len() {
            return Some(format!(
                "tx {} counts {} confirmations but lists {}",
                self.index,
                self.num_confirmations,
                self.confirmed_by.len()
            ));
        }
        self.confirmed_by
            .iter()
            .find(|owner| !is_owner(owner.as_str()))
            .map(|owner| format!("tx {} confirmed by non-owner {}", self.index, owner))
    }

    pub(crate) fn mark_executed(&mut self) {
        self.executed = true;
        self.executed_at = Some(Utc::now());
    }

    /// Undo `mark_executed` when the external effect fails
    pub(crate) fn unmark_executed(&mut self) {
        self.executed = false;
        self.executed_at = None;
    }

    /// Payload as a `0x`-prefixed hex string
    pub fn data_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.data))
    }
}

/// Decode a hex payload, accepting an optional `0x` prefix
pub fn parse_hex_data(data: &str) -> Result<Vec<u8>, FromHexError> {
    let digits = data
        .strip_prefix("0x")
        .or_else(|| data.strip_prefix("0X"))
        .unwrap_or(data);
    hex::decode(digits)
}
