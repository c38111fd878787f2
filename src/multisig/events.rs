//! Wallet events
//!
//! Every successful mutating call appends exactly one event to the wallet's
//! log. Failed calls emit nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Events emitted by a multisig wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum MultisigEvent {
    /// Funds were deposited into the wallet
    Deposit {
        sender: String,
        amount: u128,
        balance: u128,
    },
    /// An owner submitted a new transaction
    SubmitTransaction {
        index: usize,
        submitter: String,
        to: String,
        value: u128,
        data: Vec<u8>,
    },
    /// An owner confirmed a transaction
    ConfirmTransaction { index: usize, confirmer: String },
    /// An owner revoked a previous confirmation
    RevokeConfirmation { index: usize, revoker: String },
    /// A transaction reached quorum and was executed
    ExecuteTransaction { index: usize, executor: String },
}

impl MultisigEvent {
    /// Event name
    pub fn name(&self) -> &'static str {
        match self {
            MultisigEvent::Deposit { .. } => "Deposit",
            MultisigEvent::SubmitTransaction { .. } => "SubmitTransaction",
            MultisigEvent::ConfirmTransaction { .. } => "ConfirmTransaction",
            MultisigEvent::RevokeConfirmation { .. } => "RevokeConfirmation",
            MultisigEvent::ExecuteTransaction { .. } => "ExecuteTransaction",
        }
    }

    /// Ledger index the event refers to, if any
    pub fn transaction_index(&self) -> Option<usize> {
        match self {
            MultisigEvent::Deposit { .. } => None,
            MultisigEvent::SubmitTransaction { index, .. }
            | MultisigEvent::ConfirmTransaction { index, .. }
            | MultisigEvent::RevokeConfirmation { index, .. }
            | MultisigEvent::ExecuteTransaction { index, .. } => Some(*index),
        }
    }
}

/// An event together with its position in the wallet's log
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventRecord {
    /// Position in the log, starting at 0
    pub sequence: u64,
    /// When the event was emitted
    pub emitted_at: DateTime<Utc>,
    /// The event itself
    pub event: MultisigEvent,
}

/// Append-only event log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Append an event and return the stored record
    pub fn emit(&mut self, event: MultisigEvent) -> &EventRecord {
        let record = EventRecord {
            sequence: self.records.len() as u64,
            emitted_at: Utc::now(),
            event,
        };
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// All records in emission order
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Records that refer to a given ledger index
    pub fn for_transaction(&self, index: usize) -> Vec<&EventRecord> {
        self.records
            .iter()
            .filter(|r| r.event.transaction_index() == Some(index))
            .collect()
    }

    /// Most recent record
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
