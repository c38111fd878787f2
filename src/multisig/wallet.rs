//! Multi-signature wallet implementation
//!
//! A wallet holds a fixed owner set, a ledger of transaction requests and a
//! balance. Each request moves from pending to executed once the number of
//! owner confirmations reaches the quorum.

use crate::crypto::derive_address;
use crate::multisig::dispatch::{CallDispatcher, DispatchError, OutgoingCall};
use crate::multisig::events::{EventLog, EventRecord, MultisigEvent};
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::transaction::Transaction;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors related to multisig operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("not owner: {0}")]
    NotOwner(String),
    #[error("tx does not exist: {0}")]
    NotFound(usize),
    #[error("tx {0} already executed")]
    AlreadyExecuted(usize),
    #[error("tx {0} Already Confirmed")]
    AlreadyConfirmed(usize),
    #[error("tx {0} not confirmed")]
    NotConfirmed(usize),
    #[error("not enough confirmations: have {have}, need {need}")]
    InsufficientConfirmations { have: usize, need: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),
    #[error("tx failed: {0}")]
    ExecutionFailed(#[from] DispatchError),
}

/// A multi-signature wallet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MultisigWallet {
    /// Wallet address
    address: String,
    /// Owners and quorum
    registry: OwnerRegistry,
    /// Optional human-readable label
    pub label: Option<String>,
    /// Funds held by the wallet
    balance: u128,
    /// Ledger of submitted transactions, indexed by position
    transactions: Vec<Transaction>,
    /// Emitted events
    events: EventLog,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl MultisigWallet {
    /// Create a new wallet at a given address
    pub fn new(address: String, registry: OwnerRegistry, label: Option<String>) -> Self {
        Self {
            address,
            registry,
            label,
            balance: 0,
            transactions: Vec::new(),
            events: EventLog::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a standalone wallet whose address is derived from its configuration
    pub fn from_owners(owners: Vec<String>, quorum: usize) -> Result<Self, MultisigError> {
        let registry = OwnerRegistry::new(owners, quorum)?;
        let seed = format!("{}:{}", registry.owners().join(","), quorum);
        let address = derive_address(seed.as_bytes());
        Ok(Self::new(address, registry, None))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Get the wallet address
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Owners in construction order
    pub fn owners(&self) -> &[String] {
        self.registry.owners()
    }

    /// Check if an identifier is an owner
    pub fn is_owner(&self, id: &str) -> bool {
        self.registry.is_owner(id)
    }

    /// Required confirmations
    pub fn quorum(&self) -> usize {
        self.registry.quorum()
    }

    /// Current balance
    pub fn balance(&self) -> u128 {
        self.balance
    }

    /// Get human-readable description
    pub fn description(&self) -> String {
        self.registry.description()
    }

    /// Get a transaction by ledger index
    pub fn get_transaction(&self, index: usize) -> Result<&Transaction, MultisigError> {
        self.transactions
            .get(index)
            .ok_or(MultisigError::NotFound(index))
    }

    /// Number of submitted transactions
    pub fn get_transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Whether `owner` currently confirms transaction `index`
    pub fn is_confirmed(&self, index: usize, owner: &str) -> Result<bool, MultisigError> {
        Ok(self.get_transaction(index)?.is_confirmed_by(owner))
    }

    /// The whole ledger, in submission order
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Transactions not yet executed
    pub fn pending_transactions(&self) -> Vec<&Transaction> {
        self.transactions.iter().filter(|tx| !tx.executed).collect()
    }

    /// All emitted events
    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    /// Events that refer to a given ledger index
    pub fn events_for_transaction(&self, index: usize) -> Vec<&EventRecord> {
        self.events.for_transaction(index)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Fund the wallet. Anyone may deposit.
    pub fn deposit(&mut self, sender: &str, amount: u128) -> Result<MultisigEvent, MultisigError> {
        if amount == 0 {
            return Err(MultisigError::InvalidAmount);
        }

        let balance = self
            .balance
            .checked_add(amount)
            .ok_or(MultisigError::InvalidAmount)?;
        self.balance = balance;

        log::info!("Deposit of {} into {} from {}", amount, self.address, sender);

        Ok(self.emit(MultisigEvent::Deposit {
            sender: sender.to_string(),
            amount,
            balance,
        }))
    }

    /// Submit a new transaction request
    ///
    /// # Arguments
    /// * `caller` - Submitting owner
    /// * `to` - Destination address
    /// * `value` - Amount to transfer on execution
    /// * `data` - Call payload (may be empty)
    ///
    /// Returns the ledger index assigned to the request.
    pub fn submit_transaction(
        &mut self,
        caller: &str,
        to: &str,
        value: u128,
        data: Vec<u8>,
    ) -> Result<usize, MultisigError> {
        self.ensure_owner(caller)?;

        let index = self.transactions.len();
        self.transactions.push(Transaction::new(
            index,
            caller.to_string(),
            to.to_string(),
            value,
            data.clone(),
        ));

        log::info!(
            "Transaction {} submitted to {} by {} ({} -> {})",
            index,
            self.address,
            caller,
            value,
            to
        );

        self.emit(MultisigEvent::SubmitTransaction {
            index,
            submitter: caller.to_string(),
            to: to.to_string(),
            value,
            data,
        });

        Ok(index)
    }

    /// Confirm a pending transaction
    pub fn confirm_transaction(
        &mut self,
        caller: &str,
        index: usize,
    ) -> Result<MultisigEvent, MultisigError> {
        self.ensure_owner(caller)?;
        let quorum = self.quorum();
        let tx = self.pending_mut(index)?;

        if !tx.add_confirmation(caller) {
            return Err(MultisigError::AlreadyConfirmed(index));
        }
        let count = tx.num_confirmations;

        log::info!(
            "Transaction {} on {} confirmed by {} ({}/{})",
            index,
            self.address,
            caller,
            count,
            quorum
        );

        Ok(self.emit(MultisigEvent::ConfirmTransaction {
            index,
            confirmer: caller.to_string(),
        }))
    }

    /// Revoke a previous confirmation
    pub fn revoke_confirmation(
        &mut self,
        caller: &str,
        index: usize,
    ) -> Result<MultisigEvent, MultisigError> {
        self.ensure_owner(caller)?;
        let tx = self.pending_mut(index)?;

        if !tx.remove_confirmation(caller) {
            return Err(MultisigError::NotConfirmed(index));
        }

        log::debug!(
            "Transaction {} on {} revoked by {}",
            index,
            self.address,
            caller
        );

        Ok(self.emit(MultisigEvent::RevokeConfirmation {
            index,
            revoker: caller.to_string(),
        }))
    }

    /// Execute a transaction that has reached quorum
    ///
    /// The transaction is marked executed and the balance debited before the
    /// dispatcher runs. If the dispatcher fails, both are restored and the
    /// call fails with `ExecutionFailed`.
    pub fn execute_transaction<D>(
        &mut self,
        caller: &str,
        index: usize,
        dispatcher: &mut D,
    ) -> Result<MultisigEvent, MultisigError>
    where
        D: CallDispatcher + ?Sized,
    {
        self.ensure_owner(caller)?;
        let quorum = self.quorum();
        let balance = self.balance;
        let from = self.address.clone();
        let tx = self.pending_mut(index)?;

        if !tx.has_quorum(quorum) {
            return Err(MultisigError::InsufficientConfirmations {
                have: tx.num_confirmations,
                need: quorum,
            });
        }

        if tx.value > balance {
            return Err(MultisigError::InsufficientBalance {
                have: balance,
                need: tx.value,
            });
        }

        tx.mark_executed();
        let call = OutgoingCall {
            from,
            to: tx.to.clone(),
            value: tx.value,
            data: tx.data.clone(),
        };
        self.balance = balance - call.value;

        if let Err(e) = dispatcher.dispatch(&call) {
            log::warn!(
                "Transaction {} on {} failed to execute: {}",
                index,
                self.address,
                e
            );
            self.transactions[index].unmark_executed();
            self.balance = balance;
            return Err(MultisigError::ExecutionFailed(e));
        }

        log::info!(
            "Transaction {} on {} executed by {} ({} -> {})",
            index,
            self.address,
            caller,
            call.value,
            call.to
        );

        Ok(self.emit(MultisigEvent::ExecuteTransaction {
            index,
            executor: caller.to_string(),
        }))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Describe the first ledger entry that disagrees with its position or
    /// the owner set, if any. Used when state is read back from storage.
    pub(crate) fn integrity_error(&self) -> Option<String> {
        self.transactions
            .iter()
            .enumerate()
            .find_map(|(position, tx)| {
                tx.integrity_error(position, |owner| self.registry.is_owner(owner))
            })
            .map(|problem| format!("wallet {}: {}", self.address, problem))
    }

    fn ensure_owner(&self, caller: &str) -> Result<(), MultisigError> {
        if !self.registry.is_owner(caller) {
            return Err(MultisigError::NotOwner(caller.to_string()));
        }
        Ok(())
    }

    /// Mutable access to an existing, not-yet-executed transaction
    fn pending_mut(&mut self, index: usize) -> Result<&mut Transaction, MultisigError> {
        let tx = self
            .transactions
            .get_mut(index)
            .ok_or(MultisigError::NotFound(index))?;

        if tx.executed {
            return Err(MultisigError::AlreadyExecuted(index));
        }

        Ok(tx)
    }

    fn emit(&mut self, event: MultisigEvent) -> MultisigEvent {
        self.events.emit(event).event.clone()
    }
}
