//! Outgoing call dispatch
//!
//! Executing a wallet transaction hands an `OutgoingCall` to a
//! `CallDispatcher`. The dispatcher only ever sees the call, never the
//! wallet, so it has no way to re-enter the wallet that issued it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Maximum number of delivered calls kept by an `AccountBook`
const MAX_DELIVERY_HISTORY: usize = 1000;

/// Errors returned by a dispatcher
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("call rejected by recipient: {0}")]
    Rejected(String),
    #[error("recipient balance overflow: {0}")]
    BalanceOverflow(String),
}

/// A transfer/call leaving a wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutgoingCall {
    /// Wallet the call originates from
    pub from: String,
    /// Recipient address
    pub to: String,
    /// Amount transferred
    pub value: u128,
    /// Call payload
    pub data: Vec<u8>,
}

/// Performs the external effect of an executed transaction
pub trait CallDispatcher {
    /// Deliver a call, returning the recipient's return data
    fn dispatch(&mut self, call: &OutgoingCall) -> Result<Vec<u8>, DispatchError>;
}

/// A record of a call that was delivered
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveredCall {
    pub call: OutgoingCall,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
}

/// Balances of accounts outside any wallet
///
/// Credits the value of every delivered call to its recipient. Addresses
/// registered with `reject_calls_to` refuse every call.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccountBook {
    /// Balances: address -> amount
    balances: HashMap<String, u128>,
    /// Addresses that reject incoming calls
    rejecting: HashSet<String>,
    /// Delivered calls (last 1000)
    history: Vec<DeliveredCall>,
}

impl AccountBook {
    /// Create an empty account book
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            rejecting: HashSet::new(),
            history: Vec::new(),
        }
    }

    /// Get the balance of an address
    pub fn balance_of(&self, address: &str) -> u128 {
        *self.balances.get(address).unwrap_or(&0)
    }

    /// Make every future call to `address` fail
    pub fn reject_calls_to(&mut self, address: &str) {
        self.rejecting.insert(address.to_string());
    }

    /// Accept calls to `address` again
    pub fn accept_calls_to(&mut self, address: &str) {
        self.rejecting.remove(address);
    }

    /// Delivered calls, oldest first
    pub fn history(&self) -> &[DeliveredCall] {
        &self.history
    }
}

impl CallDispatcher for AccountBook {
    fn dispatch(&mut self, call: &OutgoingCall) -> Result<Vec<u8>, DispatchError> {
        if self.rejecting.contains(&call.to) {
            return Err(DispatchError::Rejected(call.to.clone()));
        }

        let current = self.balance_of(&call.to);
        let updated = current
            .checked_add(call.value)
            .ok_or_else(|| DispatchError::BalanceOverflow(call.to.clone()))?;
        self.balances.insert(call.to.clone(), updated);

        self.history.push(DeliveredCall {
            call: call.clone(),
            delivered_at: chrono::Utc::now(),
        });
        if self.history.len() > MAX_DELIVERY_HISTORY {
            self.history.remove(0);
        }

        Ok(Vec::new())
    }
}
