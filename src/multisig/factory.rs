//! Multisig wallet factory
//!
//! Deploys independent wallet instances, keeps them in deployment order and
//! routes operations to them by address. An executed transfer whose
//! destination is another instance of the same factory is paid into that
//! wallet as a `Deposit`. Every other destination is credited in the
//! `AccountBook` shared by all instances.

use crate::crypto::derive_address;
use crate::multisig::dispatch::{AccountBook, CallDispatcher, DispatchError, OutgoingCall};
use crate::multisig::events::MultisigEvent;
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::wallet::{MultisigError, MultisigWallet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Factory and registry of multisig wallets
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MultisigFactory {
    /// Wallets by address
    instances: HashMap<String, MultisigWallet>,
    /// Wallet addresses in deployment order
    deployment_order: Vec<String>,
    /// External accounts receiving executed transfers
    accounts: AccountBook,
    /// Deployment counter for address generation
    nonce: u64,
}

impl MultisigFactory {
    /// Create a new empty factory
    pub fn new() -> Self {
        Self {
            instances: HashMap::new(),
            deployment_order: Vec::new(),
            accounts: AccountBook::new(),
            nonce: 0,
        }
    }

    /// Deploy a new wallet instance
    ///
    /// Every deployment gets a fresh address, even for an owner set and
    /// quorum that were deployed before.
    pub fn deploy_instance(
        &mut self,
        owners: Vec<String>,
        quorum: usize,
        label: Option<String>,
    ) -> Result<String, MultisigError> {
        let registry = OwnerRegistry::new(owners, quorum)?;

        let address = self.generate_address(&registry);
        self.nonce += 1;

        let wallet = MultisigWallet::new(address.clone(), registry, label);
        log::info!(
            "Multisig wallet deployed at {} ({})",
            address,
            wallet.description()
        );

        self.instances.insert(address.clone(), wallet);
        self.deployment_order.push(address.clone());

        Ok(address)
    }

    /// Wallet addresses in deployment order
    pub fn list_instances(&self) -> &[String] {
        &self.deployment_order
    }

    /// Wallets in deployment order
    pub fn wallets(&self) -> Vec<&MultisigWallet> {
        self.deployment_order
            .iter()
            .filter_map(|address| self.instances.get(address))
            .collect()
    }

    /// Get a wallet by address
    pub fn get(&self, address: &str) -> Option<&MultisigWallet> {
        self.instances.get(address)
    }

    /// Get a wallet or fail with `WalletNotFound`
    pub fn wallet(&self, address: &str) -> Result<&MultisigWallet, MultisigError> {
        self.instances
            .get(address)
            .ok_or_else(|| MultisigError::WalletNotFound(address.to_string()))
    }

    /// Number of deployed wallets
    pub fn instance_count(&self) -> usize {
        self.deployment_order.len()
    }

    /// Wallets (in deployment order) that list `owner` among their owners
    pub fn instances_for_owner(&self, owner: &str) -> Vec<&MultisigWallet> {
        self.wallets()
            .into_iter()
            .filter(|wallet| wallet.is_owner(owner))
            .collect()
    }

    /// External account balances
    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    /// Describe the first inconsistency in the factory's state, if any
    ///
    /// Checks that every instance is stored under its own address, that the
    /// deployment order lists each instance exactly once, and that every
    /// wallet ledger agrees with its owner set.
    pub fn integrity_error(&self) -> Option<String> {
        if self.deployment_order.len() != self.instances.len() {
            return Some(format!(
                "{} wallets stored but {} in deployment order",
                self.instances.len(),
                self.deployment_order.len()
            ));
        }

        for (key, wallet) in &self.instances {
            if key != wallet.address() {
                return Some(format!(
                    "wallet {} stored under address {}",
                    wallet.address(),
                    key
                ));
            }
        }

        let mut listed = HashSet::new();
        for address in &self.deployment_order {
            if !self.instances.contains_key(address) || !listed.insert(address) {
                return Some(format!("bad deployment order entry {}", address));
            }
        }

        self.wallets()
            .into_iter()
            .find_map(|wallet| wallet.integrity_error())
    }

    // =========================================================================
    // Wallet operations by address
    // =========================================================================

    /// Deposit into a wallet
    pub fn deposit(
        &mut self,
        wallet: &str,
        sender: &str,
        amount: u128,
    ) -> Result<MultisigEvent, MultisigError> {
        self.wallet_mut(wallet)?.deposit(sender, amount)
    }

    /// Submit a transaction to a wallet
    pub fn submit_transaction(
        &mut self,
        wallet: &str,
        caller: &str,
        to: &str,
        value: u128,
        data: Vec<u8>,
    ) -> Result<usize, MultisigError> {
        self.wallet_mut(wallet)?
            .submit_transaction(caller, to, value, data)
    }

    /// Confirm a transaction on a wallet
    pub fn confirm_transaction(
        &mut self,
        wallet: &str,
        caller: &str,
        index: usize,
    ) -> Result<MultisigEvent, MultisigError> {
        self.wallet_mut(wallet)?.confirm_transaction(caller, index)
    }

    /// Revoke a confirmation on a wallet
    pub fn revoke_confirmation(
        &mut self,
        wallet: &str,
        caller: &str,
        index: usize,
    ) -> Result<MultisigEvent, MultisigError> {
        self.wallet_mut(wallet)?.revoke_confirmation(caller, index)
    }

    /// Execute a transaction on a wallet
    ///
    /// Transfers to another wallet of this factory become a deposit into
    /// that wallet. A wallet paying itself keeps its balance and records the
    /// returning funds as a deposit after the execution event.
    pub fn execute_transaction(
        &mut self,
        wallet: &str,
        caller: &str,
        index: usize,
    ) -> Result<MultisigEvent, MultisigError> {
        let mut source = self
            .instances
            .remove(wallet)
            .ok_or_else(|| MultisigError::WalletNotFound(wallet.to_string()))?;

        let mut router = WalletRouter {
            wallets: &mut self.instances,
            accounts: &mut self.accounts,
            returned: 0,
        };
        let mut result = source.execute_transaction(caller, index, &mut router);
        let returned = router.returned;

        if result.is_ok() && returned > 0 {
            if let Err(e) = source.deposit(wallet, returned) {
                result = Err(e);
            }
        }

        self.instances.insert(wallet.to_string(), source);
        result
    }

    fn wallet_mut(&mut self, address: &str) -> Result<&mut MultisigWallet, MultisigError> {
        self.instances
            .get_mut(address)
            .ok_or_else(|| MultisigError::WalletNotFound(address.to_string()))
    }

    /// Generate wallet address from nonce and configuration
    fn generate_address(&self, registry: &OwnerRegistry) -> String {
        let input = format!(
            "multisig:{}:{}:{}",
            self.nonce,
            registry.quorum(),
            registry.owners().join(",")
        );
        derive_address(input.as_bytes())
    }
}

/// Dispatcher used while one wallet executes: delivers to sibling wallets
/// and falls back to the external account book
struct WalletRouter<'a> {
    /// Every instance except the executing one
    wallets: &'a mut HashMap<String, MultisigWallet>,
    accounts: &'a mut AccountBook,
    /// Value the executing wallet sent to itself
    returned: u128,
}

impl CallDispatcher for WalletRouter<'_> {
    fn dispatch(&mut self, call: &OutgoingCall) -> Result<Vec<u8>, DispatchError> {
        if call.to == call.from {
            self.returned = call.value;
            return Ok(Vec::new());
        }

        match self.wallets.get_mut(&call.to) {
            Some(target) => {
                if call.value > 0 {
                    target
                        .deposit(&call.from, call.value)
                        .map_err(|_| DispatchError::BalanceOverflow(call.to.clone()))?;
                }
                Ok(Vec::new())
            }
            None => self.accounts.dispatch(call),
        }
    }
}
