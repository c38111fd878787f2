//! CLI commands for the multisig engine
//!
//! Implements all command handlers for the CLI interface.

use crate::multisig::{parse_hex_data, MultisigFactory, MultisigWallet, Transaction};
use crate::storage::{Storage, StorageConfig};
use std::path::PathBuf;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub factory: MultisigFactory,
    pub storage: Storage,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize application state, loading any saved wallets
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = Storage::new(StorageConfig {
            data_dir: data_dir.clone(),
            ..Default::default()
        })?;
        let factory = storage.load_or_default()?;

        Ok(Self {
            factory,
            storage,
            data_dir,
        })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.factory)?;
        Ok(())
    }

    fn wallet(&self, address: &str) -> CliResult<&MultisigWallet> {
        Ok(self.factory.wallet(address)?)
    }
}

/// Split a comma-separated owner list
pub fn parse_owner_list(owners: &str) -> Vec<String> {
    owners
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn print_transaction(tx: &Transaction, quorum: usize) {
    println!("   #{} [{}]", tx.index, tx.status().as_str());
    println!("   ├─ To: {}", tx.to);
    println!("   ├─ Value: {}", tx.value);
    println!("   ├─ Data: {}", tx.data_hex());
    println!("   ├─ Submitted by: {}", tx.submitted_by);
    println!(
        "   └─ Confirmations: {}/{} {:?}",
        tx.num_confirmations,
        quorum,
        tx.confirmed_by()
    );
}

/// Deploy a new wallet
pub fn cmd_deploy(
    state: &mut AppState,
    owners: &str,
    quorum: usize,
    label: Option<&str>,
) -> CliResult<()> {
    let owners = parse_owner_list(owners);
    let address = state
        .factory
        .deploy_instance(owners, quorum, label.map(|l| l.to_string()))?;
    state.save()?;

    let wallet = state.wallet(&address)?;
    println!("🔐 Multisig wallet deployed!");
    println!("   📍 Address: {}", address);
    println!("   👥 Policy: {}", wallet.description());
    for owner in wallet.owners() {
        println!("      - {}", owner);
    }

    Ok(())
}

/// List all wallets
pub fn cmd_list(state: &AppState) -> CliResult<()> {
    let wallets = state.factory.wallets();
    if wallets.is_empty() {
        println!("🔐 No wallets deployed yet.");
        return Ok(());
    }

    println!("🔐 Deployed wallets ({}):", wallets.len());
    for wallet in wallets {
        println!(
            "   {} {} balance={} txs={}{}",
            wallet.address(),
            wallet.description(),
            wallet.balance(),
            wallet.get_transaction_count(),
            wallet
                .label
                .as_ref()
                .map(|l| format!(" ({})", l))
                .unwrap_or_default()
        );
    }

    Ok(())
}

/// Show wallet details
pub fn cmd_info(state: &AppState, address: &str) -> CliResult<()> {
    let wallet = state.wallet(address)?;

    println!("🔐 Wallet: {}", wallet.address());
    if let Some(label) = &wallet.label {
        println!("   🏷️  Label: {}", label);
    }
    println!("   👥 Policy: {}", wallet.description());
    for owner in wallet.owners() {
        println!("      - {}", owner);
    }
    println!("   💰 Balance: {}", wallet.balance());
    println!(
        "   📜 Transactions: {} ({} pending)",
        wallet.get_transaction_count(),
        wallet.pending_transactions().len()
    );
    println!("   🕒 Created: {}", wallet.created_at.to_rfc3339());

    Ok(())
}

/// Deposit into a wallet
pub fn cmd_deposit(state: &mut AppState, address: &str, from: &str, amount: u128) -> CliResult<()> {
    state.factory.deposit(address, from, amount)?;
    state.save()?;

    println!("💰 Deposited {} into {}", amount, address);
    println!("   New balance: {}", state.wallet(address)?.balance());

    Ok(())
}

/// Submit a transaction
pub fn cmd_submit(
    state: &mut AppState,
    address: &str,
    caller: &str,
    to: &str,
    value: u128,
    data: &str,
) -> CliResult<()> {
    let data = parse_hex_data(data)?;
    let index = state
        .factory
        .submit_transaction(address, caller, to, value, data)?;
    state.save()?;

    println!("📝 Transaction submitted!");
    println!("   Index: {}", index);

    Ok(())
}

/// Confirm a transaction
pub fn cmd_confirm(state: &mut AppState, address: &str, caller: &str, index: usize) -> CliResult<()> {
    state.factory.confirm_transaction(address, caller, index)?;
    state.save()?;

    let wallet = state.wallet(address)?;
    let tx = wallet.get_transaction(index)?;
    println!(
        "✅ Transaction {} confirmed by {} ({}/{})",
        index,
        caller,
        tx.num_confirmations,
        wallet.quorum()
    );

    Ok(())
}

/// Revoke a confirmation
pub fn cmd_revoke(state: &mut AppState, address: &str, caller: &str, index: usize) -> CliResult<()> {
    state.factory.revoke_confirmation(address, caller, index)?;
    state.save()?;

    println!("↩️  Confirmation on transaction {} revoked by {}", index, caller);

    Ok(())
}

/// Execute a transaction
pub fn cmd_execute(state: &mut AppState, address: &str, caller: &str, index: usize) -> CliResult<()> {
    state.factory.execute_transaction(address, caller, index)?;
    state.save()?;

    let tx = state.wallet(address)?.get_transaction(index)?;
    println!("🚀 Transaction {} executed by {}", index, caller);
    println!("   Sent {} to {}", tx.value, tx.to);

    Ok(())
}

/// Show a single transaction
pub fn cmd_tx(state: &AppState, address: &str, index: usize) -> CliResult<()> {
    let wallet = state.wallet(address)?;
    let tx = wallet.get_transaction(index)?;

    println!("📜 Transaction on {}:", address);
    print_transaction(tx, wallet.quorum());

    Ok(())
}

/// List a wallet's transactions
pub fn cmd_txs(state: &AppState, address: &str, pending_only: bool) -> CliResult<()> {
    let wallet = state.wallet(address)?;
    let transactions: Vec<&Transaction> = if pending_only {
        wallet.pending_transactions()
    } else {
        wallet.transactions().iter().collect()
    };

    if transactions.is_empty() {
        println!("📜 No transactions.");
        return Ok(());
    }

    println!("📜 Transactions ({}):", transactions.len());
    for tx in transactions {
        print_transaction(tx, wallet.quorum());
    }

    Ok(())
}

/// Show a wallet's event log
pub fn cmd_events(state: &AppState, address: &str) -> CliResult<()> {
    let wallet = state.wallet(address)?;

    if wallet.events().is_empty() {
        println!("📣 No events.");
        return Ok(());
    }

    println!("📣 Events ({}):", wallet.events().len());
    for record in wallet.events() {
        println!(
            "   [{}] {} {} {:?}",
            record.sequence,
            record.emitted_at.to_rfc3339(),
            record.event.name(),
            record.event
        );
    }

    Ok(())
}

/// Show an external account balance
pub fn cmd_account(state: &AppState, address: &str) -> CliResult<()> {
    let balance = state.factory.accounts().balance_of(address);
    println!("💰 Balance of {}: {}", address, balance);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_owner_list() {
        assert_eq!(
            parse_owner_list("alice, bob,carol,"),
            vec!["alice".to_string(), "bob".to_string(), "carol".to_string()]
        );
        assert!(parse_owner_list("").is_empty());
    }

    #[test]
    fn test_commands_persist_state() {
        let temp_dir = tempfile::tempdir().unwrap();
        let data_dir = temp_dir.path().to_path_buf();

        let mut state = AppState::new(data_dir.clone()).unwrap();
        cmd_deploy(&mut state, "alice,bob", 1, Some("ops")).unwrap();
        let address = state.factory.list_instances()[0].clone();

        cmd_deposit(&mut state, &address, "donor", 5).unwrap();
        cmd_submit(&mut state, &address, "alice", "dave", 5, "0x").unwrap();
        cmd_confirm(&mut state, &address, "bob", 0).unwrap();
        cmd_execute(&mut state, &address, "alice", 0).unwrap();

        // A fresh state sees everything that was saved
        let reloaded = AppState::new(data_dir).unwrap();
        let wallet = reloaded.factory.get(&address).unwrap();
        assert!(wallet.get_transaction(0).unwrap().executed);
        assert_eq!(wallet.balance(), 0);
        assert_eq!(reloaded.factory.accounts().balance_of("dave"), 5);
        assert!(cmd_events(&reloaded, &address).is_ok());
    }

    #[test]
    fn test_command_errors_surface() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut state = AppState::new(temp_dir.path().to_path_buf()).unwrap();

        assert!(cmd_deploy(&mut state, "", 1, None).is_err());
        assert!(cmd_info(&state, "0xmissing").is_err());

        cmd_deploy(&mut state, "alice,bob", 2, None).unwrap();
        let address = state.factory.list_instances()[0].clone();
        assert!(cmd_submit(&mut state, &address, "alice", "dave", 0, "0xzz").is_err());
        assert!(cmd_revoke(&mut state, &address, "alice", 0).is_err());
    }
}
