//! Multi-signature wallet engine
//!
//! Provides M-of-N wallets where a transaction submitted by one owner can
//! only be executed once M distinct owners have confirmed it.
//!
//! # Example
//!
//! ```rust
//! use multisig_engine::multisig::MultisigFactory;
//!
//! let owners = vec!["alice".to_string(), "bob".to_string(), "carol".to_string()];
//!
//! // Deploy a 2-of-3 wallet and fund it
//! let mut factory = MultisigFactory::new();
//! let wallet = factory.deploy_instance(owners, 2, None).unwrap();
//! factory.deposit(&wallet, "donor", 100).unwrap();
//!
//! // Submit, confirm twice, execute
//! let index = factory.submit_transaction(&wallet, "alice", "dave", 40, vec![]).unwrap();
//! factory.confirm_transaction(&wallet, "alice", index).unwrap();
//! factory.confirm_transaction(&wallet, "bob", index).unwrap();
//! factory.execute_transaction(&wallet, "carol", index).unwrap();
//!
//! assert_eq!(factory.accounts().balance_of("dave"), 40);
//! ```

pub mod dispatch;
pub mod events;
pub mod factory;
pub mod owners;
pub mod transaction;
pub mod wallet;

pub use dispatch::{AccountBook, CallDispatcher, DeliveredCall, DispatchError, OutgoingCall};
pub use events::{EventLog, EventRecord, MultisigEvent};
pub use factory::MultisigFactory;
pub use owners::OwnerRegistry;
pub use transaction::{parse_hex_data, Transaction, TransactionStatus};
pub use wallet::{MultisigError, MultisigWallet};
