//! Multisig Engine: an M-of-N multi-signature wallet engine in Rust
//!
//! This crate provides:
//! - Owner registries with a fixed confirmation quorum
//! - A per-wallet transaction ledger with confirm/revoke/execute
//! - An append-only event log for every state change
//! - A factory that deploys independent wallet instances
//! - JSON persistence, a REST API and a CLI
//!
//! # Example
//!
//! ```rust
//! use multisig_engine::multisig::MultisigFactory;
//!
//! let mut factory = MultisigFactory::new();
//! let address = factory
//!     .deploy_instance(vec!["alice".into(), "bob".into()], 2, None)
//!     .unwrap();
//!
//! factory.deposit(&address, "donor", 100).unwrap();
//! let index = factory
//!     .submit_transaction(&address, "alice", "carol", 40, vec![])
//!     .unwrap();
//! factory.confirm_transaction(&address, "alice", index).unwrap();
//! factory.confirm_transaction(&address, "bob", index).unwrap();
//! factory.execute_transaction(&address, "bob", index).unwrap();
//!
//! assert_eq!(factory.accounts().balance_of("carol"), 40);
//! ```

pub mod api;
pub mod cli;
pub mod crypto;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use api::{create_router, ApiState};
pub use multisig::{
    AccountBook, CallDispatcher, MultisigError, MultisigEvent, MultisigFactory, MultisigWallet,
    OwnerRegistry, Transaction,
};
pub use storage::{Storage, StorageConfig};
