//! REST API module
//!
//! Provides HTTP REST API for programmatic access to multisig wallets.
//!
//! # Endpoints
//!
//! ## Wallets
//! - `GET /api/wallets` - List wallets in deployment order
//! - `POST /api/wallets` - Deploy a wallet
//! - `GET /api/wallets/:address` - Wallet details
//! - `POST /api/wallets/:address/deposit` - Fund a wallet
//! - `GET /api/wallets/:address/events` - Event log
//!
//! ## Transactions
//! - `GET /api/wallets/:address/transactions` - Ledger
//! - `POST /api/wallets/:address/transactions` - Submit
//! - `GET /api/wallets/:address/transactions/:index` - Get transaction
//! - `POST /api/wallets/:address/transactions/:index/confirm` - Confirm
//! - `POST /api/wallets/:address/transactions/:index/revoke` - Revoke
//! - `POST /api/wallets/:address/transactions/:index/execute` - Execute
//!
//! ## Accounts
//! - `GET /api/accounts/:address` - External account balance
//!
//! ## WebSocket
//! - `GET /ws` - Live wallet events, optionally `?wallet=<address>`

pub mod handlers;
pub mod routes;
pub mod websocket;

pub use handlers::ApiState;
pub use routes::create_router;
pub use websocket::{WsBroadcaster, WsEvent};
