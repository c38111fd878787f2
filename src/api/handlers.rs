//! REST API handlers for multisig wallet operations

use crate::api::websocket::{WsBroadcaster, WsEvent};
use crate::multisig::{
    parse_hex_data, EventRecord, MultisigError, MultisigEvent, MultisigFactory, MultisigWallet,
    Transaction, TransactionStatus,
};
use crate::storage::Storage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared application state for API handlers
///
/// Every mutating handler holds the factory write lock for the whole
/// operation, so mutations are applied one at a time.
#[derive(Clone)]
pub struct ApiState {
    pub factory: Arc<RwLock<MultisigFactory>>,
    pub storage: Arc<Storage>,
    pub ws_broadcaster: Arc<WsBroadcaster>,
}

impl ApiState {
    /// Create API state around a loaded factory
    pub fn new(factory: MultisigFactory, storage: Storage) -> Self {
        Self {
            factory: Arc::new(RwLock::new(factory)),
            storage: Arc::new(storage),
            ws_broadcaster: Arc::new(WsBroadcaster::new()),
        }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct WalletInfo {
    pub address: String,
    pub owners: Vec<String>,
    pub quorum: usize,
    pub description: String,
    pub label: Option<String>,
    pub balance: u128,
    pub transaction_count: usize,
    pub pending_count: usize,
    pub created_at: String,
}

impl From<&MultisigWallet> for WalletInfo {
    fn from(wallet: &MultisigWallet) -> Self {
        Self {
            address: wallet.address().to_string(),
            owners: wallet.owners().to_vec(),
            quorum: wallet.quorum(),
            description: wallet.description(),
            label: wallet.label.clone(),
            balance: wallet.balance(),
            transaction_count: wallet.get_transaction_count(),
            pending_count: wallet.pending_transactions().len(),
            created_at: wallet.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionInfo {
    pub index: usize,
    pub to: String,
    pub value: u128,
    pub data: String,
    pub status: TransactionStatus,
    pub executed: bool,
    pub num_confirmations: usize,
    pub confirmations_required: usize,
    pub confirmed_by: Vec<String>,
    pub submitted_by: String,
    pub submitted_at: String,
    pub executed_at: Option<String>,
}

impl TransactionInfo {
    fn new(tx: &Transaction, quorum: usize) -> Self {
        Self {
            index: tx.index,
            to: tx.to.clone(),
            value: tx.value,
            data: tx.data_hex(),
            status: tx.status(),
            executed: tx.executed,
            num_confirmations: tx.num_confirmations,
            confirmations_required: quorum,
            confirmed_by: tx.confirmed_by().iter().map(|s| s.to_string()).collect(),
            submitted_by: tx.submitted_by.clone(),
            submitted_at: tx.submitted_at.to_rfc3339(),
            executed_at: tx.executed_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EventInfo {
    pub sequence: u64,
    pub name: String,
    pub emitted_at: String,
    pub event: MultisigEvent,
}

impl From<&EventRecord> for EventInfo {
    fn from(record: &EventRecord) -> Self {
        Self {
            sequence: record.sequence,
            name: record.event.name().to_string(),
            emitted_at: record.emitted_at.to_rfc3339(),
            event: record.event.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub wallet: String,
    pub event: MultisigEvent,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub wallet: String,
    pub index: usize,
    pub transaction: TransactionInfo,
}

#[derive(Debug, Serialize)]
pub struct AccountInfo {
    pub address: String,
    pub balance: u128,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Deserialize)]
pub struct DeployWalletRequest {
    pub owners: Vec<String>,
    pub quorum: usize,
    pub label: Option<String>,
}

#[derive(Deserialize)]
pub struct DepositRequest {
    pub sender: String,
    pub amount: u128,
}

#[derive(Deserialize)]
pub struct SubmitTransactionRequest {
    pub caller: String,
    pub to: String,
    pub value: u128,
    /// Hex payload, with or without `0x`
    #[serde(default)]
    pub data: String,
}

#[derive(Deserialize)]
pub struct CallerRequest {
    pub caller: String,
}

// ============================================================================
// Helpers
// ============================================================================

/// Map an engine error to an HTTP status
fn status_for(error: &MultisigError) -> StatusCode {
    match error {
        MultisigError::NotOwner(_) => StatusCode::FORBIDDEN,
        MultisigError::NotFound(_) | MultisigError::WalletNotFound(_) => StatusCode::NOT_FOUND,
        MultisigError::InvalidConfiguration(_) | MultisigError::InvalidAmount => {
            StatusCode::BAD_REQUEST
        }
        MultisigError::AlreadyExecuted(_)
        | MultisigError::AlreadyConfirmed(_)
        | MultisigError::NotConfirmed(_)
        | MultisigError::InsufficientConfirmations { .. }
        | MultisigError::InsufficientBalance { .. } => StatusCode::CONFLICT,
        MultisigError::ExecutionFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn error_response(error: MultisigError) -> (StatusCode, Json<ApiError>) {
    (
        status_for(&error),
        Json(ApiError {
            error: error.to_string(),
        }),
    )
}

/// Persist the factory after a mutation
fn persist(state: &ApiState, factory: &MultisigFactory) {
    if let Err(e) = state.storage.save(factory) {
        log::error!("Failed to persist multisig state: {}", e);
    }
}

fn transaction_info(
    factory: &MultisigFactory,
    address: &str,
    index: usize,
) -> ApiResult<TransactionInfo> {
    let wallet = factory.wallet(address).map_err(error_response)?;
    let tx = wallet.get_transaction(index).map_err(error_response)?;
    Ok(Json(TransactionInfo::new(tx, wallet.quorum())))
}

// ============================================================================
// Wallet Handlers
// ============================================================================

/// GET /health - Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// GET /api/wallets - List wallets in deployment order
pub async fn list_wallets(State(state): State<ApiState>) -> Json<Vec<WalletInfo>> {
    let factory = state.factory.read().await;
    Json(factory.wallets().into_iter().map(WalletInfo::from).collect())
}

/// POST /api/wallets - Deploy a new wallet
pub async fn deploy_wallet(
    State(state): State<ApiState>,
    Json(req): Json<DeployWalletRequest>,
) -> ApiResult<WalletInfo> {
    let mut factory = state.factory.write().await;

    let address = factory
        .deploy_instance(req.owners, req.quorum, req.label)
        .map_err(error_response)?;
    persist(&state, &factory);

    let wallet = factory.wallet(&address).map_err(error_response)?;
    state.ws_broadcaster.broadcast(WsEvent::WalletDeployed {
        address: address.clone(),
        owners: wallet.owners().to_vec(),
        quorum: wallet.quorum(),
    });

    Ok(Json(WalletInfo::from(wallet)))
}

/// GET /api/wallets/{address} - Wallet details
pub async fn get_wallet(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<WalletInfo> {
    let factory = state.factory.read().await;
    let wallet = factory.wallet(&address).map_err(error_response)?;
    Ok(Json(WalletInfo::from(wallet)))
}

/// POST /api/wallets/{address}/deposit - Fund a wallet
pub async fn deposit(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Json(req): Json<DepositRequest>,
) -> ApiResult<MutationResponse> {
    let mut factory = state.factory.write().await;

    let event = factory
        .deposit(&address, &req.sender, req.amount)
        .map_err(error_response)?;
    persist(&state, &factory);
    state
        .ws_broadcaster
        .broadcast_multisig(&address, event.clone());

    Ok(Json(MutationResponse {
        wallet: address,
        event,
    }))
}

// ============================================================================
// Transaction Handlers
// ============================================================================

/// GET /api/wallets/{address}/transactions - Full ledger
pub async fn list_transactions(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<TransactionInfo>> {
    let factory = state.factory.read().await;
    let wallet = factory.wallet(&address).map_err(error_response)?;

    Ok(Json(
        wallet
            .transactions()
            .iter()
            .map(|tx| TransactionInfo::new(tx, wallet.quorum()))
            .collect(),
    ))
}

/// POST /api/wallets/{address}/transactions - Submit a transaction
pub async fn submit_transaction(
    State(state): State<ApiState>,
    Path(address): Path<String>,
    Json(req): Json<SubmitTransactionRequest>,
) -> ApiResult<SubmitResponse> {
    let data = parse_hex_data(&req.data).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: format!("Invalid data payload: {}", e),
            }),
        )
    })?;

    let mut factory = state.factory.write().await;
    let index = factory
        .submit_transaction(&address, &req.caller, &req.to, req.value, data)
        .map_err(error_response)?;
    persist(&state, &factory);

    if let Some(record) = factory.get(&address).and_then(|w| w.events().last()) {
        state
            .ws_broadcaster
            .broadcast_multisig(&address, record.event.clone());
    }

    let Json(transaction) = transaction_info(&factory, &address, index)?;
    Ok(Json(SubmitResponse {
        wallet: address,
        index,
        transaction,
    }))
}

/// GET /api/wallets/{address}/transactions/{index} - Get a transaction
pub async fn get_transaction(
    State(state): State<ApiState>,
    Path((address, index)): Path<(String, usize)>,
) -> ApiResult<TransactionInfo> {
    let factory = state.factory.read().await;
    transaction_info(&factory, &address, index)
}

/// POST /api/wallets/{address}/transactions/{index}/confirm - Confirm
pub async fn confirm_transaction(
    State(state): State<ApiState>,
    Path((address, index)): Path<(String, usize)>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<MutationResponse> {
    let mut factory = state.factory.write().await;

    let event = factory
        .confirm_transaction(&address, &req.caller, index)
        .map_err(error_response)?;
    persist(&state, &factory);
    state
        .ws_broadcaster
        .broadcast_multisig(&address, event.clone());

    Ok(Json(MutationResponse {
        wallet: address,
        event,
    }))
}

/// POST /api/wallets/{address}/transactions/{index}/revoke - Revoke a confirmation
pub async fn revoke_confirmation(
    State(state): State<ApiState>,
    Path((address, index)): Path<(String, usize)>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<MutationResponse> {
    let mut factory = state.factory.write().await;

    let event = factory
        .revoke_confirmation(&address, &req.caller, index)
        .map_err(error_response)?;
    persist(&state, &factory);
    state
        .ws_broadcaster
        .broadcast_multisig(&address, event.clone());

    Ok(Json(MutationResponse {
        wallet: address,
        event,
    }))
}

/// POST /api/wallets/{address}/transactions/{index}/execute - Execute
pub async fn execute_transaction(
    State(state): State<ApiState>,
    Path((address, index)): Path<(String, usize)>,
    Json(req): Json<CallerRequest>,
) -> ApiResult<MutationResponse> {
    let mut factory = state.factory.write().await;

    let event = factory
        .execute_transaction(&address, &req.caller, index)
        .map_err(error_response)?;
    persist(&state, &factory);
    state
        .ws_broadcaster
        .broadcast_multisig(&address, event.clone());

    Ok(Json(MutationResponse {
        wallet: address,
        event,
    }))
}

/// GET /api/wallets/{address}/events - Event log
pub async fn get_events(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<EventInfo>> {
    let factory = state.factory.read().await;
    let wallet = factory.wallet(&address).map_err(error_response)?;
    Ok(Json(wallet.events().iter().map(EventInfo::from).collect()))
}

/// GET /api/accounts/{address} - External account balance
pub async fn get_account(
    State(state): State<ApiState>,
    Path(address): Path<String>,
) -> Json<AccountInfo> {
    let factory = state.factory.read().await;
    let balance = factory.accounts().balance_of(&address);
    Json(AccountInfo { address, balance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageConfig;

    fn test_state(temp_dir: &tempfile::TempDir) -> ApiState {
        let storage = Storage::new(StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        })
        .unwrap();
        ApiState::new(MultisigFactory::new(), storage)
    }

    async fn deploy(state: &ApiState) -> String {
        let req = DeployWalletRequest {
            owners: vec!["alice".to_string(), "bob".to_string(), "carol".to_string()],
            quorum: 2,
            label: None,
        };
        let Json(info) = deploy_wallet(State(state.clone()), Json(req)).await.unwrap();
        info.address
    }

    fn caller(name: &str) -> Json<CallerRequest> {
        Json(CallerRequest {
            caller: name.to_string(),
        })
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&MultisigError::NotOwner("x".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(status_for(&MultisigError::NotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&MultisigError::InsufficientConfirmations { have: 1, need: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&MultisigError::InvalidConfiguration("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_deploy_and_list() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);

        let address = deploy(&state).await;
        let Json(wallets) = list_wallets(State(state.clone())).await;

        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].address, address);
        assert_eq!(wallets[0].description, "2-of-3");
        assert!(state.storage.exists());
    }

    #[tokio::test]
    async fn test_deploy_invalid_quorum() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);

        let req = DeployWalletRequest {
            owners: vec!["alice".to_string()],
            quorum: 2,
            label: None,
        };
        let (status, _) = deploy_wallet(State(state), Json(req)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_transaction_lifecycle() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);
        let address = deploy(&state).await;

        deposit(
            State(state.clone()),
            Path(address.clone()),
            Json(DepositRequest {
                sender: "donor".to_string(),
                amount: 10,
            }),
        )
        .await
        .unwrap();

        let Json(submitted) = submit_transaction(
            State(state.clone()),
            Path(address.clone()),
            Json(SubmitTransactionRequest {
                caller: "alice".to_string(),
                to: "dave".to_string(),
                value: 10,
                data: "0x01".to_string(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(submitted.index, 0);
        assert_eq!(submitted.transaction.data, "0x01");

        let path = || Path((address.clone(), 0usize));
        confirm_transaction(State(state.clone()), path(), caller("alice"))
            .await
            .unwrap();

        let (status, _) = execute_transaction(State(state.clone()), path(), caller("alice"))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);

        confirm_transaction(State(state.clone()), path(), caller("bob"))
            .await
            .unwrap();
        let Json(executed) = execute_transaction(State(state.clone()), path(), caller("carol"))
            .await
            .unwrap();
        assert_eq!(executed.event.name(), "ExecuteTransaction");

        let Json(tx) = get_transaction(State(state.clone()), path()).await.unwrap();
        assert!(tx.executed);
        assert_eq!(tx.status, TransactionStatus::Executed);
        assert_eq!(tx.confirmed_by, vec!["alice".to_string(), "bob".to_string()]);

        let Json(account) = get_account(State(state.clone()), Path("dave".to_string())).await;
        assert_eq!(account.balance, 10);

        let Json(events) = get_events(State(state.clone()), Path(address.clone()))
            .await
            .unwrap();
        let names: Vec<&str> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Deposit",
                "SubmitTransaction",
                "ConfirmTransaction",
                "ConfirmTransaction",
                "ExecuteTransaction"
            ]
        );
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);
        let address = deploy(&state).await;

        let (status, _) = submit_transaction(
            State(state.clone()),
            Path(address.clone()),
            Json(SubmitTransactionRequest {
                caller: "mallory".to_string(),
                to: "dave".to_string(),
                value: 0,
                data: String::new(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = submit_transaction(
            State(state.clone()),
            Path(address.clone()),
            Json(SubmitTransactionRequest {
                caller: "alice".to_string(),
                to: "dave".to_string(),
                value: 0,
                data: "0xnothex".to_string(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = revoke_confirmation(
            State(state.clone()),
            Path((address.clone(), 9)),
            caller("alice"),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = get_wallet(State(state.clone()), Path("0xmissing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_mutations_are_broadcast() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);
        let address = deploy(&state).await;
        let mut rx = state.ws_broadcaster.subscribe();

        submit_transaction(
            State(state.clone()),
            Path(address.clone()),
            Json(SubmitTransactionRequest {
                caller: "bob".to_string(),
                to: "dave".to_string(),
                value: 0,
                data: String::new(),
            }),
        )
        .await
        .unwrap();

        match rx.recv().await.unwrap() {
            WsEvent::Multisig { wallet, event } => {
                assert_eq!(wallet, address);
                assert_eq!(event.name(), "SubmitTransaction");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_concurrent_confirmations_are_serialized() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(&temp_dir);
        let address = deploy(&state).await;

        {
            let mut factory = state.factory.write().await;
            factory
                .submit_transaction(&address, "alice", "dave", 0, vec![])
                .unwrap();
        }

        // Every owner confirms twice concurrently; exactly one attempt each succeeds
        let mut handles = Vec::new();
        for owner in ["alice", "bob", "carol", "alice", "bob", "carol"] {
            let state = state.clone();
            let address = address.clone();
            handles.push(tokio::spawn(async move {
                confirm_transaction(State(state), Path((address, 0)), caller(owner))
                    .await
                    .is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 3);
        let factory = state.factory.read().await;
        let wallet = factory.get(&address).unwrap();
        assert_eq!(wallet.get_transaction(0).unwrap().num_confirmations, 3);
        assert_eq!(wallet.events().len(), 4);
    }
}
