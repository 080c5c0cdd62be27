use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use mc_blockchain::Blockchain;
use mc_sync::{
    protocol::{PATH_BROADCAST_BLOCK, PATH_BROADCAST_TRANSACTION, PATH_CHAIN},
    BlockBroadcast, TransactionBroadcast,
};
use mc_transaction::{Transaction, TransactionSigner, Wallet};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    ledger::{BlockReception, Origin, SharedLedger},
    tasks, AdmissionError, MiningError, NodeError,
};

type ApiResponse = (StatusCode, Json<Value>);

/// Shared state of the HTTP surface: the peer endpoints other nodes call
/// during relay and resolution, plus a few operator endpoints.
#[derive(Clone)]
pub struct ApiState {
    pub ledger: SharedLedger,
    /// Signs operator-submitted transfers.  `None` on watch-only nodes.
    pub wallet: Option<Arc<Wallet>>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(PATH_CHAIN, get(get_chain))
        .route(PATH_BROADCAST_TRANSACTION, post(broadcast_transaction))
        .route(PATH_BROADCAST_BLOCK, post(broadcast_block))
        .route("/balance", get(get_balance))
        .route("/transactions", get(get_open_transactions))
        .route("/transaction", post(new_transaction))
        .route("/mine", post(mine))
        .route("/resolve", post(resolve))
        .route("/peers", get(get_peers))
        .route("/peer", post(add_peer))
        .route("/peer/:addr", delete(remove_peer))
        .with_state(state)
}

/// Serve the API on `port` until `shutdown` fires.
pub async fn serve(port: u16, state: ApiState, shutdown: CancellationToken) -> Result<(), NodeError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

fn reply(status: StatusCode, body: Value) -> ApiResponse {
    (status, Json(body))
}

// ── Peer endpoints ───────────────────────────────────────────────────────────

async fn get_chain(State(state): State<ApiState>) -> Json<Blockchain> {
    Json(state.ledger.lock().await.chain().clone())
}

async fn broadcast_transaction(
    State(state): State<ApiState>,
    Json(msg): Json<TransactionBroadcast>,
) -> ApiResponse {
    let mut ledger = state.ledger.lock().await;
    match ledger.admit_transaction(&msg.sender, &msg.recipient, &msg.signature, msg.amount, Origin::Relay) {
        Ok(tx) => reply(
            StatusCode::CREATED,
            json!({ "message": "transaction added", "transaction": tx }),
        ),
        Err(e) => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": format!("transaction rejected: {e}") }),
        ),
    }
}

async fn broadcast_block(State(state): State<ApiState>, Json(msg): Json<BlockBroadcast>) -> ApiResponse {
    let mut ledger = state.ledger.lock().await;
    match ledger.receive_block(msg.block) {
        BlockReception::Added => reply(StatusCode::CREATED, json!({ "message": "block added" })),
        BlockReception::Behind => reply(
            StatusCode::OK,
            json!({ "message": "local chain is behind; resolution scheduled" }),
        ),
        BlockReception::Stale => reply(
            StatusCode::CONFLICT,
            json!({ "message": "block is behind the local chain" }),
        ),
        BlockReception::Rejected(reason) => reply(
            StatusCode::CONFLICT,
            json!({ "message": format!("block rejected: {reason}") }),
        ),
    }
}

// ── Operator endpoints ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct BalanceQuery {
    participant: Option<String>,
}

async fn get_balance(State(state): State<ApiState>, Query(query): Query<BalanceQuery>) -> ApiResponse {
    let ledger = state.ledger.lock().await;
    let participant = query.participant.as_deref();
    match ledger.balance(participant) {
        Some(balance) => reply(
            StatusCode::OK,
            json!({
                "participant": participant.or(ledger.hosting_node()),
                "balance": balance,
            }),
        ),
        None => reply(
            StatusCode::BAD_REQUEST,
            json!({ "message": "no participant given and no hosting node configured" }),
        ),
    }
}

async fn get_open_transactions(State(state): State<ApiState>) -> Json<Vec<Transaction>> {
    Json(state.ledger.lock().await.open_transactions().to_vec())
}

#[derive(Debug, Deserialize)]
struct NewTransaction {
    recipient: String,
    amount: f64,
}

async fn new_transaction(State(state): State<ApiState>, Json(req): Json<NewTransaction>) -> ApiResponse {
    let Some(wallet) = state.wallet.as_ref() else {
        return reply(
            StatusCode::BAD_REQUEST,
            json!({ "message": "node has no wallet" }),
        );
    };
    let tx = wallet.sign_transaction(&req.recipient, req.amount);

    match tasks::submit_and_relay(state.ledger.clone(), tx).await {
        Ok(tx) => {
            let funds = state.ledger.lock().await.balance(None);
            reply(StatusCode::CREATED, json!({ "transaction": tx, "funds": funds }))
        }
        Err(e @ AdmissionError::NoHostingNode) => {
            reply(StatusCode::BAD_REQUEST, json!({ "message": e.to_string() }))
        }
        Err(e) => reply(StatusCode::UNPROCESSABLE_ENTITY, json!({ "message": e.to_string() })),
    }
}

async fn mine(State(state): State<ApiState>) -> ApiResponse {
    match tasks::mine_in_background(state.ledger.clone()).await {
        Ok(block) => {
            let funds = state.ledger.lock().await.balance(None);
            reply(StatusCode::CREATED, json!({ "block": block, "funds": funds }))
        }
        Err(e @ MiningError::NoHostingNode) => {
            reply(StatusCode::BAD_REQUEST, json!({ "message": e.to_string() }))
        }
        Err(e @ MiningError::InvalidPendingTransaction) => reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({ "message": e.to_string() }),
        ),
        Err(e) => reply(StatusCode::CONFLICT, json!({ "message": e.to_string() })),
    }
}

async fn resolve(State(state): State<ApiState>) -> ApiResponse {
    let replaced = tasks::resolve_conflicts(state.ledger.clone()).await;
    let length = state.ledger.lock().await.chain().len();
    reply(StatusCode::OK, json!({ "replaced": replaced, "length": length }))
}

async fn get_peers(State(state): State<ApiState>) -> Json<Vec<String>> {
    Json(state.ledger.lock().await.peer_list())
}

#[derive(Debug, Deserialize)]
struct PeerRequest {
    peer: String,
}

async fn add_peer(State(state): State<ApiState>, Json(req): Json<PeerRequest>) -> ApiResponse {
    let mut ledger = state.ledger.lock().await;
    let added = ledger.add_peer(req.peer);
    reply(
        StatusCode::CREATED,
        json!({ "added": added, "peers": ledger.peer_list() }),
    )
}

async fn remove_peer(State(state): State<ApiState>, Path(addr): Path<String>) -> ApiResponse {
    let mut ledger = state.ledger.lock().await;
    if ledger.remove_peer(&addr) {
        reply(StatusCode::OK, json!({ "peers": ledger.peer_list() }))
    } else {
        reply(StatusCode::NOT_FOUND, json!({ "message": format!("unknown peer {addr}") }))
    }
}
