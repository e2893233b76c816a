//! HTTP driver for a single in-memory chain.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use minichain_core::{
    hash::to_hex, Block, MineError, MiningLimits, SharedChain, Transaction,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub chain: SharedChain,
    /// Upper bound on one mining request; `None` mines until solved.
    pub mining_timeout: Option<Duration>,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Deserialize)]
pub struct Head {
    pub height: u64,
    pub hash: String,
}

#[derive(Serialize, Deserialize)]
pub struct TxIn {
    #[serde(default)]
    pub from: Option<String>,
    pub to: String,
    pub amount: u64,
}

#[derive(Serialize, Deserialize)]
pub struct TxAccepted {
    pub accepted: bool,
    pub pending: usize,
}

#[derive(Serialize, Deserialize)]
pub struct MineIn {
    pub reward_address: String,
}

#[derive(Serialize, Deserialize)]
pub struct Balance {
    pub address: String,
    pub balance: i128,
}

#[derive(Serialize, Deserialize)]
pub struct Validity {
    pub valid: bool,
    pub strict: bool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(Health { status: "ok" }) }))
        .route("/chain/head", get(head))
        .route("/chain/blocks", get(blocks))
        .route("/chain/valid", get(validity))
        .route("/tx", post(submit_tx))
        .route("/tx/pending", get(pending))
        .route("/mine", post(mine))
        .route("/balance/{address}", get(balance))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn head(State(state): State<AppState>) -> Json<Head> {
    let (height, hash) = state
        .chain
        .with_chain(|c| (c.len() as u64 - 1, to_hex(&c.latest_block().hash)));
    Json(Head { height, hash })
}

async fn blocks(State(state): State<AppState>) -> Json<Vec<Block>> {
    Json(state.chain.blocks())
}

async fn validity(State(state): State<AppState>) -> Json<Validity> {
    Json(Validity {
        valid: state.chain.is_chain_valid(),
        strict: state.chain.validate_strict().is_ok(),
    })
}

async fn submit_tx(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> (StatusCode, Json<TxAccepted>) {
    let tx = Transaction {
        from: tx.from,
        to: tx.to,
        amount: tx.amount,
    };
    let pending = state.chain.create_transaction(tx);
    (
        StatusCode::ACCEPTED,
        Json(TxAccepted {
            accepted: true,
            pending,
        }),
    )
}

async fn pending(State(state): State<AppState>) -> Json<Vec<Transaction>> {
    Json(state.chain.pending_transactions())
}

async fn balance(State(state): State<AppState>, Path(address): Path<String>) -> Json<Balance> {
    let balance = state.chain.balance_of_address(&address);
    Json(Balance { address, balance })
}

async fn mine(State(state): State<AppState>, Json(req): Json<MineIn>) -> Response {
    let chain = state.chain.clone();
    let limits = match state.mining_timeout {
        Some(timeout) => MiningLimits::unbounded().with_timeout(timeout),
        None => MiningLimits::unbounded(),
    };
    let joined = tokio::task::spawn_blocking(move || {
        chain.mine_pending_transactions_with(req.reward_address, &limits)
    })
    .await;

    match joined {
        Ok(Ok(block)) => {
            info!(hash = %to_hex(&block.hash), "mined via api");
            (StatusCode::CREATED, Json(block)).into_response()
        }
        Ok(Err(err @ MineError::DeadlineExceeded)) => {
            warn!("{err}");
            error_response(StatusCode::REQUEST_TIMEOUT, err.to_string())
        }
        Ok(Err(err)) => error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
        Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(serde_json::json!({ "error": error }))).into_response()
}
