//! REST endpoints for operator visibility and counter access
//!
//! `/health` doubles as the liveness-probe target peers hit when judging
//! this node's responsiveness.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::domain::Operation;
use crate::infra::NodeError;
use crate::server::AppState;

/// Build the node's router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/counter", get(get_counter))
        .route("/increment", post(increment_counter))
        .route("/log", get(get_log))
        .route("/status", get(get_status))
        .route("/members", get(get_members))
        .route("/health", get(health_check))
        .route("/wallet-info", get(get_wallet_info))
}

#[derive(Debug, Serialize)]
struct CounterResponse {
    value: u64,
    instance_id: String,
    is_leader: bool,
}

async fn get_counter(State(state): State<AppState>) -> Json<CounterResponse> {
    Json(CounterResponse {
        value: state.node.counter_value().await,
        instance_id: state.identity.instance_id.clone(),
        is_leader: state.node.leader_state().await.is_self_leader,
    })
}

#[derive(Debug, Serialize)]
struct IncrementResponse {
    success: bool,
    new_value: u64,
    operation_id: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

async fn increment_counter(
    State(state): State<AppState>,
) -> Result<Json<IncrementResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.node.increment(state.identity.wallet_address).await {
        Ok(operation) => {
            let operation_id = state.node.operations().await.len();
            Ok(Json(IncrementResponse {
                success: true,
                new_value: operation.resulting_value,
                operation_id,
            }))
        }
        Err(NodeError::NotLeader) => Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse {
                error: "only the leader can increment the counter".to_string(),
            }),
        )),
        Err(err) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )),
    }
}

#[derive(Debug, Serialize)]
struct OperationView {
    timestamp: String,
    operation: &'static str,
    resulting_value: u64,
    actor: String,
}

impl From<&Operation> for OperationView {
    fn from(op: &Operation) -> Self {
        Self {
            timestamp: op.timestamp.to_rfc3339(),
            operation: op.kind.as_str(),
            resulting_value: op.resulting_value,
            actor: op.actor.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct LogResponse {
    operations: Vec<OperationView>,
    total_operations: usize,
}

async fn get_log(State(state): State<AppState>) -> Json<LogResponse> {
    let operations = state.node.operations().await;
    Json(LogResponse {
        total_operations: operations.len(),
        operations: operations.iter().map(OperationView::from).collect(),
    })
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    instance_id: String,
    wallet_address: String,
    is_leader: bool,
    counter_value: u64,
    total_active_nodes: u64,
    required_votes: u64,
    current_leader: Option<String>,
    last_leader_heartbeat: Option<String>,
}

async fn get_status(
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    let ledger_error = |err: NodeError| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
    };

    let total_active_nodes = state.ledger.total_active_nodes().await.map_err(ledger_error)?;
    let required_votes = state.ledger.required_votes().await.map_err(ledger_error)?;
    let current_leader = state.ledger.current_leader().await.map_err(ledger_error)?;

    let leader_state = state.node.leader_state().await;

    Ok(Json(StatusResponse {
        instance_id: state.identity.instance_id.clone(),
        wallet_address: state.identity.wallet_address.to_string(),
        is_leader: leader_state.is_self_leader,
        counter_value: state.node.counter_value().await,
        total_active_nodes,
        required_votes,
        current_leader: current_leader.map(|a| a.to_string()),
        last_leader_heartbeat: leader_state.last_heartbeat.map(|t| t.to_rfc3339()),
    }))
}

#[derive(Debug, Serialize)]
struct MembersResponse {
    active_instances: Vec<String>,
    total_active: usize,
}

async fn get_members(
    State(state): State<AppState>,
) -> Result<Json<MembersResponse>, (StatusCode, Json<ErrorResponse>)> {
    let instances = state.ledger.get_active_instances().await.map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )
    })?;

    Ok(Json(MembersResponse {
        total_active: instances.len(),
        active_instances: instances.iter().map(hex::encode).collect(),
    }))
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    instance_id: String,
    timestamp: String,
}

/// Liveness endpoint probed by peers when this node is the leader.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        instance_id: state.identity.instance_id.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
struct WalletInfoResponse {
    address: String,
    key_path: String,
    key_purpose: String,
    key_provider_url: String,
}

async fn get_wallet_info(State(state): State<AppState>) -> Json<WalletInfoResponse> {
    Json(WalletInfoResponse {
        address: state.identity.wallet_address.to_string(),
        key_path: state.identity.key_path.clone(),
        key_purpose: state.identity.key_purpose.clone(),
        key_provider_url: state.identity.key_provider_url.clone(),
    })
}
