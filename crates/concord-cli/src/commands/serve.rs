//! `concord serve` (the default command): the tool-RPC surface over
//! either line-framed JSON on stdio or HTTP — the core does not care
//! which transport carried a call, so both funnel into the same
//! [`crate::dispatch::dispatch`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::dispatch::dispatch;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct RpcRequest {
    #[serde(default)]
    id: Option<Value>,
    operation: String,
    #[serde(default)]
    args: Value,
}

/// Line-framed JSON over stdio: one request per input line, one response
/// document per output line. Malformed lines are rejected by the
/// transport itself rather than reaching the dispatcher (only the
/// transport's own framing faults are not surfaced as `{"error"}`
/// documents).
async fn run_stdio(state: Arc<AppState>) -> anyhow::Result<()> {
    info!("concord tool-RPC server listening on stdio (line-framed JSON)");
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = reader.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<RpcRequest>(trimmed) {
            Ok(req) => {
                let result = dispatch(&state, &req.operation, req.args);
                match req.id {
                    Some(id) => json!({ "id": id, "result": result }),
                    None => result,
                }
            }
            Err(e) => json!({ "error": format!("malformed request: {e}") }),
        };
        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        stdout.write_all(&out).await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn rpc_handler(State(state): State<Arc<AppState>>, Json(req): Json<RpcRequest>) -> Json<Value> {
    let result = dispatch(&state, &req.operation, req.args);
    match req.id {
        Some(id) => Json(json!({ "id": id, "result": result })),
        None => Json(result),
    }
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn run_http(state: Arc<AppState>, port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/rpc", post(rpc_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "concord tool-RPC server listening on HTTP");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub async fn run(state: Arc<AppState>, http: bool, port: u16) -> anyhow::Result<()> {
    let result = if http { run_http(state.clone(), port).await } else { run_stdio(state.clone()).await };
    if let Err(e) = &result {
        error!(error = %e, "tool-RPC server exited with an error");
    }
    state.shutdown().await;
    result
}
