//! HTTP API: message console, catalog lookups, health and metrics

use crate::gateway::QueryGateway;
use crate::metrics;
use crate::response::GatewayResponse;
use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<QueryGateway>,
}

/// Console message request
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub message: String,
    #[serde(default = "default_session")]
    pub session_id: String,
    #[serde(default)]
    pub database: Option<String>,
}

fn default_session() -> String {
    "default".to_string()
}

/// Console reply: the tagged response plus its plain-text rendering
#[derive(Debug, Serialize)]
pub struct MessageReply {
    #[serde(flatten)]
    pub response: GatewayResponse,
    pub text: String,
}

impl From<GatewayResponse> for MessageReply {
    fn from(response: GatewayResponse) -> Self {
        let text = response.render();
        Self { response, text }
    }
}

#[derive(Debug, Deserialize)]
pub struct TablesQuery {
    pub database: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub auth_method: String,
    pub active_sessions: usize,
}

/// Build the router with permissive CORS
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(prometheus_metrics))
        .route("/api/message", post(handle_message))
        .route("/api/databases", get(list_databases))
        .route("/api/tables", get(list_tables))
        .layer(cors)
        .with_state(state)
}

/// Route a console message through the gateway
pub async fn handle_message(
    State(state): State<AppState>,
    Json(request): Json<MessageRequest>,
) -> impl IntoResponse {
    info!(session_id = %request.session_id, "HTTP message request");
    let response = state
        .gateway
        .handle_with_database(
            &request.session_id,
            &request.message,
            request.database.as_deref(),
        )
        .await;
    (StatusCode::OK, Json(MessageReply::from(response)))
}

pub async fn list_databases(State(state): State<AppState>) -> impl IntoResponse {
    match state.gateway.list_databases().await {
        Ok(databases) => Json(json!({"status": "success", "databases": databases})),
        Err(failure) => {
            warn!("Database listing failed: {}", failure);
            Json(json!({"status": "error", "error": failure.to_string()}))
        }
    }
}

pub async fn list_tables(
    State(state): State<AppState>,
    Query(query): Query<TablesQuery>,
) -> impl IntoResponse {
    let Some(database) = query.database.filter(|db| !db.trim().is_empty()) else {
        return Json(json!({"status": "error", "error": "Database parameter required"}));
    };
    match state.gateway.list_tables(&database).await {
        Ok(tables) => Json(json!({"status": "success", "database": database, "tables": tables})),
        Err(failure) => {
            warn!(database = %database, "Table listing failed: {}", failure);
            Json(json!({"status": "error", "error": failure.to_string()}))
        }
    }
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
        auth_method: state
            .gateway
            .auth_kind()
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "not negotiated".to_string()),
        active_sessions: state.gateway.sessions().len(),
    })
}

/// Ready once an auth method has been negotiated
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.gateway.auth_kind() {
        Some(_) => (StatusCode::OK, "OK"),
        None => (StatusCode::SERVICE_UNAVAILABLE, "auth not negotiated"),
    }
}

/// Root endpoint
pub async fn root() -> &'static str {
    "querybot gateway - natural language to SQL over a remote query endpoint"
}

/// Prometheus metrics endpoint
pub async fn prometheus_metrics() -> impl IntoResponse {
    let body = metrics::encode_metrics();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        body,
    )
}
