//! Servidor HTTP Axum que expõe transformação, realinhamento e agregação

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use ctner_core::{
    aggregate, realign, AggregatorConfig, CtnerError, LabelDistribution, SlotRetention, Span,
    Transformer, TransformerConfig,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    transformer: Transformer,
    retention: SlotRetention,
}

#[derive(Deserialize)]
struct TransformRequest {
    text: String,
}

#[derive(Serialize)]
struct TransformResponse {
    text: String,
    tokens: Vec<String>,
}

#[derive(Deserialize)]
struct RealignRequest {
    text: String,
    #[serde(default)]
    spans: Vec<Span>,
}

#[derive(Deserialize)]
struct AggregateRequest {
    tokens: Vec<String>,
    distributions: Vec<LabelDistribution>,
    #[serde(default)]
    retention: Option<SlotRetention>,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let state = Arc::new(AppState {
        transformer: Transformer::new(TransformerConfig::default()),
        retention: AggregatorConfig::default().retention,
    });

    let addr = std::env::var("CTNER_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("servidor ctner iniciado em http://{addr}");
    axum::serve(listener, app(state)).await
}

fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/transform", post(transform_handler))
        .route("/realign", post(realign_handler))
        .route("/aggregate", post(aggregate_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Texto bruto -> texto transformado e seus tokens
async fn transform_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransformRequest>,
) -> Response {
    if req.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Texto vazio");
    }
    let tokens = state.transformer.tokenize(&req.text);
    Json(TransformResponse {
        text: tokens.join(" "),
        tokens,
    })
    .into_response()
}

/// Spans do texto anotado -> spans sobre o texto transformado
async fn realign_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RealignRequest>,
) -> Response {
    match realign(&state.transformer, &req.text, &req.spans) {
        Ok(labeled) => Json(labeled).into_response(),
        Err(err) => unprocessable(err),
    }
}

/// Scores brutos por token -> slots agrupados por rótulo. Nenhum rótulo é
/// filtrado: o de fundo volta junto com os demais.
async fn aggregate_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AggregateRequest>,
) -> Response {
    let retention = req.retention.unwrap_or(state.retention);
    match aggregate(&req.tokens, &req.distributions, retention) {
        Ok(grouped) => Json(grouped).into_response(),
        Err(err) => unprocessable(err),
    }
}

fn unprocessable(err: CtnerError) -> Response {
    warn!(%err, "request rejected");
    error_response(StatusCode::UNPROCESSABLE_ENTITY, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
