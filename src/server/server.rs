use anyhow::{Context, Result};
use axum::{
    extract::State,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use super::metrics::metrics_handler;
use super::state::{GuardedAnalyzer, ServerState};
use super::{log_requests, ServerConfig};
use crate::affect::AffectStatus;
use crate::analysis::{AnalyzeRequest, Analyzer};
use crate::classifier::ModelsStatus;
use crate::inference_stats::StatsSnapshot;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ModelsResponse {
    models: ModelsStatus,
    vad: AffectStatus,
}

#[derive(Serialize)]
struct ModelLoadTimes {
    sentiment: Option<f64>,
    emotion: Option<f64>,
}

#[derive(Serialize)]
struct MetricsResponse {
    #[serde(flatten)]
    stats: StatsSnapshot,
    model_load_sec: ModelLoadTimes,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

async fn analyze(
    State(analyzer): State<GuardedAnalyzer>,
    Json(request): Json<AnalyzeRequest>,
) -> Response {
    match analyzer.analyze(&request.text).await {
        Ok(response) => Json(response).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn models_status(State(analyzer): State<GuardedAnalyzer>) -> impl IntoResponse {
    Json(ModelsResponse {
        models: analyzer.models().status().await,
        vad: analyzer.affect().status(),
    })
}

async fn metrics_summary(State(analyzer): State<GuardedAnalyzer>) -> impl IntoResponse {
    let models = analyzer.models().status().await;
    Json(MetricsResponse {
        stats: analyzer.stats().snapshot(),
        model_load_sec: ModelLoadTimes {
            sentiment: models.sentiment.load_time_sec,
            emotion: models.emotion.load_time_sec,
        },
    })
}

pub fn make_app(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .route("/models", get(models_status))
        .route("/metrics", get(metrics_summary))
        .layer(middleware::from_fn_with_state(state.clone(), log_requests))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves the API on `config.port` and the Prometheus endpoint on `config.metrics_port`.
pub async fn run_server(config: ServerConfig, analyzer: Arc<Analyzer>) -> Result<()> {
    let state = ServerState::new(config.clone(), analyzer);
    let app = make_app(state);

    let metrics_address = format!("{}:{}", config.host, config.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", metrics_address))?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    let address = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind server to {}", address))?;
    info!("Listening on {}", address);

    Ok(axum::serve(listener, app).await?)
}
