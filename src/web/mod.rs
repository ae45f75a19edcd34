pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod ui;

use crate::labels::LabelMap;
use crate::models::ModelManager;
use crate::pipeline::Pipeline;
use crate::{Config, Result};
use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer};

/// Shared request state: configuration plus the injected pipeline.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<Pipeline>,
}

pub async fn serve(config: Config) -> Result<()> {
    // Label table and model handles load once; both are shared read-only
    // for the life of the process.
    let labels = Arc::new(LabelMap::load(&config.labels_path())?);
    let manager = Arc::new(ModelManager::init(&config, &labels)?);

    if let Some(parent) = config.annotated_image_path().parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pipeline = Arc::new(Pipeline::new(
        manager,
        labels,
        config.annotated_image_path(),
    ));

    let state = AppState {
        config: config.clone(),
        pipeline,
    };

    let app = create_app(state);

    let addr: SocketAddr = config.bind_addr.parse().map_err(|e| {
        crate::DermaError::Config(format!("Invalid bind address {}: {}", config.bind_addr, e))
    })?;

    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("API endpoints:");
    tracing::info!("  POST /predict           - JSON base64 upload");
    tracing::info!("  POST /predict/upload    - Multipart file upload");
    tracing::info!("  GET  /predict/annotated - Last detection artifact");
    tracing::info!("  GET  /                  - Web UI");
    tracing::info!("  GET  /health            - Health check");
    tracing::info!("  GET  /api/info          - Service information");

    let listener = TcpListener::bind(&addr).await.map_err(|e| {
        crate::DermaError::Internal(format!("Failed to bind to address {}: {}", addr, e))
    })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::DermaError::Internal(format!("Server failed to start: {}", e)))?;

    Ok(())
}

fn create_app(state: AppState) -> Router {
    let max_request_size = state.config.server_config.max_request_size;
    let request_timeout = state.config.server_config.request_timeout;

    Router::new()
        .route("/predict", post(handlers::predict_json_handler))
        .route("/predict/upload", post(handlers::predict_upload_handler))
        .route("/predict/annotated", get(handlers::annotated_image_handler))
        .route("/", get(ui::index_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(RequestBodyLimitLayer::new(max_request_size))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Service information endpoint
async fn info_handler(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let stats = state.pipeline.manager().stats();
    Json(json!({
        "service": "DermaScan",
        "version": env!("CARGO_PKG_VERSION"),
        "description": env!("CARGO_PKG_DESCRIPTION"),
        "models": stats,
        "features": {
            "dual_upload_modes": true,
            "variants": ["detector", "classifier", "forest"],
            "annotated_artifact": stats.has_detector
        }
    }))
}
