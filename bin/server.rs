// Company Reports - Web Server
// Read-only JSON API over the unified dataset, built once at startup

use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use clap::Parser;
use company_reports::{DataProcessor, PipelineConfig, VERSION};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Shared application state. The snapshot never changes after startup,
/// so readers share it without a lock.
#[derive(Clone)]
struct AppState {
    processor: Arc<DataProcessor>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    companies: usize,
}

#[derive(Parser, Debug)]
#[command(name = "reports-server", version = VERSION)]
struct ServerArgs {
    #[arg(long, env = "REPORTS_JSON", default_value = company_reports::config::DEFAULT_JSON_PATH)]
    json: PathBuf,

    #[arg(long, env = "REPORTS_CSV", default_value = company_reports::config::DEFAULT_CSV_PATH)]
    csv: PathBuf,

    #[arg(long, env = "REPORTS_PDF", default_value = company_reports::config::DEFAULT_PDF_PATH)]
    pdf: PathBuf,

    #[arg(long, env = "REPORTS_PPTX", default_value = company_reports::config::DEFAULT_PPTX_PATH)]
    pptx: PathBuf,

    /// Listen address
    #[arg(long, env = "REPORTS_BIND", default_value = company_reports::config::DEFAULT_BIND_ADDR)]
    bind: String,
}

impl From<ServerArgs> for PipelineConfig {
    fn from(args: ServerArgs) -> Self {
        PipelineConfig {
            json_path: args.json,
            csv_path: args.csv,
            pdf_path: args.pdf,
            pptx_path: args.pptx,
            bind_addr: args.bind,
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: VERSION,
        companies: state.processor.unified_data().companies.len(),
    })
}

/// GET /api/data/all - Unified dataset
async fn get_all_data(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.processor.unified_data().clone())
}

/// GET /api/data/:file_type - One raw cleaned source, `{}` for unknown types
async fn get_source_data(
    State(state): State<AppState>,
    Path(file_type): Path<String>,
) -> impl IntoResponse {
    Json(state.processor.get_data_by_type(&file_type))
}

fn router(processor: Arc<DataProcessor>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/data/all", get(get_all_data))
        .route("/data/:file_type", get(get_source_data))
        .with_state(AppState { processor });

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = PipelineConfig::from(ServerArgs::parse());
    let processor = DataProcessor::load(&config).context("failed to build unified dataset")?;
    let app = router(Arc::new(processor));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "server listening");
    info!("API: http://{}/api/data/all", config.bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
