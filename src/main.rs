// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::analysis_service::AnalysisService;
use crate::application::station_service::StationService;
use crate::application::telemetry_service::TelemetryService;
use crate::infrastructure::config::{load_app_config, ServerSettings};
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    analyze, get_analysis, get_data, health_check, list_base_stations, list_nodes,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let config = load_app_config().context("Failed to load configuration")?;

    // Create repository (infrastructure layer)
    let repository = Arc::new(InfluxRepository::new(
        config.influx.host,
        config.influx.token,
        config.influx.database,
        config.influx.retention_policy,
        config.influx.measurement,
    ));

    // Create services (application layer)
    let station_service = StationService::new(repository.clone());
    let telemetry_service = TelemetryService::new(repository.clone());
    let analysis_service = AnalysisService::new(telemetry_service.clone());

    // Create application state
    let state = Arc::new(AppState {
        station_service,
        telemetry_service,
        analysis_service,
    });

    // Build router (presentation layer)
    // Compression is done per response in json_response, so no CompressionLayer here
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/api/nodes", get(list_nodes))
        .route("/api/nodes/:node/base-stations", get(list_base_stations))
        .route("/api/data/:node/:period", get(get_data))
        .route("/api/analysis/:node/:period", get(get_analysis))
        .route("/api/analyze", post(analyze))
        .layer(cors_layer(&config.server))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config
        .server
        .bind_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_addr))?;
    tracing::info!("Starting transmitter-telemetry service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}

fn cors_layer(server: &ServerSettings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if server.cors_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
