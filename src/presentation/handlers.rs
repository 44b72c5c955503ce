// HTTP request handlers
use crate::application::analysis_service::{AnalysisOutcome, AnalysisRequest};
use crate::application::telemetry_service::ReadingQuery;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowParams {
    pub base_station: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl WindowParams {
    fn into_query(self, node: String, period: String) -> ReadingQuery {
        ReadingQuery {
            node,
            base_station: self.base_station,
            period,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List all nodes
pub async fn list_nodes(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    let nodes = match state.station_service.list_nodes().await {
        Ok(nodes) => nodes,
        Err(e) => {
            tracing::error!("Error fetching nodes: {:#}", e);
            // the picker copes with an empty list
            Vec::new()
        }
    };
    respond(&headers, &nodes).await
}

/// List the base stations of one node
pub async fn list_base_stations(
    Path(node): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let stations = match state.station_service.list_base_stations(&node).await {
        Ok(stations) => stations,
        Err(e) => {
            tracing::error!("Error fetching base stations for {}: {:#}", node, e);
            Vec::new()
        }
    };
    respond(&headers, &stations).await
}

/// Reading rows of a node for a period
pub async fn get_data(
    Path((node, period)): Path<(String, String)>,
    Query(params): Query<WindowParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let query = params.into_query(node, period);
    let rows = state.telemetry_service.get_readings(&query).await?;
    Ok(respond(&headers, &rows).await)
}

/// Narration for a node over a period
pub async fn get_analysis(
    Path((node, period)): Path<(String, String)>,
    Query(params): Query<WindowParams>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let query = params.into_query(node, period);
    let outcome = state.analysis_service.analyze_window(&query).await?;
    Ok(respond(&headers, &outcome).await)
}

/// Narration for series posted by the dashboard
pub async fn analyze(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnalysisRequest>,
) -> Result<Response, ApiError> {
    let outcome = state.analysis_service.analyze_series(&request)?;
    Ok(respond(&headers, &AnalyzeResponse { analysis: &outcome.html, outcome: &outcome }).await)
}

/// `analysis` is the rendered HTML the dashboard drops into its editor.
#[derive(Serialize)]
struct AnalyzeResponse<'a> {
    analysis: &'a str,
    #[serde(flatten)]
    outcome: &'a AnalysisOutcome,
}

async fn respond<T: Serialize>(headers: &HeaderMap, data: &T) -> Response {
    match json_response(StatusCode::OK, data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}
