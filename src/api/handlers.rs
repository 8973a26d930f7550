use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::info;

use crate::api::AppState;
use crate::report::{self, InspectionReport};
use crate::resolver::resolve_client_ip;
use crate::signals::RequestSignals;
use crate::types::ApiResponse;

/// Run the full engine pipeline for one request
async fn build_report(state: &AppState, headers: &HeaderMap, peer: SocketAddr) -> InspectionReport {
    let signals = RequestSignals::from_parts(headers, peer);
    let resolution = resolve_client_ip(&signals);
    let detection = state.classifier.classify(resolution.client_ip, &signals).await;
    let location = state.locator.locate(resolution.client_ip).await;

    let report = InspectionReport {
        resolution,
        detection,
        location,
    };
    info!("{}", report::log_line(&report));

    report
}

/// Full inspection: resolution, classification, and geolocation
pub async fn inspect(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let report = build_report(&state, &headers, peer).await;
    Json(ApiResponse::success(report))
}

/// Minimal echo of the resolved address and its location
pub async fn whoami(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let signals = RequestSignals::from_parts(&headers, peer);
    let resolution = resolve_client_ip(&signals);
    let location = state.locator.locate(resolution.client_ip).await;

    Json(ApiResponse::success(json!({
        "ip": resolution.client_ip.to_string(),
        "via_frontend": resolution.via_frontend,
        "location": location,
    })))
}

/// Plain-text warning page rendered from the engine output
pub async fn warning(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let report = build_report(&state, &headers, peer).await;
    report::warning_page(&report)
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::success(json!({ "status": "ok" })))
}
