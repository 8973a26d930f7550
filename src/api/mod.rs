use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::Json,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::classifier::{Classifier, HttpIpIntel};
use crate::config::EngineConfig;
use crate::error::{Result, VerdictError};
use crate::geolocation::GeoLocator;
use crate::types::ApiResponse;

mod handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Signal-fusion classifier
    classifier: Arc<Classifier<HttpIpIntel>>,

    /// Geolocation lookup with on-disk cache
    locator: Arc<GeoLocator<HttpIpIntel>>,
}

/// Start the API server
pub async fn start_api_server(config: EngineConfig) -> Result<()> {
    let addr = SocketAddr::from_str(&config.listen_addr)
        .map_err(|e| VerdictError::Api(format!("Invalid listen address: {}", e)))?;

    let state = AppState {
        classifier: Arc::new(Classifier::new(HttpIpIntel::new(&config.intel)?)),
        locator: Arc::new(GeoLocator::from_config(&config)?),
    };

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    // Build router
    let app = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/inspect", get(handlers::inspect))
        .route("/api/whoami", get(handlers::whoami))
        .route("/api/warning", get(handlers::warning))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    info!("Starting identity-resolution server on {}", addr);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();

    axum::Server::bind(&addr)
        .serve(make_service)
        .await
        .map_err(|e| VerdictError::Api(format!("Server error: {}", e)))?;

    Ok(())
}

/// Handle API errors with appropriate status codes and structured responses
impl IntoResponse for VerdictError {
    fn into_response(self) -> Response {
        let status = match &self {
            VerdictError::InvalidIp(_) | VerdictError::Configuration(_) => StatusCode::BAD_REQUEST,
            VerdictError::Network(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("API error: {}", self);
        }

        let response = ApiResponse::<()>::error(self.to_string());
        (status, Json(response)).into_response()
    }
}
