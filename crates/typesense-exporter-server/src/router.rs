use std::sync::Arc;

use axum::{Router, routing::get};
use typesense_exporter_collector::Exporter;

use crate::handlers;

pub struct AppState {
    pub exporter: Exporter,
    pub telemetry_path: String,
}

pub fn exporter_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::home::landing_page))
        .route("/healthz", get(handlers::health::health_live))
        .route(
            &state.telemetry_path,
            get(handlers::metrics::prometheus_metrics),
        )
        .with_state(state)
}
