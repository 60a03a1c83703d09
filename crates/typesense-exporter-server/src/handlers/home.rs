use std::sync::Arc;

use axum::{
    extract::State,
    response::{Html, IntoResponse},
};

use crate::router::AppState;

pub async fn landing_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(format!(
        "<html>\n<head><title>Typesense Exporter</title></head>\n<body>\n<h1>Typesense Exporter</h1>\n<p><a href=\"{}\">Metrics</a></p>\n</body>\n</html>",
        state.telemetry_path
    ))
}
