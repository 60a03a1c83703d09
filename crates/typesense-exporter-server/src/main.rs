use std::{sync::Arc, time::Duration};

use clap::Parser;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::info;
use tracing_subscriber::EnvFilter;
use typesense_exporter_collector::{
    ApiStatsCollector, ClusterMetricsCollector, Exporter, StatCollector, TypesenseClient,
};
use url::Url;

use crate::router::{AppState, exporter_router};

mod handlers;
mod router;

const API_KEY_HEADER: &str = "x-typesense-api-key";
const API_KEY_ENV: &str = "TYPESENSE_API_KEY";

#[derive(Parser)]
#[command(
    name = "typesense-exporter",
    about = "Prometheus exporter for Typesense search clusters"
)]
struct Cli {
    /// Address to listen on for the metrics interface.
    #[arg(long, default_value = "0.0.0.0:9115")]
    listen_address: String,

    /// Path under which to expose metrics.
    #[arg(long, default_value = "/metrics")]
    telemetry_path: String,

    /// HTTP API address of the Typesense node to scrape.
    #[arg(long, default_value = "http://localhost:8108")]
    typesense_url: String,

    /// Timeout for requests against the Typesense endpoints, in seconds.
    #[arg(long, default_value_t = 5)]
    typesense_timeout_secs: u64,

    /// API key for Typesense; falls back to the TYPESENSE_API_KEY environment variable.
    #[arg(long)]
    typesense_api_key: Option<String>,

    /// Log level directive.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_new(&cli.log_level)?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let api_key = cli
        .typesense_api_key
        .or_else(|| std::env::var(API_KEY_ENV).ok())
        .unwrap_or_default();
    if api_key.is_empty() {
        return Err("no API key provided (use --typesense-api-key or TYPESENSE_API_KEY)".into());
    }

    let typesense_url = Url::parse(&cli.typesense_url)?;

    let mut headers = HeaderMap::new();
    headers.insert(API_KEY_HEADER, HeaderValue::from_str(&api_key)?);
    let http = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(cli.typesense_timeout_secs))
        .build()?;
    let client = TypesenseClient::new(http, typesense_url);

    let collectors: Vec<Arc<dyn StatCollector>> = vec![
        Arc::new(ClusterMetricsCollector::new(client.clone())),
        Arc::new(ApiStatsCollector::new(client)),
    ];
    let exporter = Exporter::new(collectors);

    let state = Arc::new(AppState {
        exporter,
        telemetry_path: cli.telemetry_path,
    });
    let app = exporter_router(state);

    let listener = tokio::net::TcpListener::bind(&cli.listen_address).await?;
    info!("typesense exporter listening on {}", cli.listen_address);
    axum::serve(listener, app).await?;

    Ok(())
}
