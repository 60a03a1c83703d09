pub mod client;
pub mod collectors;
pub mod error;
pub mod exporter;
pub mod metrics;

pub use client::TypesenseClient;
pub use collectors::{ApiStatsCollector, ClusterMetricsCollector, StatCollector};
pub use error::ScrapeError;
pub use exporter::Exporter;
