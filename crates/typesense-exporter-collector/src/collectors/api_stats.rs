use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::{
    client::TypesenseClient,
    collectors::{EndpointStatus, ScalarMetric, StatCollector, collect_scalars},
    error::ScrapeError,
    metrics::types::{CollectedMetric, MetricDescriptor, MetricSample, MetricType},
};

pub const API_STATS_PATH: &str = "/stats.json";

const SUBSYSTEM: &str = "api_stats";

/// Open-ended mapping from a compound "METHOD /endpoint" key to a value.
/// Ordered so exposition output is deterministic.
pub type StatEntryMap = BTreeMap<String, f64>;

/// Snapshot of `/stats.json`. Absent fields default to zero, matching the
/// upstream's behavior on an idle node.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApiStatsResponse {
    pub delete_latency_ms: f64,
    pub delete_requests_per_second: f64,
    pub import_latency_ms: f64,
    pub import_requests_per_second: f64,
    pub latency_ms: StatEntryMap,
    pub pending_write_batches: f64,
    pub requests_per_second: StatEntryMap,
    pub search_latency_ms: f64,
    pub search_requests_per_second: f64,
    pub total_requests_per_second: f64,
    pub write_latency_ms: f64,
    pub write_requests_per_second: f64,
}

/// One vector metric definition: identity plus accessors for the upstream
/// mapping it exposes. Cardinality follows the upstream key set per scrape.
pub struct VectorMetric {
    pub descriptor: MetricDescriptor,
    pub entries: fn(&ApiStatsResponse) -> &StatEntryMap,
    pub value: fn(f64) -> f64,
}

/// Split a compound stat key ("GET /collections") into method and endpoint.
///
/// The upstream convention is exactly one space between the two halves; any
/// other shape is rejected so a malformed key surfaces as a parse failure
/// instead of a mislabeled series.
fn split_stat_key(key: &str) -> Option<(&str, &str)> {
    let (method, endpoint) = key.split_once(' ')?;
    if method.is_empty() || endpoint.is_empty() || endpoint.contains(' ') {
        return None;
    }
    Some((method, endpoint))
}

fn api_metric_table() -> Vec<ScalarMetric<ApiStatsResponse>> {
    let labels: &[&str] = &["cluster"];
    vec![
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "delete_latency_seconds",
                "Latency of delete requests in seconds.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.delete_latency_ms / 1000.0,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "delete_requests_per_second",
                "Delete requests per second.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.delete_requests_per_second,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "import_latency_seconds",
                "Latency of import requests in seconds.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.import_latency_ms / 1000.0,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "import_requests_per_second",
                "Import requests per second.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.import_requests_per_second,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "pending_write_batches",
                "Number of write batches waiting to be applied.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.pending_write_batches,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "search_latency_seconds",
                "Latency of search requests in seconds.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.search_latency_ms / 1000.0,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "search_requests_per_second",
                "Search requests per second.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.search_requests_per_second,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "total_requests_per_second",
                "Total requests per second across all endpoints.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.total_requests_per_second,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "write_latency_seconds",
                "Latency of write requests in seconds.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.write_latency_ms / 1000.0,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "write_requests_per_second",
                "Write requests per second.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.write_requests_per_second,
        },
    ]
}

fn api_stat_table() -> Vec<VectorMetric> {
    let labels: &[&str] = &["cluster", "method", "endpoint"];
    vec![
        VectorMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "latency_seconds",
                "Request latency per method and endpoint in seconds.",
                MetricType::Gauge,
                labels,
            ),
            entries: |resp| &resp.latency_ms,
            value: |raw| raw / 1000.0,
        },
        VectorMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "requests_per_second",
                "Requests per second per method and endpoint.",
                MetricType::Gauge,
                labels,
            ),
            entries: |resp| &resp.requests_per_second,
            value: |raw| raw,
        },
    ]
}

/// Collector for the aggregate API statistics endpoint.
pub struct ApiStatsCollector {
    client: TypesenseClient,
    status: EndpointStatus,
    metrics: Vec<ScalarMetric<ApiStatsResponse>>,
    stats: Vec<VectorMetric>,
}

impl ApiStatsCollector {
    pub fn new(client: TypesenseClient) -> Self {
        Self {
            client,
            status: EndpointStatus::new(SUBSYSTEM, "API stats"),
            metrics: api_metric_table(),
            stats: api_stat_table(),
        }
    }

    pub fn status(&self) -> &EndpointStatus {
        &self.status
    }

    async fn scrape(&self) -> Result<Vec<CollectedMetric>, ScrapeError> {
        let response: ApiStatsResponse = self.client.get_json(API_STATS_PATH).await?;
        let mut collected = collect_scalars(&self.metrics, &response, self.client.cluster());
        for stat in &self.stats {
            collected.push(self.collect_stat(stat, &response)?);
        }
        Ok(collected)
    }

    fn collect_stat(
        &self,
        stat: &VectorMetric,
        response: &ApiStatsResponse,
    ) -> Result<CollectedMetric, ScrapeError> {
        let entries = (stat.entries)(response);
        let cluster = self.client.cluster();
        let mut samples = Vec::with_capacity(entries.len());
        for (key, raw) in entries {
            let (method, endpoint) = split_stat_key(key).ok_or_else(|| ScrapeError::Parse {
                url: self.client.endpoint_url(API_STATS_PATH).to_string(),
                reason: format!("malformed stat key {key:?}"),
            })?;
            samples.push(MetricSample {
                labels: vec![
                    ("cluster".to_string(), cluster.to_string()),
                    ("method".to_string(), method.to_string()),
                    ("endpoint".to_string(), endpoint.to_string()),
                ],
                value: stat.descriptor.metric_type.sample_value((stat.value)(*raw)),
            });
        }
        Ok(CollectedMetric {
            descriptor: stat.descriptor.clone(),
            samples,
        })
    }
}

#[async_trait]
impl StatCollector for ApiStatsCollector {
    fn name(&self) -> &'static str {
        SUBSYSTEM
    }

    async fn update(&self, sink: &mut Vec<CollectedMetric>) -> Result<(), ScrapeError> {
        self.status.record_attempt();
        let result = match self.scrape().await {
            Ok(metrics) => {
                self.status.set_up(true);
                sink.extend(metrics);
                Ok(())
            }
            Err(err) => {
                if err.is_parse() {
                    self.status.record_parse_failure();
                }
                self.status.set_up(false);
                warn!(error = %err, "failed to fetch and decode API stats");
                Err(err)
            }
        };
        sink.extend(self.status.health_metrics());
        result
    }
}
