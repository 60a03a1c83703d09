use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::warn;

use crate::{
    client::TypesenseClient,
    collectors::{EndpointStatus, ScalarMetric, StatCollector, collect_scalars},
    error::ScrapeError,
    metrics::types::{CollectedMetric, MetricDescriptor, MetricType},
};

pub const CLUSTER_METRICS_PATH: &str = "/metrics.json";

const SUBSYSTEM: &str = "cluster_metrics";

/// Snapshot of `/metrics.json`.
///
/// Every numeric field arrives as a quoted string; a field that does not
/// parse as a number fails the whole decode. Absent fields default to zero,
/// matching the upstream's sparse responses. Per-core
/// `system_cpuN_active_percentage` fields are machine-dependent and ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClusterMetricsResponse {
    #[serde(deserialize_with = "numeric_string")]
    pub system_cpu_active_percentage: f64,
    #[serde(deserialize_with = "numeric_string")]
    pub system_disk_total_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub system_disk_used_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub system_memory_total_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub system_memory_used_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub system_network_received_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub system_network_sent_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub typesense_memory_active_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub typesense_memory_allocated_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub typesense_memory_fragmentation_ratio: f64,
    #[serde(deserialize_with = "numeric_string")]
    pub typesense_memory_mapped_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub typesense_memory_metadata_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub typesense_memory_resident_bytes: u64,
    #[serde(deserialize_with = "numeric_string")]
    pub typesense_memory_retained_bytes: u64,
}

fn numeric_string<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    value.parse::<T>().map_err(serde::de::Error::custom)
}

fn cluster_metric_table() -> Vec<ScalarMetric<ClusterMetricsResponse>> {
    let labels: &[&str] = &["cluster"];
    vec![
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "system_cpu_active_percentage",
                "Percentage of CPU active across all cores.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.system_cpu_active_percentage,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "system_disk_total_bytes",
                "Total disk capacity in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.system_disk_total_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "system_disk_used_bytes",
                "Disk space in use in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.system_disk_used_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "system_memory_total_bytes",
                "Total system memory in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.system_memory_total_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "system_memory_used_bytes",
                "System memory in use in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.system_memory_used_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "system_network_received_bytes",
                "Total bytes received over the network.",
                MetricType::Counter,
                labels,
            ),
            value: |resp| resp.system_network_received_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "system_network_sent_bytes",
                "Total bytes sent over the network.",
                MetricType::Counter,
                labels,
            ),
            value: |resp| resp.system_network_sent_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "memory_active_bytes",
                "Memory actively used by Typesense in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.typesense_memory_active_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "memory_allocated_bytes",
                "Memory allocated by Typesense in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.typesense_memory_allocated_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "memory_fragmentation_ratio",
                "Typesense allocator fragmentation ratio.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.typesense_memory_fragmentation_ratio,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "memory_mapped_bytes",
                "Memory mapped by Typesense in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.typesense_memory_mapped_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "memory_metadata_bytes",
                "Allocator metadata memory in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.typesense_memory_metadata_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "memory_resident_bytes",
                "Resident memory of the Typesense process in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.typesense_memory_resident_bytes as f64,
        },
        ScalarMetric {
            descriptor: MetricDescriptor::new(
                SUBSYSTEM,
                "memory_retained_bytes",
                "Memory retained by the Typesense allocator in bytes.",
                MetricType::Gauge,
                labels,
            ),
            value: |resp| resp.typesense_memory_retained_bytes as f64,
        },
    ]
}

/// Collector for the cluster resource metrics endpoint.
pub struct ClusterMetricsCollector {
    client: TypesenseClient,
    status: EndpointStatus,
    metrics: Vec<ScalarMetric<ClusterMetricsResponse>>,
}

impl ClusterMetricsCollector {
    pub fn new(client: TypesenseClient) -> Self {
        Self {
            client,
            status: EndpointStatus::new(SUBSYSTEM, "cluster metrics"),
            metrics: cluster_metric_table(),
        }
    }

    pub fn status(&self) -> &EndpointStatus {
        &self.status
    }

    async fn scrape(&self) -> Result<Vec<CollectedMetric>, ScrapeError> {
        let response: ClusterMetricsResponse = self.client.get_json(CLUSTER_METRICS_PATH).await?;
        Ok(collect_scalars(
            &self.metrics,
            &response,
            self.client.cluster(),
        ))
    }
}

#[async_trait]
impl StatCollector for ClusterMetricsCollector {
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
                warn!(error = %err, "failed to fetch and decode cluster metrics");
                Err(err)
            }
        };
        sink.extend(self.status.health_metrics());
        result
    }
}
