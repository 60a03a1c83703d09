pub mod api_stats;
pub mod cluster_metrics;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;

use crate::{
    error::ScrapeError,
    metrics::types::{CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue},
};

pub use api_stats::ApiStatsCollector;
pub use cluster_metrics::ClusterMetricsCollector;

/// Capability interface shared by every upstream endpoint collector.
#[async_trait]
pub trait StatCollector: Send + Sync {
    /// Stable name used for the scrape-health `collector` label.
    fn name(&self) -> &'static str;

    /// Run one fetch/decode/map cycle, pushing produced metrics into `sink`.
    ///
    /// Health metrics (up, total scrapes, parse failures) are always pushed;
    /// field metrics only on a fully successful scrape.
    async fn update(&self, sink: &mut Vec<CollectedMetric>) -> Result<(), ScrapeError>;
}

/// One scalar metric definition: identity plus a pure extraction function
/// producing exactly one value per scrape.
pub struct ScalarMetric<R> {
    pub descriptor: MetricDescriptor,
    pub value: fn(&R) -> f64,
}

/// Evaluate a scalar descriptor table against a decoded response.
pub fn collect_scalars<R>(
    metrics: &[ScalarMetric<R>],
    response: &R,
    cluster: &str,
) -> Vec<CollectedMetric> {
    metrics
        .iter()
        .map(|metric| CollectedMetric {
            descriptor: metric.descriptor.clone(),
            samples: vec![MetricSample {
                labels: vec![("cluster".to_string(), cluster.to_string())],
                value: metric
                    .descriptor
                    .metric_type
                    .sample_value((metric.value)(response)),
            }],
        })
        .collect()
}

/// Long-lived scrape accounting for one upstream endpoint.
///
/// The counters increase monotonically for the process lifetime; the up flag
/// is overwritten on every scrape. Each collector owns exactly one of these.
pub struct EndpointStatus {
    up: AtomicBool,
    total_scrapes: AtomicU64,
    json_parse_failures: AtomicU64,
    up_desc: MetricDescriptor,
    total_scrapes_desc: MetricDescriptor,
    json_parse_failures_desc: MetricDescriptor,
}

impl EndpointStatus {
    pub fn new(subsystem: &str, display_name: &str) -> Self {
        Self {
            up: AtomicBool::new(false),
            total_scrapes: AtomicU64::new(0),
            json_parse_failures: AtomicU64::new(0),
            up_desc: MetricDescriptor::new(
                subsystem,
                "up",
                &format!("Was the last scrape of the Typesense {display_name} endpoint successful."),
                MetricType::Gauge,
                &[],
            ),
            total_scrapes_desc: MetricDescriptor::new(
                subsystem,
                "total_scrapes",
                &format!("Current total Typesense {display_name} scrapes."),
                MetricType::Counter,
                &[],
            ),
            json_parse_failures_desc: MetricDescriptor::new(
                subsystem,
                "json_parse_failures",
                "Number of errors while parsing JSON.",
                MetricType::Counter,
                &[],
            ),
        }
    }

    pub fn record_attempt(&self) {
        self.total_scrapes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_failure(&self) {
        self.json_parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_up(&self, up: bool) {
        self.up.store(up, Ordering::Relaxed);
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Relaxed)
    }

    pub fn total_scrapes(&self) -> u64 {
        self.total_scrapes.load(Ordering::Relaxed)
    }

    pub fn json_parse_failures(&self) -> u64 {
        self.json_parse_failures.load(Ordering::Relaxed)
    }

    /// The three health series, emitted on every scrape regardless of outcome.
    pub fn health_metrics(&self) -> Vec<CollectedMetric> {
        vec![
            CollectedMetric {
                descriptor: self.up_desc.clone(),
                samples: vec![MetricSample {
                    labels: Vec::new(),
                    value: MetricValue::Gauge(if self.is_up() { 1.0 } else { 0.0 }),
                }],
            },
            CollectedMetric {
                descriptor: self.total_scrapes_desc.clone(),
                samples: vec![MetricSample {
                    labels: Vec::new(),
                    value: MetricValue::Counter(self.total_scrapes() as f64),
                }],
            },
            CollectedMetric {
                descriptor: self.json_parse_failures_desc.clone(),
                samples: vec![MetricSample {
                    labels: Vec::new(),
                    value: MetricValue::Counter(self.json_parse_failures() as f64),
                }],
            },
        ]
    }
}
