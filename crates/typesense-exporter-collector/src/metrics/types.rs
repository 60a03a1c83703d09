/// Namespace prefixed to every metric name this exporter exposes.
pub const NAMESPACE: &str = "typesense";

/// Fully qualified metric name: `<namespace>_<subsystem>_<field>`.
pub fn fq_name(subsystem: &str, field: &str) -> String {
    format!("{NAMESPACE}_{subsystem}_{field}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    pub fn as_prometheus_type(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
        }
    }

    pub fn sample_value(&self, value: f64) -> MetricValue {
        match self {
            Self::Counter => MetricValue::Counter(value),
            Self::Gauge => MetricValue::Gauge(value),
        }
    }
}

/// Immutable identity of one exposed metric. Built once at startup and shared
/// read-only across concurrent scrapes.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub variable_labels: Vec<String>,
}

impl MetricDescriptor {
    pub fn new(
        subsystem: &str,
        field: &str,
        help: &str,
        metric_type: MetricType,
        variable_labels: &[&str],
    ) -> Self {
        Self {
            name: fq_name(subsystem, field),
            help: help.to_string(),
            metric_type,
            variable_labels: variable_labels
                .iter()
                .map(|label| (*label).to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum MetricValue {
    Counter(f64),
    Gauge(f64),
}

#[derive(Debug, Clone)]
pub struct MetricSample {
    pub labels: Vec<(String, String)>,
    pub value: MetricValue,
}

#[derive(Debug, Clone)]
pub struct CollectedMetric {
    pub descriptor: MetricDescriptor,
    pub samples: Vec<MetricSample>,
}
