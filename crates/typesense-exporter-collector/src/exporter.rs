use std::{collections::BTreeMap, sync::Arc, time::Instant};

use futures::{StreamExt, stream::FuturesUnordered};
use tracing::{debug, error};

use crate::{
    collectors::StatCollector,
    metrics::{
        render::render_text,
        types::{CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue},
    },
};

/// Aggregates every registered collector into one exposition stream.
///
/// The collector set is fixed at construction. Each collection request fans
/// out concurrently and returns only after every collector has reported, so
/// a response never interleaves with a still-running collector.
pub struct Exporter {
    collectors: BTreeMap<&'static str, Arc<dyn StatCollector>>,
    scrape_duration: MetricDescriptor,
    scrape_success: MetricDescriptor,
}

impl Exporter {
    pub fn new(collectors: Vec<Arc<dyn StatCollector>>) -> Self {
        let collectors = collectors
            .into_iter()
            .map(|collector| (collector.name(), collector))
            .collect();

        Self {
            collectors,
            scrape_duration: MetricDescriptor::new(
                "scrape",
                "duration_seconds",
                "Duration of a collector scrape.",
                MetricType::Gauge,
                &["collector"],
            ),
            scrape_success: MetricDescriptor::new(
                "scrape",
                "success",
                "Whether a collector succeeded.",
                MetricType::Gauge,
                &["collector"],
            ),
        }
    }

    /// Run all collectors concurrently and merge their output, sorted by
    /// metric name. A failing collector contributes its health metrics and a
    /// success=0 sample without affecting the others.
    pub async fn collect(&self) -> Vec<CollectedMetric> {
        let mut pending = FuturesUnordered::new();
        for (name, collector) in &self.collectors {
            let collector = Arc::clone(collector);
            let name = *name;
            pending.push(async move {
                let mut metrics = Vec::new();
                let started = Instant::now();
                let result = collector.update(&mut metrics).await;
                (name, metrics, result, started.elapsed())
            });
        }

        let mut merged = Vec::new();
        let mut durations = Vec::with_capacity(self.collectors.len());
        let mut successes = Vec::with_capacity(self.collectors.len());

        while let Some((name, metrics, result, elapsed)) = pending.next().await {
            let duration_seconds = elapsed.as_secs_f64();
            let success = match result {
                Ok(()) => {
                    debug!(collector = name, duration_seconds, "collector succeeded");
                    1.0
                }
                Err(err) => {
                    error!(collector = name, duration_seconds, error = %err, "collector failed");
                    0.0
                }
            };

            durations.push(collector_sample(name, duration_seconds));
            successes.push(collector_sample(name, success));
            merged.extend(metrics);
        }

        durations.sort_by(|left, right| left.labels.cmp(&right.labels));
        successes.sort_by(|left, right| left.labels.cmp(&right.labels));

        merged.push(CollectedMetric {
            descriptor: self.scrape_duration.clone(),
            samples: durations,
        });
        merged.push(CollectedMetric {
            descriptor: self.scrape_success.clone(),
            samples: successes,
        });

        merged.sort_by(|left, right| left.descriptor.name.cmp(&right.descriptor.name));
        merged
    }

    /// One full collection cycle rendered in the text exposition format.
    pub async fn render(&self) -> String {
        render_text(&self.collect().await)
    }
}

fn collector_sample(collector: &str, value: f64) -> MetricSample {
    MetricSample {
        labels: vec![("collector".to_string(), collector.to_string())],
        value: MetricValue::Gauge(value),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::Exporter;
    use crate::{
        collectors::StatCollector,
        error::ScrapeError,
        metrics::types::{
            CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue,
        },
    };

    struct StaticCollector {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl StatCollector for StaticCollector {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn update(&self, sink: &mut Vec<CollectedMetric>) -> Result<(), ScrapeError> {
            sink.push(CollectedMetric {
                descriptor: MetricDescriptor::new(
                    self.name,
                    "up",
                    "Was the last scrape successful.",
                    MetricType::Gauge,
                    &[],
                ),
                samples: vec![MetricSample {
                    labels: Vec::new(),
                    value: MetricValue::Gauge(if self.fail { 0.0 } else { 1.0 }),
                }],
            });
            if self.fail {
                Err(ScrapeError::Parse {
                    url: "http://upstream/stats.json".to_string(),
                    reason: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn exporter_with(collectors: Vec<StaticCollector>) -> Exporter {
        Exporter::new(
            collectors
                .into_iter()
                .map(|collector| Arc::new(collector) as Arc<dyn StatCollector>)
                .collect(),
        )
    }

    fn family<'a>(merged: &'a [CollectedMetric], name: &str) -> &'a CollectedMetric {
        merged
            .iter()
            .find(|metric| metric.descriptor.name == name)
            .unwrap()
    }

    #[tokio::test]
    async fn every_scrape_yields_one_health_pair_per_collector() {
        let exporter = exporter_with(vec![
            StaticCollector {
                name: "alpha",
                fail: false,
            },
            StaticCollector {
                name: "beta",
                fail: true,
            },
        ]);

        let merged = exporter.collect().await;

        let durations = family(&merged, "typesense_scrape_duration_seconds");
        assert_eq!(durations.samples.len(), 2);

        let successes = family(&merged, "typesense_scrape_success");
        assert_eq!(successes.samples.len(), 2);
        let by_collector = |index: usize| {
            (
                successes.samples[index].labels[0].1.as_str(),
                match successes.samples[index].value {
                    MetricValue::Gauge(value) => value,
                    _ => panic!("expected gauge"),
                },
            )
        };
        assert_eq!(by_collector(0), ("alpha", 1.0));
        assert_eq!(by_collector(1), ("beta", 0.0));
    }

    #[tokio::test]
    async fn a_failing_collector_does_not_suppress_the_others() {
        let exporter = exporter_with(vec![
            StaticCollector {
                name: "alpha",
                fail: false,
            },
            StaticCollector {
                name: "beta",
                fail: true,
            },
        ]);

        let merged = exporter.collect().await;
        assert!(
            merged
                .iter()
                .any(|metric| metric.descriptor.name == "typesense_alpha_up")
        );
        assert!(
            merged
                .iter()
                .any(|metric| metric.descriptor.name == "typesense_beta_up")
        );
    }

    #[tokio::test]
    async fn merged_output_is_sorted_by_metric_name() {
        let exporter = exporter_with(vec![
            StaticCollector {
                name: "zeta",
                fail: false,
            },
            StaticCollector {
                name: "alpha",
                fail: false,
            },
        ]);

        let merged = exporter.collect().await;
        let names = merged
            .iter()
            .map(|metric| metric.descriptor.name.clone())
            .collect::<Vec<_>>();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn an_empty_collector_set_still_exposes_the_health_families() {
        let exporter = Exporter::new(Vec::new());
        let merged = exporter.collect().await;
        assert_eq!(merged.len(), 2);
        assert!(merged.iter().all(|metric| metric.samples.is_empty()));
    }

    #[tokio::test]
    async fn mixed_upstream_outcome_still_yields_a_full_health_pair_set() {
        use axum::{Router, http::StatusCode, routing::get};
        use url::Url;

        use crate::{
            client::TypesenseClient,
            collectors::{ApiStatsCollector, ClusterMetricsCollector},
        };

        const CLUSTER_BODY: &str = r#"{
            "system_cpu_active_percentage": "5.25",
            "system_disk_total_bytes": "1043447808",
            "system_disk_used_bytes": "561152",
            "system_memory_total_bytes": "2086899712",
            "system_memory_used_bytes": "1004507136",
            "system_network_received_bytes": "1466",
            "system_network_sent_bytes": "182",
            "typesense_memory_active_bytes": "29630464",
            "typesense_memory_allocated_bytes": "27886840",
            "typesense_memory_fragmentation_ratio": "0.06",
            "typesense_memory_mapped_bytes": "69701632",
            "typesense_memory_metadata_bytes": "4588768",
            "typesense_memory_resident_bytes": "29630464",
            "typesense_memory_retained_bytes": "51152896"
        }"#;

        let router = Router::new()
            .route("/metrics.json", get(|| async { CLUSTER_BODY }))
            .route(
                "/stats.json",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let client = TypesenseClient::new(
            reqwest::Client::new(),
            Url::parse(&format!("http://{addr}")).unwrap(),
        );
        let exporter = Exporter::new(vec![
            Arc::new(ClusterMetricsCollector::new(client.clone())) as Arc<dyn StatCollector>,
            Arc::new(ApiStatsCollector::new(client)),
        ]);

        let merged = exporter.collect().await;

        assert_eq!(
            family(&merged, "typesense_scrape_duration_seconds")
                .samples
                .len(),
            2
        );
        let successes = family(&merged, "typesense_scrape_success");
        assert_eq!(successes.samples.len(), 2);

        // Sorted by collector label: api_stats (down) before cluster_metrics (up).
        match successes.samples[0].value {
            MetricValue::Gauge(value) => assert_eq!(value, 0.0),
            _ => panic!("expected gauge"),
        }
        match successes.samples[1].value {
            MetricValue::Gauge(value) => assert_eq!(value, 1.0),
            _ => panic!("expected gauge"),
        }

        // Cluster field metrics survive the api-stats failure.
        assert!(
            merged
                .iter()
                .any(|m| m.descriptor.name == "typesense_cluster_metrics_memory_resident_bytes")
        );
        assert!(
            !merged
                .iter()
                .any(|m| m.descriptor.name == "typesense_api_stats_requests_per_second")
        );

        let rendered = exporter.render().await;
        assert!(rendered.contains("typesense_api_stats_up 0\n"));
        assert!(rendered.contains("typesense_cluster_metrics_up 1\n"));
    }
}
