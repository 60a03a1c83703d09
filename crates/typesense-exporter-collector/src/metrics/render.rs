use crate::metrics::types::{CollectedMetric, MetricValue};

/// Encode collected metrics in the Prometheus text exposition format.
///
/// Families are rendered in the order given; samples carry no timestamp so
/// the scraper assigns scrape time.
pub fn render_text(metrics: &[CollectedMetric]) -> String {
    let mut output = String::new();

    for metric in metrics {
        output.push_str("# HELP ");
        output.push_str(&metric.descriptor.name);
        output.push(' ');
        output.push_str(&escape_help(&metric.descriptor.help));
        output.push('\n');

        output.push_str("# TYPE ");
        output.push_str(&metric.descriptor.name);
        output.push(' ');
        output.push_str(metric.descriptor.metric_type.as_prometheus_type());
        output.push('\n');

        for sample in &metric.samples {
            let value = match sample.value {
                MetricValue::Counter(value) | MetricValue::Gauge(value) => value,
            };
            output.push_str(&render_sample_line(
                &metric.descriptor.name,
                &sample.labels,
                value,
            ));
        }
    }

    output
}

fn render_sample_line(name: &str, labels: &[(String, String)], value: f64) -> String {
    let mut rendered = String::new();
    rendered.push_str(name);

    if !labels.is_empty() {
        rendered.push('{');
        for (index, (key, value)) in labels.iter().enumerate() {
            if index > 0 {
                rendered.push(',');
            }
            rendered.push_str(key);
            rendered.push_str("=\"");
            rendered.push_str(&escape_label_value(value));
            rendered.push('"');
        }
        rendered.push('}');
    }

    rendered.push(' ');
    rendered.push_str(&format_metric_value(value));
    rendered.push('\n');
    rendered
}

fn format_metric_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

fn escape_help(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::render_text;
    use crate::metrics::types::{
        CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue,
    };

    fn gauge_family(samples: Vec<MetricSample>) -> CollectedMetric {
        CollectedMetric {
            descriptor: MetricDescriptor::new(
                "api_stats",
                "requests_per_second",
                "Requests per second per method and endpoint.",
                MetricType::Gauge,
                &["cluster", "method", "endpoint"],
            ),
            samples,
        }
    }

    #[test]
    fn renders_help_type_and_labeled_samples() {
        let family = gauge_family(vec![MetricSample {
            labels: vec![
                ("cluster".to_string(), "http://localhost:8108/".to_string()),
                ("method".to_string(), "GET".to_string()),
                ("endpoint".to_string(), "/search".to_string()),
            ],
            value: MetricValue::Gauge(12.5),
        }]);

        let output = render_text(&[family]);
        assert!(output.starts_with(
            "# HELP typesense_api_stats_requests_per_second Requests per second per method and endpoint.\n"
        ));
        assert!(output.contains("# TYPE typesense_api_stats_requests_per_second gauge\n"));
        assert!(output.contains(
            "typesense_api_stats_requests_per_second{cluster=\"http://localhost:8108/\",method=\"GET\",endpoint=\"/search\"} 12.5\n"
        ));
    }

    #[test]
    fn integral_values_render_without_decimal_point() {
        let family = CollectedMetric {
            descriptor: MetricDescriptor::new(
                "cluster_metrics",
                "total_scrapes",
                "Current total cluster metrics scrapes.",
                MetricType::Counter,
                &[],
            ),
            samples: vec![MetricSample {
                labels: Vec::new(),
                value: MetricValue::Counter(3.0),
            }],
        };

        let output = render_text(&[family]);
        assert!(output.contains("# TYPE typesense_cluster_metrics_total_scrapes counter\n"));
        assert!(output.contains("typesense_cluster_metrics_total_scrapes 3\n"));
    }

    #[test]
    fn label_values_are_escaped() {
        let family = gauge_family(vec![MetricSample {
            labels: vec![("endpoint".to_string(), "/a\"b\\c\nd".to_string())],
            value: MetricValue::Gauge(1.0),
        }]);

        let output = render_text(&[family]);
        assert!(output.contains("endpoint=\"/a\\\"b\\\\c\\nd\""));
    }

    #[test]
    fn empty_family_renders_header_lines_only() {
        let output = render_text(&[gauge_family(Vec::new())]);
        assert_eq!(output.lines().count(), 2);
    }
}
