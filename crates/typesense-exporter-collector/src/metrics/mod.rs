pub mod render;
pub mod types;

pub use render::render_text;
pub use types::{CollectedMetric, MetricDescriptor, MetricSample, MetricType, MetricValue};
