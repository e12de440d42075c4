mod config;
mod core;
mod observers;
mod vitals;

// Re-export public items
pub use self::config::{CollectorConfig, CollectorConfigBuilder};
pub use self::core::{
    Collector, MetricBatch, MetricKind, MetricSample, MetricType, PageLoadPhase, round_half_up,
    round_to_thousandths,
};
pub use self::observers::{
    cls_event, fid_event, is_slow_resource, latest_paint, lcp_event, legacy_load_event,
    page_load_event,
};
pub use self::vitals::{Subscription, WebVitalsCollector};
