//! Core Web Vitals collection for instrumented pages
//!
//! A [`WebVitalsCollector`](collector::WebVitalsCollector) subscribes to the
//! signals a [`PerformanceSource`](source::PerformanceSource) provides and
//! forwards rounded figures to an optional
//! [`ObservabilitySink`](sink::ObservabilitySink).

pub mod cls;
pub mod collector;
pub mod config;
pub mod entry;
pub mod error;
pub mod sink;
pub mod source;
pub mod util;

/// Re-export of commonly used types for convenience
pub mod prelude {
    pub use crate::cls::ClsAccumulator;
    pub use crate::collector::{
        Collector, CollectorConfig, CollectorConfigBuilder, MetricBatch, MetricKind, MetricSample,
        WebVitalsCollector,
    };
    pub use crate::config::{ConfigBuilder, LogLevel, VitalsConfig};
    pub use crate::entry::{EntryKind, PerformanceEntry};
    pub use crate::error::{Result, UnsupportedSignal, VitalsError};
    pub use crate::sink::{AnalyticsEvent, LogSink, MemorySink, ObservabilitySink};
    pub use crate::source::{MemorySource, PerformanceSource, Trace};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
