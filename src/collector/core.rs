//! Core collector traits and types
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::{self, Debug};
use tokio::sync::mpsc;

/// A trait for metric types
pub trait MetricType: Clone + Send + Sync + Debug + 'static {}

// Implement for any type that meets the requirements
impl<T> MetricType for T where T: Clone + Send + Sync + Debug + 'static {}

/// What a sample measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetricKind {
    /// Largest Contentful Paint
    Lcp,
    /// First Input Delay
    Fid,
    /// Cumulative Layout Shift
    Cls,
    /// Navigation-timing load figures
    PageLoad(PageLoadPhase),
    /// A subresource that took too long to fetch
    SlowResource,
    /// `loadEventEnd - navigationStart` from the legacy timing record
    LegacyLoad,
}

/// Which part of the page load a `PageLoad` sample covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PageLoadPhase {
    LoadEvent,
    DomContentLoaded,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Lcp => "LCP",
            MetricKind::Fid => "FID",
            MetricKind::Cls => "CLS",
            MetricKind::PageLoad(PageLoadPhase::LoadEvent) => "Page Load Time",
            MetricKind::PageLoad(PageLoadPhase::DomContentLoaded) => "DOM Content Loaded",
            MetricKind::SlowResource => "Slow resource",
            MetricKind::LegacyLoad => "Total Load Time",
        };
        f.write_str(name)
    }
}

/// A single observation; created, forwarded, then dropped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub kind: MetricKind,
    pub value: f64,
    /// Milliseconds since navigation start, when the signal carries one
    pub timestamp_ms: f64,
}

impl MetricSample {
    pub fn new(kind: MetricKind, value: f64, timestamp_ms: f64) -> Self {
        Self {
            kind,
            value,
            timestamp_ms,
        }
    }
}

/// A batch of metrics
#[derive(Debug, Clone)]
pub struct MetricBatch<T: MetricType> {
    /// The metrics in this batch
    pub metrics: Vec<T>,
    /// When this batch was collected
    pub timestamp: DateTime<Utc>,
    /// The source of these metrics
    pub source: String,
}

impl<T: MetricType> MetricBatch<T> {
    /// Create a new metric batch
    pub fn new(metrics: Vec<T>, source: impl Into<String>) -> Self {
        Self {
            metrics,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Base trait for all metric collectors
#[async_trait::async_trait]
pub trait Collector: Send + Sync + 'static {
    /// The type of metric this collector produces
    type MetricType: MetricType;

    /// Start collecting metrics
    async fn start(&self) -> Result<mpsc::Receiver<MetricBatch<Self::MetricType>>>;

    /// Stop collecting metrics
    async fn stop(&self) -> Result<()>;

    /// Get the collector name
    fn name(&self) -> &str;
}

/// Round to the nearest integer, halves toward positive infinity.
///
/// Matches the rounding analytics dashboards expect from page scripts,
/// which differs from `f64::round` for negative halves.
pub fn round_half_up(value: f64) -> f64 {
    // `value + 0.5` is inexact just below a half and above 2^52
    let rounded = value.round();
    if value < 0.0 && value - rounded == 0.5 {
        rounded + 1.0
    } else {
        rounded
    }
}

/// Round to three decimal places using `round_half_up`
pub fn round_to_thousandths(value: f64) -> f64 {
    round_half_up(value * 1000.0) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(2.4999), 2.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(-2.6), -3.0);
        assert_eq!(round_half_up(0.0), 0.0);
        assert_eq!(round_half_up(-0.5), 0.0);
    }

    #[test]
    fn test_round_half_up_precision_edges() {
        // Largest double below one half
        assert_eq!(round_half_up(0.49999999999999994), 0.0);
        assert_eq!(round_half_up(-0.49999999999999994), 0.0);

        // Above 2^52 every double is already an integer
        assert_eq!(round_half_up(4503599627370497.0), 4503599627370497.0);
        assert_eq!(round_half_up(-4503599627370497.0), -4503599627370497.0);
        assert_eq!(round_half_up(9007199254740993.0), 9007199254740993.0);
    }

    #[test]
    fn test_round_to_thousandths() {
        assert_eq!(round_to_thousandths(0.12345), 0.123);
        assert_eq!(round_to_thousandths(0.1236), 0.124);
        assert_eq!(round_to_thousandths(0.0), 0.0);
    }

    #[test]
    fn test_batch_len() {
        let batch = MetricBatch::new(
            vec![MetricSample::new(MetricKind::Lcp, 1200.0, 1200.0)],
            "test",
        );
        assert_eq!(batch.len(), 1);
        assert!(!batch.is_empty());
        assert_eq!(batch.source, "test");
    }
}
