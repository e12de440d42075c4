//! Per-signal observation loops
//!
//! Each function here drains one signal and runs as its own task. They
//! share nothing but the [`Reporter`], so a stream that never arrives or a
//! sink that fails cannot hold up any other stream.
use log::{debug, info, trace, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::config::CollectorConfig;
use super::core::{
    MetricBatch, MetricKind, MetricSample, PageLoadPhase, round_half_up, round_to_thousandths,
};
use crate::cls::ClsAccumulator;
use crate::entry::{
    FirstInput, LargestContentfulPaint, LayoutShift, LegacyTiming, NavigationTiming,
    PerformanceEntry, ResourceTiming,
};
use crate::sink::{AnalyticsEvent, EventValue, ObservabilitySink, dispatch};
use crate::source::{EntryBatch, PerformanceSource};

/// Everything an observation loop needs to publish what it sees
#[derive(Clone)]
pub(crate) struct Reporter {
    config: Arc<CollectorConfig>,
    sink: Option<Arc<dyn ObservabilitySink>>,
    samples: mpsc::Sender<MetricBatch<MetricSample>>,
}

impl Reporter {
    pub(crate) fn new(
        config: Arc<CollectorConfig>,
        sink: Option<Arc<dyn ObservabilitySink>>,
        samples: mpsc::Sender<MetricBatch<MetricSample>>,
    ) -> Self {
        Self {
            config,
            sink,
            samples,
        }
    }

    fn report(&self, event: &AnalyticsEvent) {
        dispatch(self.sink.as_deref(), event);
    }

    /// Publish samples locally without ever waiting on the consumer
    fn emit(&self, samples: Vec<MetricSample>) {
        if samples.is_empty() {
            return;
        }
        let batch = MetricBatch::new(samples, self.config.name.clone());
        match self.samples.try_send(batch) {
            Ok(()) => {}
            Err(TrySendError::Full(batch)) => {
                debug!(
                    "Sample channel for '{}' is full, dropping {} samples",
                    self.config.name,
                    batch.len()
                );
            }
            Err(TrySendError::Closed(_)) => {
                // Nobody is listening locally; the sink still gets its events
                trace!("Sample receiver dropped for '{}'", self.config.name);
            }
        }
    }
}

/// The latest LCP candidate in a delivery, if any
pub fn latest_paint(batch: &[PerformanceEntry]) -> Option<&LargestContentfulPaint> {
    batch.iter().rev().find_map(|entry| match entry {
        PerformanceEntry::LargestContentfulPaint(paint) => Some(paint),
        _ => None,
    })
}

pub fn lcp_event(config: &CollectorConfig, paint: &LargestContentfulPaint) -> AnalyticsEvent {
    AnalyticsEvent::new("LCP")
        .category(config.web_vitals_category.as_str())
        .label(paint.start_time)
        .value(EventValue::whole(round_half_up(paint.start_time)))
}

pub fn fid_event(config: &CollectorConfig, input: &FirstInput) -> AnalyticsEvent {
    AnalyticsEvent::new("FID")
        .category(config.web_vitals_category.as_str())
        .label(input.name.as_str())
        .value(EventValue::whole(round_half_up(input.delay())))
}

pub fn cls_event(config: &CollectorConfig, cls: &ClsAccumulator) -> AnalyticsEvent {
    AnalyticsEvent::new("CLS")
        .category(config.web_vitals_category.as_str())
        .label("CLS")
        .value(EventValue::Decimal(round_to_thousandths(cls.value())))
}

pub fn page_load_event(config: &CollectorConfig, timing: &NavigationTiming) -> AnalyticsEvent {
    AnalyticsEvent::new("page_load_performance")
        .category(config.performance_category.as_str())
        .property("load_time", round_half_up(timing.load_time()) as i64)
        .property(
            "dom_content_loaded",
            round_half_up(timing.dom_content_loaded()) as i64,
        )
}

pub fn legacy_load_event(timing: &LegacyTiming) -> AnalyticsEvent {
    AnalyticsEvent::new("timing_complete")
        .label("load")
        .value(EventValue::whole(round_half_up(timing.total_load_time())))
}

/// Whether a resource counts as slow under `config`
pub fn is_slow_resource(config: &CollectorConfig, resource: &ResourceTiming) -> bool {
    config.watches_initiator(&resource.initiator_type)
        && resource.load_time() > config.slow_resource_threshold_ms
}

pub(crate) async fn observe_lcp(mut rx: mpsc::Receiver<EntryBatch>, reporter: Reporter) {
    while let Some(batch) = rx.recv().await {
        let Some(paint) = latest_paint(&batch) else {
            continue;
        };
        info!("LCP: {}", paint.start_time);
        reporter.report(&lcp_event(&reporter.config, paint));
        reporter
            .emit(vec![MetricSample::new(
                MetricKind::Lcp,
                paint.start_time,
                paint.start_time,
            )]);
    }
    debug!("LCP observer finished");
}

pub(crate) async fn observe_fid(mut rx: mpsc::Receiver<EntryBatch>, reporter: Reporter) {
    while let Some(batch) = rx.recv().await {
        let mut samples = Vec::new();
        for entry in &batch {
            let PerformanceEntry::FirstInput(input) = entry else {
                continue;
            };
            let delay = input.delay();
            info!("FID: {}", delay);
            reporter.report(&fid_event(&reporter.config, input));
            samples.push(MetricSample::new(MetricKind::Fid, delay, input.start_time));
        }
        reporter.emit(samples);
    }
    debug!("FID observer finished");
}

pub(crate) async fn observe_cls(mut rx: mpsc::Receiver<EntryBatch>, reporter: Reporter) {
    let mut cls = ClsAccumulator::new();

    while let Some(batch) = rx.recv().await {
        let shifts: Vec<&LayoutShift> = batch
            .iter()
            .filter_map(|entry| match entry {
                PerformanceEntry::LayoutShift(shift) => Some(shift),
                _ => None,
            })
            .collect();
        let last_seen = shifts
            .iter()
            .map(|shift| shift.start_time)
            .fold(0.0, f64::max);

        let total = cls.record_batch(shifts);
        info!("CLS: {}", total);
        reporter.report(&cls_event(&reporter.config, &cls));
        reporter
            .emit(vec![MetricSample::new(MetricKind::Cls, total, last_seen)]);
    }
    debug!(
        "CLS observer finished with {} contributing shifts",
        cls.entries().len()
    );
}

pub(crate) async fn observe_slow_resources(mut rx: mpsc::Receiver<EntryBatch>, reporter: Reporter) {
    while let Some(batch) = rx.recv().await {
        let mut samples = Vec::new();
        for entry in &batch {
            let PerformanceEntry::Resource(resource) = entry else {
                continue;
            };
            if !is_slow_resource(&reporter.config, resource) {
                continue;
            }
            // Local only: slow resources are never sent to the sink
            warn!(
                "Slow resource: {} Load time: {}",
                resource.name,
                resource.load_time()
            );
            samples.push(MetricSample::new(
                MetricKind::SlowResource,
                resource.load_time(),
                resource.start_time,
            ));
        }
        reporter.emit(samples);
    }
    debug!("Resource observer finished");
}

/// Wait for load, then give timing fields one scheduler turn to settle
async fn settled_after_load(source: &dyn PerformanceSource) -> bool {
    if !source.wait_for_load().await {
        debug!("Page '{}' went away before load", source.name());
        return false;
    }
    tokio::task::yield_now().await;
    true
}

pub(crate) async fn report_page_load(source: Arc<dyn PerformanceSource>, reporter: Reporter) {
    if !settled_after_load(source.as_ref()).await {
        return;
    }

    let Some(timing) = source.navigation_timing().await else {
        debug!("No navigation timing available");
        return;
    };

    let load_time = timing.load_time();
    let dom_content_loaded = timing.dom_content_loaded();
    info!("Page Load Time: {}", load_time);
    info!("DOM Content Loaded: {}", dom_content_loaded);

    reporter.report(&page_load_event(&reporter.config, &timing));
    reporter
        .emit(vec![
            MetricSample::new(
                MetricKind::PageLoad(PageLoadPhase::LoadEvent),
                load_time,
                timing.load_event_end,
            ),
            MetricSample::new(
                MetricKind::PageLoad(PageLoadPhase::DomContentLoaded),
                dom_content_loaded,
                timing.dom_content_loaded_event_end,
            ),
        ]);
}

pub(crate) async fn report_legacy_timing(source: Arc<dyn PerformanceSource>, reporter: Reporter) {
    if !settled_after_load(source.as_ref()).await {
        return;
    }

    let Some(timing) = source.legacy_timing().await else {
        debug!("No legacy timing available");
        return;
    };

    let total = timing.total_load_time();
    info!("Total Load Time: {}", total);
    reporter.report(&legacy_load_event(&timing));
    reporter
        .emit(vec![MetricSample::new(MetricKind::LegacyLoad, total, total)]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource(initiator_type: &str, start_time: f64, response_end: f64) -> ResourceTiming {
        ResourceTiming {
            name: format!("/asset.{}", initiator_type),
            initiator_type: initiator_type.to_string(),
            start_time,
            response_end,
        }
    }

    fn paint(start_time: f64) -> PerformanceEntry {
        PerformanceEntry::LargestContentfulPaint(LargestContentfulPaint {
            name: String::new(),
            start_time,
        })
    }

    #[test]
    fn test_latest_paint_is_last_in_batch() {
        let batch = vec![paint(900.0), paint(350.0), paint(1210.4)];
        assert_eq!(latest_paint(&batch).unwrap().start_time, 1210.4);
        assert!(latest_paint(&[]).is_none());
    }

    #[test]
    fn test_slow_resource_threshold() {
        let config = CollectorConfig::default();
        assert!(is_slow_resource(&config, &resource("script", 0.0, 1200.0)));
        assert!(!is_slow_resource(&config, &resource("script", 0.0, 900.0)));
        assert!(!is_slow_resource(&config, &resource("script", 0.0, 1000.0)));
        assert!(is_slow_resource(&config, &resource("img", 200.0, 1300.0)));
        assert!(!is_slow_resource(&config, &resource("fetch", 0.0, 5000.0)));
    }

    #[test]
    fn test_event_values_are_rounded() {
        let config = CollectorConfig::default();
        let event = lcp_event(
            &config,
            &LargestContentfulPaint {
                name: String::new(),
                start_time: 1180.5,
            },
        );
        assert_eq!(event.value, Some(EventValue::Integer(1181)));

        let input = FirstInput {
            name: "keydown".to_string(),
            start_time: 100.0,
            processing_start: 112.4,
        };
        let event = fid_event(&config, &input);
        assert_eq!(event.value, Some(EventValue::Integer(12)));
        assert_eq!(
            serde_json::to_value(&event).unwrap()["label"],
            json!("keydown")
        );
    }

    #[test]
    fn test_page_load_event_properties() {
        let config = CollectorConfig::default();
        let event = page_load_event(
            &config,
            &NavigationTiming {
                load_event_start: 1500.0,
                load_event_end: 1512.6,
                dom_content_loaded_event_start: 800.0,
                dom_content_loaded_event_end: 803.2,
            },
        );
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "name": "page_load_performance",
                "category": "Performance",
                "load_time": 13,
                "dom_content_loaded": 3
            })
        );
    }

    #[test]
    fn test_legacy_event_shape() {
        let event = legacy_load_event(&LegacyTiming {
            navigation_start: 1000.0,
            load_event_end: 2750.0,
        });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"name": "timing_complete", "label": "load", "value": 1750})
        );
    }
}
