use log::{info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;

use super::config::CollectorConfig;
use super::core::{Collector, MetricBatch, MetricSample};
use super::observers::{self, Reporter};
use crate::entry::EntryKind;
use crate::error::{Result, UnsupportedSignal, VitalsError};
use crate::sink::ObservabilitySink;
use crate::source::PerformanceSource;

/// A live subscription to one observation channel
#[derive(Debug)]
pub struct Subscription {
    kind: EntryKind,
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn kind(&self) -> EntryKind {
        self.kind
    }
}

/// Collects Core Web Vitals from a page and forwards them to a sink.
///
/// Every signal is subscribed independently. A channel the source cannot
/// provide is logged and skipped; the remaining signals keep working.
pub struct WebVitalsCollector {
    config: Arc<CollectorConfig>,
    source: Arc<dyn PerformanceSource>,
    sink: Option<Arc<dyn ObservabilitySink>>,
    /// Set by the first start and never cleared: stopping is terminal
    started: RwLock<bool>,
    subscriptions: Mutex<Vec<Subscription>>,
    lifecycle_tasks: Mutex<Vec<JoinHandle<()>>>,
    failures: Mutex<Vec<UnsupportedSignal>>,
}

impl WebVitalsCollector {
    /// Create a collector with no analytics sink
    pub fn new(config: CollectorConfig, source: Arc<dyn PerformanceSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
            sink: None,
            started: RwLock::new(false),
            subscriptions: Mutex::new(Vec::new()),
            lifecycle_tasks: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Forward reported events to `sink`
    pub fn with_sink(mut self, sink: Arc<dyn ObservabilitySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Subscribe one channel and spawn its observation loop
    async fn subscribe(
        &self,
        kind: EntryKind,
        reporter: Reporter,
    ) -> std::result::Result<Subscription, UnsupportedSignal> {
        let rx = self.source.observe(kind).await?;

        let handle = match kind {
            EntryKind::LargestContentfulPaint => tokio::spawn(observers::observe_lcp(rx, reporter)),
            EntryKind::FirstInput => tokio::spawn(observers::observe_fid(rx, reporter)),
            EntryKind::LayoutShift => tokio::spawn(observers::observe_cls(rx, reporter)),
            EntryKind::Resource => tokio::spawn(observers::observe_slow_resources(rx, reporter)),
        };

        Ok(Subscription { kind, handle })
    }

    /// Channels that could not be subscribed on the last start
    pub async fn failed_subscriptions(&self) -> Vec<UnsupportedSignal> {
        self.failures.lock().await.clone()
    }

    /// Channels currently subscribed
    pub async fn active_subscriptions(&self) -> Vec<EntryKind> {
        self.subscriptions
            .lock()
            .await
            .iter()
            .map(Subscription::kind)
            .collect()
    }
}

#[async_trait::async_trait]
impl Collector for WebVitalsCollector {
    type MetricType = MetricSample;

    async fn start(&self) -> Result<mpsc::Receiver<MetricBatch<Self::MetricType>>> {
        {
            let mut started = self.started.write().await;
            if *started {
                return Err(VitalsError::AlreadyStarted(self.config.name.clone()).into());
            }
            *started = true;
        }

        let (tx, rx) = mpsc::channel(self.config.buffer_size.max(1));
        let reporter = Reporter::new(Arc::clone(&self.config), self.sink.clone(), tx);

        let mut subscriptions = Vec::new();
        let mut failures = Vec::new();
        for kind in EntryKind::ALL {
            match self.subscribe(kind, reporter.clone()).await {
                Ok(subscription) => subscriptions.push(subscription),
                Err(e) => {
                    warn!("{} monitoring failed: {}", kind, e);
                    failures.push(e);
                }
            }
        }

        let lifecycle = vec![
            tokio::spawn(observers::report_page_load(
                Arc::clone(&self.source),
                reporter.clone(),
            )),
            tokio::spawn(observers::report_legacy_timing(
                Arc::clone(&self.source),
                reporter,
            )),
        ];

        info!(
            "Collector '{}' observing {} of {} channels on '{}'",
            self.config.name,
            subscriptions.len(),
            EntryKind::ALL.len(),
            self.source.name()
        );

        *self.subscriptions.lock().await = subscriptions;
        *self.lifecycle_tasks.lock().await = lifecycle;
        *self.failures.lock().await = failures;

        Ok(rx)
    }

    /// Tear down every subscription. Stopping is terminal: the collector
    /// cannot be started again.
    async fn stop(&self) -> Result<()> {
        for subscription in self.subscriptions.lock().await.drain(..) {
            subscription.handle.abort();
        }
        for task in self.lifecycle_tasks.lock().await.drain(..) {
            task.abort();
        }

        info!("Collector '{}' stopped", self.config.name);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.name
    }
}
