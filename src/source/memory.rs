use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::{mpsc, watch};

use super::{EntryBatch, PerformanceSource};
use crate::entry::{EntryKind, LegacyTiming, NavigationTiming};
use crate::error::{Result, UnsupportedSignal, VitalsError};

const MIN_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Pending,
    Loaded,
    Unloaded,
}

#[derive(Default)]
struct MemoryState {
    queued: HashMap<EntryKind, Vec<EntryBatch>>,
    senders: HashMap<EntryKind, mpsc::Sender<EntryBatch>>,
    unsupported: HashMap<EntryKind, String>,
    navigation: Option<NavigationTiming>,
    legacy: Option<LegacyTiming>,
    timing_read_before_load: bool,
    closed: bool,
}

/// A scriptable in-memory page for tests and replays.
///
/// Batches queued before a channel is observed are delivered as soon as it
/// is; later batches go out through [`MemorySource::push_batch`]. Calling
/// [`MemorySource::close`] plays the part of page unload: every channel
/// closes and a load that never fired resolves as not loaded.
pub struct MemorySource {
    name: String,
    state: Mutex<MemoryState>,
    load: watch::Sender<LoadState>,
}

impl MemorySource {
    /// Create a new memory source
    pub fn new(name: impl Into<String>) -> Self {
        let (load, _) = watch::channel(LoadState::Pending);
        Self {
            name: name.into(),
            state: Mutex::new(MemoryState::default()),
            load,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| VitalsError::Other("Lock poisoned".to_string()).into())
    }

    /// Queue a batch for delivery once `kind` is observed
    pub fn queue_batch(&self, kind: EntryKind, entries: EntryBatch) -> Result<&Self> {
        self.lock()?.queued.entry(kind).or_default().push(entries);
        Ok(self)
    }

    /// Deliver a batch to a live subscription, or queue it if there is none yet
    pub async fn push_batch(&self, kind: EntryKind, entries: EntryBatch) -> Result<()> {
        let sender = {
            let mut state = self.lock()?;
            if state.closed {
                return Err(VitalsError::Other(format!("source '{}' is closed", self.name)).into());
            }
            match state.senders.get(&kind) {
                Some(sender) => sender.clone(),
                None => {
                    state.queued.entry(kind).or_default().push(entries);
                    return Ok(());
                }
            }
        };

        sender
            .send(entries)
            .await
            .map_err(|_| VitalsError::Other(format!("no observer listening on {}", kind)).into())
    }

    /// Make `kind` fail to subscribe
    pub fn mark_unsupported(&self, kind: EntryKind, reason: impl Into<String>) -> Result<&Self> {
        self.lock()?.unsupported.insert(kind, reason.into());
        Ok(self)
    }

    pub fn set_navigation_timing(&self, timing: NavigationTiming) -> Result<&Self> {
        self.lock()?.navigation = Some(timing);
        Ok(self)
    }

    pub fn set_legacy_timing(&self, timing: LegacyTiming) -> Result<&Self> {
        self.lock()?.legacy = Some(timing);
        Ok(self)
    }

    /// Fire the page load event
    pub fn fire_load(&self) {
        debug!("Page '{}' loaded", self.name);
        self.load.send_if_modified(|state| {
            if *state == LoadState::Pending {
                *state = LoadState::Loaded;
                true
            } else {
                false
            }
        });
    }

    /// Tear the page down: close every channel and abandon a pending load
    pub fn close(&self) -> Result<()> {
        {
            let mut state = self.lock()?;
            state.closed = true;
            state.senders.clear();
        }

        self.load.send_if_modified(|state| {
            if *state == LoadState::Pending {
                *state = LoadState::Unloaded;
                true
            } else {
                false
            }
        });
        debug!("Page '{}' closed", self.name);
        Ok(())
    }

    /// Whether any timing record was read before load fired
    pub fn timing_read_before_load(&self) -> Result<bool> {
        Ok(self.lock()?.timing_read_before_load)
    }

    fn note_timing_read(&self, state: &mut MemoryState) {
        if *self.load.borrow() != LoadState::Loaded {
            state.timing_read_before_load = true;
        }
    }
}

#[async_trait::async_trait]
impl PerformanceSource for MemorySource {
    async fn observe(&self, kind: EntryKind) -> std::result::Result<mpsc::Receiver<EntryBatch>, UnsupportedSignal> {
        let mut state = self
            .lock()
            .map_err(|e| UnsupportedSignal::new(kind, e.to_string()))?;

        if let Some(reason) = state.unsupported.get(&kind) {
            return Err(UnsupportedSignal::new(kind, reason.clone()));
        }

        let queued = state.queued.remove(&kind).unwrap_or_default();
        let (tx, rx) = mpsc::channel(queued.len().max(MIN_CHANNEL_CAPACITY));

        for batch in queued {
            // Capacity covers every queued batch
            if tx.try_send(batch).is_err() {
                return Err(UnsupportedSignal::new(kind, "channel rejected queued batch"));
            }
        }

        if !state.closed {
            state.senders.insert(kind, tx);
        }

        trace!("Observer registered on '{}' for {}", self.name, kind);
        Ok(rx)
    }

    async fn wait_for_load(&self) -> bool {
        let mut rx = self.load.subscribe();
        rx.wait_for(|state| *state != LoadState::Pending)
            .await
            .map(|state| *state == LoadState::Loaded)
            .unwrap_or(false)
    }

    async fn navigation_timing(&self) -> Option<NavigationTiming> {
        let mut state = self.lock().ok()?;
        self.note_timing_read(&mut state);
        state.navigation.clone()
    }

    async fn legacy_timing(&self) -> Option<LegacyTiming> {
        let mut state = self.lock().ok()?;
        self.note_timing_read(&mut state);
        state.legacy.clone()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{LayoutShift, PerformanceEntry};

    fn shift(value: f64) -> PerformanceEntry {
        PerformanceEntry::LayoutShift(LayoutShift {
            start_time: 0.0,
            value,
            had_recent_input: false,
        })
    }

    #[tokio::test]
    async fn test_queued_then_live_batches() {
        let source = MemorySource::new("page");
        source.queue_batch(EntryKind::LayoutShift, vec![shift(0.1)]).unwrap();

        let mut rx = source.observe(EntryKind::LayoutShift).await.unwrap();
        source
            .push_batch(EntryKind::LayoutShift, vec![shift(0.2), shift(0.3)])
            .await
            .unwrap();
        source.close().unwrap();

        assert_eq!(rx.recv().await.unwrap().len(), 1);
        assert_eq!(rx.recv().await.unwrap().len(), 2);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unsupported_channel() {
        let source = MemorySource::new("page");
        source
            .mark_unsupported(EntryKind::FirstInput, "not implemented")
            .unwrap();

        let err = source.observe(EntryKind::FirstInput).await.unwrap_err();
        assert_eq!(err.kind, EntryKind::FirstInput);
        assert!(source.observe(EntryKind::Resource).await.is_ok());
    }

    #[tokio::test]
    async fn test_load_and_unload() {
        let loaded = MemorySource::new("loaded");
        loaded.fire_load();
        loaded.close().unwrap();
        assert!(loaded.wait_for_load().await);

        let abandoned = MemorySource::new("abandoned");
        abandoned.close().unwrap();
        abandoned.fire_load();
        assert!(!abandoned.wait_for_load().await);
    }

    #[tokio::test]
    async fn test_tracks_early_timing_reads() {
        let source = MemorySource::new("page");
        source
            .set_navigation_timing(NavigationTiming::default())
            .unwrap();

        assert!(source.navigation_timing().await.is_some());
        assert!(source.timing_read_before_load().unwrap());

        let late = MemorySource::new("late");
        late.fire_load();
        assert!(late.legacy_timing().await.is_none());
        assert!(!late.timing_read_before_load().unwrap());
    }
}
