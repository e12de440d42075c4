use tokio::sync::mpsc;

use crate::entry::{EntryKind, LegacyTiming, NavigationTiming, PerformanceEntry};
use crate::error::UnsupportedSignal;

pub mod memory;
pub mod trace;

pub use memory::MemorySource;
pub use trace::{Trace, TraceBatch};

/// A batch of entries delivered together on one channel
pub type EntryBatch = Vec<PerformanceEntry>;

/// Trait for providers of page performance signals
#[async_trait::async_trait]
pub trait PerformanceSource: Send + Sync + 'static {
    /// Subscribe to one observation channel.
    ///
    /// Batches arrive whenever the provider flushes them; the channel
    /// closes when the page goes away.
    async fn observe(&self, kind: EntryKind) -> Result<mpsc::Receiver<EntryBatch>, UnsupportedSignal>;

    /// Resolve once the page has fired its load event.
    ///
    /// Returns `false` if the page went away before loading.
    async fn wait_for_load(&self) -> bool;

    /// The navigation timing record, if the provider has one
    async fn navigation_timing(&self) -> Option<NavigationTiming>;

    /// The legacy timing record, if the provider has one
    async fn legacy_timing(&self) -> Option<LegacyTiming>;

    /// Get the source name
    fn name(&self) -> &str;
}
