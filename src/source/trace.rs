//! Recorded page sessions
//!
//! A trace is a JSON document capturing what a page's performance timeline
//! delivered during one visit:
//!
//! ```json
//! {
//!   "batches": [
//!     { "entryType": "layout-shift", "entries": [
//!         { "entryType": "layout-shift", "value": 0.02, "hadRecentInput": false }
//!     ] }
//!   ],
//!   "unsupported": ["first-input"],
//!   "navigation": { "loadEventStart": 1500, "loadEventEnd": 1512,
//!                   "domContentLoadedEventStart": 800, "domContentLoadedEventEnd": 804 },
//!   "timing": { "navigationStart": 0, "loadEventEnd": 1512 },
//!   "loaded": true
//! }
//! ```
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use super::{EntryBatch, MemorySource};
use crate::entry::{EntryKind, LegacyTiming, NavigationTiming};
use crate::error::{Result, VitalsError};

fn default_loaded() -> bool {
    true
}

/// One delivery on one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceBatch {
    pub entry_type: EntryKind,
    #[serde(default)]
    pub entries: EntryBatch,
}

/// A recorded page session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(default)]
    pub batches: Vec<TraceBatch>,
    /// Channels the recording browser could not observe
    #[serde(default)]
    pub unsupported: Vec<EntryKind>,
    #[serde(default)]
    pub navigation: Option<NavigationTiming>,
    #[serde(default)]
    pub timing: Option<LegacyTiming>,
    /// Whether the page reached its load event
    #[serde(default = "default_loaded")]
    pub loaded: bool,
}

impl Trace {
    /// Read and validate a trace file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading trace from {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            VitalsError::Trace(format!("Failed to read trace {}: {}", path.display(), e))
        })?;
        contents.parse()
    }

    /// Every entry in a batch must belong to the batch's channel
    pub fn validate(&self) -> Result<()> {
        for (index, batch) in self.batches.iter().enumerate() {
            if let Some(stray) = batch.entries.iter().find(|e| e.kind() != batch.entry_type) {
                return Err(VitalsError::Trace(format!(
                    "batch {} on {} contains a {} entry",
                    index,
                    batch.entry_type,
                    stray.kind()
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Script a memory source that replays this trace
    pub fn into_source(self, name: impl Into<String>) -> Result<MemorySource> {
        let name = name.into();
        let source = MemorySource::new(name.clone());
        let batch_count = self.batches.len();

        for batch in self.batches {
            source.queue_batch(batch.entry_type, batch.entries)?;
        }
        for kind in self.unsupported {
            source.mark_unsupported(kind, "not recorded by this browser")?;
        }
        if let Some(navigation) = self.navigation {
            source.set_navigation_timing(navigation)?;
        }
        if let Some(timing) = self.timing {
            source.set_legacy_timing(timing)?;
        }
        if self.loaded {
            source.fire_load();
        }

        info!("Replaying {} batches from '{}'", batch_count, name);
        Ok(source)
    }
}

impl FromStr for Trace {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let trace: Trace = serde_json::from_str(s).map_err(VitalsError::from)?;
        trace.validate()?;
        Ok(trace)
    }
}

impl MemorySource {
    /// Build a source from a recorded trace
    pub fn from_trace(trace: Trace, name: impl Into<String>) -> Result<Self> {
        trace.into_source(name)
    }
}
