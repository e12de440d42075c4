//! Performance entries as delivered by a page's performance timeline
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The observation channels a collector can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    LargestContentfulPaint,
    FirstInput,
    LayoutShift,
    Resource,
}

impl EntryKind {
    /// All observable channels, in registration order
    pub const ALL: [EntryKind; 4] = [
        EntryKind::LargestContentfulPaint,
        EntryKind::FirstInput,
        EntryKind::LayoutShift,
        EntryKind::Resource,
    ];

    /// The browser's entry-type string for this channel
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::LargestContentfulPaint => "largest-contentful-paint",
            EntryKind::FirstInput => "first-input",
            EntryKind::LayoutShift => "layout-shift",
            EntryKind::Resource => "resource",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown entry type '{}'", s))
    }
}

/// A largest-contentful-paint candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestContentfulPaint {
    #[serde(default)]
    pub name: String,
    pub start_time: f64,
}

/// The first discrete user interaction on the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstInput {
    /// Event name, e.g. "pointerdown" or "keydown"
    pub name: String,
    pub start_time: f64,
    pub processing_start: f64,
}

impl FirstInput {
    /// Time between the interaction and the start of its handler
    pub fn delay(&self) -> f64 {
        self.processing_start - self.start_time
    }
}

/// An unexpected movement of visible content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShift {
    #[serde(default)]
    pub start_time: f64,
    pub value: f64,
    #[serde(default)]
    pub had_recent_input: bool,
}

/// Fetch timing for a single subresource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTiming {
    pub name: String,
    pub initiator_type: String,
    pub start_time: f64,
    pub response_end: f64,
}

impl ResourceTiming {
    pub fn load_time(&self) -> f64 {
        self.response_end - self.start_time
    }
}

/// A single entry on one of the observation channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entryType", rename_all = "kebab-case")]
pub enum PerformanceEntry {
    LargestContentfulPaint(LargestContentfulPaint),
    FirstInput(FirstInput),
    LayoutShift(LayoutShift),
    Resource(ResourceTiming),
}

impl PerformanceEntry {
    /// The channel this entry is delivered on
    pub fn kind(&self) -> EntryKind {
        match self {
            PerformanceEntry::LargestContentfulPaint(_) => EntryKind::LargestContentfulPaint,
            PerformanceEntry::FirstInput(_) => EntryKind::FirstInput,
            PerformanceEntry::LayoutShift(_) => EntryKind::LayoutShift,
            PerformanceEntry::Resource(_) => EntryKind::Resource,
        }
    }

    /// Milliseconds since navigation start
    pub fn start_time(&self) -> f64 {
        match self {
            PerformanceEntry::LargestContentfulPaint(e) => e.start_time,
            PerformanceEntry::FirstInput(e) => e.start_time,
            PerformanceEntry::LayoutShift(e) => e.start_time,
            PerformanceEntry::Resource(e) => e.start_time,
        }
    }
}

/// Navigation timing record, read once the page has loaded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub load_event_start: f64,
    pub load_event_end: f64,
    pub dom_content_loaded_event_start: f64,
    pub dom_content_loaded_event_end: f64,
}

impl NavigationTiming {
    pub fn load_time(&self) -> f64 {
        self.load_event_end - self.load_event_start
    }

    pub fn dom_content_loaded(&self) -> f64 {
        self.dom_content_loaded_event_end - self.dom_content_loaded_event_start
    }
}

/// The older epoch-based timing record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTiming {
    pub navigation_start: f64,
    pub load_event_end: f64,
}

impl LegacyTiming {
    pub fn total_load_time(&self) -> f64 {
        self.load_event_end - self.navigation_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_strings() {
        for kind in EntryKind::ALL {
            assert_eq!(kind.as_str().parse::<EntryKind>().unwrap(), kind);
        }
        assert!("paint".parse::<EntryKind>().is_err());
    }

    #[test]
    fn test_deserialize_browser_shaped_entries() {
        let json = r#"[
            {"entryType": "layout-shift", "value": 0.12, "hadRecentInput": true, "startTime": 10.0},
            {"entryType": "first-input", "name": "pointerdown", "startTime": 100.0, "processingStart": 116.5},
            {"entryType": "resource", "name": "/app.js", "initiatorType": "script", "startTime": 0.0, "responseEnd": 1200.0}
        ]"#;

        let entries: Vec<PerformanceEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].kind(), EntryKind::LayoutShift);

        match &entries[1] {
            PerformanceEntry::FirstInput(input) => assert_eq!(input.delay(), 16.5),
            other => panic!("unexpected entry {:?}", other),
        }

        match &entries[2] {
            PerformanceEntry::Resource(resource) => assert_eq!(resource.load_time(), 1200.0),
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_timing_differences() {
        let nav = NavigationTiming {
            load_event_start: 1500.0,
            load_event_end: 1512.0,
            dom_content_loaded_event_start: 800.0,
            dom_content_loaded_event_end: 803.5,
        };
        assert_eq!(nav.load_time(), 12.0);
        assert_eq!(nav.dom_content_loaded(), 3.5);

        let legacy = LegacyTiming {
            navigation_start: 1_700_000_000_000.0,
            load_event_end: 1_700_000_001_750.0,
        };
        assert_eq!(legacy.total_load_time(), 1750.0);
    }
}
