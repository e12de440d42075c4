//! Analytics egress
//!
//! A sink receives reported events fire-and-forget. Whether a sink is
//! present at all is optional; see [`dispatch`].
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::sync::Mutex;

use crate::error::{Result, VitalsError};

/// Event label: either free text or the raw measured number
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Number(f64),
}

impl From<&str> for Label {
    fn from(text: &str) -> Self {
        Label::Text(text.to_string())
    }
}

impl From<String> for Label {
    fn from(text: String) -> Self {
        Label::Text(text)
    }
}

impl From<f64> for Label {
    fn from(number: f64) -> Self {
        Label::Number(number)
    }
}

/// Reported value: whole milliseconds, or a decimal score such as CLS
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventValue {
    Integer(i64),
    Decimal(f64),
}

impl EventValue {
    /// Build an integer value from an already rounded float
    pub fn whole(value: f64) -> Self {
        EventValue::Integer(value as i64)
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            EventValue::Integer(v) => v as f64,
            EventValue::Decimal(v) => v,
        }
    }
}

impl fmt::Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::Integer(v) => write!(f, "{}", v),
            EventValue::Decimal(v) => write!(f, "{}", v),
        }
    }
}

/// An event as handed to an analytics sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsEvent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<EventValue>,
    /// Extra named properties, e.g. `load_time`
    #[serde(flatten)]
    pub properties: BTreeMap<String, Value>,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            label: None,
            value: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn value(mut self, value: EventValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Trait for analytics egress
pub trait ObservabilitySink: Send + Sync + 'static {
    /// Hand an event to the sink
    fn report(&self, event: &AnalyticsEvent) -> Result<()>;

    /// Get the sink name
    fn name(&self) -> &str;
}

/// Report `event` if a sink is installed.
///
/// A missing sink is a silent no-op and a failing sink is only logged:
/// reporting must never disturb the caller.
pub fn dispatch(sink: Option<&dyn ObservabilitySink>, event: &AnalyticsEvent) {
    let Some(sink) = sink else {
        return;
    };

    if let Err(e) = sink.report(event) {
        warn!("Sink '{}' failed to report '{}': {}", sink.name(), event.name, e);
    }
}

/// Writes events to the log
#[derive(Debug, Default)]
pub struct LogSink;

impl ObservabilitySink for LogSink {
    fn report(&self, event: &AnalyticsEvent) -> Result<()> {
        let properties = serde_json::to_string(&event.properties)?;
        info!(
            "event={} category={} value={} properties={}",
            event.name,
            event.category.as_deref().unwrap_or("-"),
            event.value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string()),
            properties
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Keeps every reported event in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events reported so far, in order
    pub fn events(&self) -> Result<Vec<AnalyticsEvent>> {
        let events = self
            .events
            .lock()
            .map_err(|_| VitalsError::Sink("Lock poisoned".to_string()))?;
        Ok(events.clone())
    }

    /// Events with the given name, in order
    pub fn events_named(&self, name: &str) -> Result<Vec<AnalyticsEvent>> {
        Ok(self
            .events()?
            .into_iter()
            .filter(|event| event.name == name)
            .collect())
    }
}

impl ObservabilitySink for MemorySink {
    fn report(&self, event: &AnalyticsEvent) -> Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| VitalsError::Sink("Lock poisoned".to_string()))?;
        events.push(event.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Writes one JSON object per event to any writer
pub struct JsonLinesSink<W: Write + Send + 'static> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|_| VitalsError::Sink("Lock poisoned".to_string()).into())
    }
}

impl<W: Write + Send + 'static> ObservabilitySink for JsonLinesSink<W> {
    fn report(&self, event: &AnalyticsEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| VitalsError::Sink("Lock poisoned".to_string()))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "json_lines"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingSink;

    impl ObservabilitySink for FailingSink {
        fn report(&self, _event: &AnalyticsEvent) -> Result<()> {
            Err(VitalsError::Sink("endpoint unreachable".to_string()).into())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn test_event_shape() {
        let event = AnalyticsEvent::new("LCP")
            .category("Web Vitals")
            .label(1234.5)
            .value(EventValue::Integer(1235));

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({"name": "LCP", "category": "Web Vitals", "label": 1234.5, "value": 1235})
        );
    }

    #[test]
    fn test_properties_are_flattened() {
        let event = AnalyticsEvent::new("page_load_performance")
            .category("Performance")
            .property("load_time", 12)
            .property("dom_content_loaded", 4);

        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "name": "page_load_performance",
                "category": "Performance",
                "load_time": 12,
                "dom_content_loaded": 4
            })
        );
    }

    #[test]
    fn test_dispatch_without_sink_is_noop() {
        dispatch(None, &AnalyticsEvent::new("CLS"));
    }

    #[test]
    fn test_dispatch_swallows_sink_errors() {
        dispatch(Some(&FailingSink), &AnalyticsEvent::new("CLS"));
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        dispatch(Some(&sink), &AnalyticsEvent::new("LCP"));
        dispatch(Some(&sink), &AnalyticsEvent::new("FID"));
        dispatch(Some(&sink), &AnalyticsEvent::new("LCP"));

        let names: Vec<_> = sink.events().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["LCP", "FID", "LCP"]);
        assert_eq!(sink.events_named("LCP").unwrap().len(), 2);
    }

    #[test]
    fn test_json_lines_sink() {
        let sink = JsonLinesSink::new(Vec::new());
        sink.report(&AnalyticsEvent::new("CLS").value(EventValue::Decimal(0.125)))
            .unwrap();
        sink.report(&AnalyticsEvent::new("FID").value(EventValue::Integer(16)))
            .unwrap();

        let output = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines, vec![r#"{"name":"CLS","value":0.125}"#, r#"{"name":"FID","value":16}"#]);
    }
}
