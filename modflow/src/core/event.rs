//! Build event type emitted around stage and module execution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An event emitted while building a module.
///
/// Events are used for observability and are consumed by event sinks for
/// logging or inspection in tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEvent {
    /// The event type (e.g., "stage.started", "module.failed").
    #[serde(rename = "type")]
    pub event_type: String,

    /// When the event occurred (ISO 8601).
    pub timestamp: String,

    /// The event payload data.
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,
}

impl BuildEvent {
    /// Creates a new event.
    #[must_use]
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: crate::utils::iso_timestamp(),
            data: HashMap::new(),
        }
    }

    /// Adds a data field to the event.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a string field from the payload.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(serde_json::Value::as_str)
    }

    fn for_stage(event_type: &str, module: &str, stage: &str) -> Self {
        Self::new(event_type)
            .add_data("module", serde_json::json!(module))
            .add_data("stage", serde_json::json!(stage))
    }

    /// Creates a "stage.started" event.
    #[must_use]
    pub fn stage_started(module: &str, stage: &str) -> Self {
        Self::for_stage("stage.started", module, stage)
    }

    /// Creates a "stage.completed" event.
    #[must_use]
    pub fn stage_completed(module: &str, stage: &str, duration_ms: f64, artifacts: usize) -> Self {
        Self::for_stage("stage.completed", module, stage)
            .add_data("duration_ms", serde_json::json!(duration_ms))
            .add_data("artifacts", serde_json::json!(artifacts))
    }

    /// Creates a "stage.skipped" event.
    #[must_use]
    pub fn stage_skipped(module: &str, stage: &str, reason: &str) -> Self {
        Self::for_stage("stage.skipped", module, stage).add_data("reason", serde_json::json!(reason))
    }

    /// Creates a "stage.failed" event.
    #[must_use]
    pub fn stage_failed(module: &str, stage: &str, error: &str) -> Self {
        Self::for_stage("stage.failed", module, stage).add_data("error", serde_json::json!(error))
    }

    /// Creates a "module.completed" event.
    #[must_use]
    pub fn module_completed(module: &str, run_id: &str, duration_ms: f64) -> Self {
        Self::new("module.completed")
            .add_data("module", serde_json::json!(module))
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("duration_ms", serde_json::json!(duration_ms))
    }

    /// Creates a "module.failed" event.
    #[must_use]
    pub fn module_failed(module: &str, run_id: &str, stage: &str, error: &str) -> Self {
        Self::for_stage("module.failed", module, stage)
            .add_data("run_id", serde_json::json!(run_id))
            .add_data("error", serde_json::json!(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_add_data() {
        let event = BuildEvent::new("test.event")
            .add_data("foo", serde_json::json!("bar"))
            .add_data("count", serde_json::json!(42));

        assert_eq!(event.data.len(), 2);
        assert_eq!(event.str_field("foo"), Some("bar"));
        assert_eq!(event.str_field("count"), None);
    }

    #[test]
    fn test_stage_events_carry_module_and_stage() {
        let event = BuildEvent::stage_skipped("shop", "csslint", "disabled");
        assert_eq!(event.event_type, "stage.skipped");
        assert_eq!(event.str_field("module"), Some("shop"));
        assert_eq!(event.str_field("stage"), Some("csslint"));
        assert_eq!(event.str_field("reason"), Some("disabled"));
    }

    #[test]
    fn test_module_failed_event() {
        let event = BuildEvent::module_failed("shop", "run-1", "csslint", "lint failed");
        assert_eq!(event.event_type, "module.failed");
        assert_eq!(event.str_field("run_id"), Some("run-1"));
    }

    #[test]
    fn test_event_serialization() {
        let event = BuildEvent::stage_completed("shop", "styles", 12.5, 3);
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: BuildEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(event.event_type, deserialized.event_type);
        assert_eq!(deserialized.data.get("artifacts"), Some(&serde_json::json!(3)));
    }
}
