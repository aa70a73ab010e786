//! Event emission abstraction.
//!
//! Progress and notification payloads are handed to the frontend as plain
//! JSON through an [`EventSink`]; the core never talks to UI widgets.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Emitted once per file while a batch upload runs.
pub const EVENT_UPLOAD_PROGRESS: &str = "upload-progress";
/// Emitted after any mutation that changed the photo list.
pub const EVENT_PHOTOS_CHANGED: &str = "photos-changed";
/// Emitted for toast-style messages.
pub const EVENT_NOTIFICATION: &str = "notification";

/// Trait for emitting events to the frontend.
pub trait EventSink: Send + Sync {
    /// Emit an event with the given name and JSON payload.
    ///
    /// # Arguments
    /// * `event_name` - The name of the event (e.g., "upload-progress")
    /// * `payload_json` - JSON-serialized payload string
    fn emit(&self, event_name: &str, payload_json: &str);
}

/// Extension trait for EventSink that provides typed emit functionality.
pub trait EventSinkExt {
    /// Emit an event with a typed payload that will be serialized to JSON.
    fn emit_typed<T: Serialize>(&self, event_name: &str, payload: &T);
}

impl<S: EventSink + ?Sized> EventSinkExt for S {
    fn emit_typed<T: Serialize>(&self, event_name: &str, payload: &T) {
        match serde_json::to_string(payload) {
            Ok(json) => self.emit(event_name, &json),
            Err(e) => {
                tracing::error!("Failed to serialize event payload: {}", e);
            }
        }
    }
}

/// Shared reference to an EventSink implementation.
pub type SharedEventSink = Arc<dyn EventSink>;

/// No-op event sink for testing or when events are not needed.
#[derive(Debug, Clone, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event_name: &str, _payload_json: &str) {}
}

/// Logging event sink for debugging purposes.
#[derive(Debug, Clone, Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn emit(&self, event_name: &str, payload_json: &str) {
        tracing::debug!(event = event_name, payload = payload_json, "Event emitted");
    }
}

/// Upload progress payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub current: usize,
    pub total: usize,
    pub percentage: f32,
    pub file_name: String,
}

impl UploadProgress {
    pub fn new(current: usize, total: usize, file_name: &str) -> Self {
        let percentage = if total == 0 {
            100.0
        } else {
            (current as f32 / total as f32) * 100.0
        };
        Self {
            current,
            total,
            percentage,
            file_name: file_name.to_string(),
        }
    }
}

/// Payload of [`EVENT_PHOTOS_CHANGED`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotosChanged {
    pub count: usize,
}

/// Severity of a toast notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// Toast notification payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<(String, String)>>);

    impl EventSink for Recorder {
        fn emit(&self, event_name: &str, payload_json: &str) {
            self.0
                .lock()
                .unwrap()
                .push((event_name.to_string(), payload_json.to_string()));
        }
    }

    #[test]
    fn test_emit_typed_serializes_payload() {
        let sink = Recorder::default();
        sink.emit_typed(EVENT_UPLOAD_PROGRESS, &UploadProgress::new(1, 4, "a.jpg"));

        let events = sink.0.lock().unwrap();
        assert_eq!(events[0].0, "upload-progress");
        let payload: UploadProgress = serde_json::from_str(&events[0].1).unwrap();
        assert_eq!(payload.percentage, 25.0);
        assert_eq!(payload.file_name, "a.jpg");
    }
}
