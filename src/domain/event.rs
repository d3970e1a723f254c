//! Event log entries recorded by handlers during a request

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

/// Severity of an event log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

/// Event being built for the current request
#[derive(Debug, Clone, Default)]
pub struct Event {
    /// Zero means no event was recorded and nothing is logged
    pub id: i64,
    pub realm: String,
    pub source_ip: String,
    pub user_id: String,
    pub client_ids: Vec<String>,
    pub namespace: String,
    pub target_user_id: String,
    pub target_namespace: String,
    pub trace_id: String,
    pub session_id: String,
    pub level: EventLevel,
    pub message: String,
    pub additional_fields: Map<String, Value>,
}

/// Shared handle to the request's [`Event`], cloned into request extensions
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Event>>,
}

impl EventLog {
    pub fn new(event: Event) -> Self {
        Self {
            inner: Arc::new(Mutex::new(event)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Event> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the event as recorded so far
    pub fn snapshot(&self) -> Event {
        self.lock().clone()
    }

    pub fn record(&self, level: EventLevel, event_id: i64, message: impl Into<String>) {
        let mut event = self.lock();
        event.id = event_id;
        event.level = level;
        event.message = message.into();
    }

    pub fn debug(&self, event_id: i64, message: impl Into<String>) {
        self.record(EventLevel::Debug, event_id, message);
    }

    pub fn info(&self, event_id: i64, message: impl Into<String>) {
        self.record(EventLevel::Info, event_id, message);
    }

    pub fn warn(&self, event_id: i64, message: impl Into<String>) {
        self.record(EventLevel::Warn, event_id, message);
    }

    pub fn error(&self, event_id: i64, message: impl Into<String>) {
        self.record(EventLevel::Error, event_id, message);
    }

    pub fn fatal(&self, event_id: i64, message: impl Into<String>) {
        self.record(EventLevel::Fatal, event_id, message);
    }

    /// Set the user the event acts upon
    pub fn target_user(&self, user_id: impl Into<String>, namespace: impl Into<String>) {
        let mut event = self.lock();
        event.target_user_id = user_id.into();
        event.target_namespace = namespace.into();
    }

    /// Replace the additional fields logged with the event
    pub fn additional_fields(&self, fields: Map<String, Value>) {
        self.lock().additional_fields = fields;
    }
}
