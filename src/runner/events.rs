//! Status events and the sinks that observe them.
//!
//! The executor emits one [`RunEvent`] per status transition. Sinks receive
//! them in order and must not block for long; they cannot influence the run.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::steps::StepStatus;

/// One status transition of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub status: StepStatus,
    /// Group names from the root down, ending with the step key.
    pub task_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp_ms: i64,
}

impl RunEvent {
    /// Create an event stamped with the current wall-clock time.
    pub fn new(status: StepStatus, task_path: Vec<String>, message: Option<String>) -> Self {
        Self {
            status,
            task_path,
            message,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Key of the step this event belongs to.
    pub fn key(&self) -> &str {
        self.task_path.last().map(String::as_str).unwrap_or_default()
    }

    /// Slash-joined path, e.g. `deploy/db/migrate`.
    pub fn path_string(&self) -> String {
        self.task_path.join("/")
    }

    /// Nesting depth below the root group (0 for root-level steps).
    pub fn depth(&self) -> usize {
        self.task_path.len().saturating_sub(2)
    }
}

/// Consumer of the executor's event stream.
pub trait EventSink: Send {
    fn emit(&mut self, event: &RunEvent);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &RunEvent) {
        (**self).emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: &RunEvent) {
        (**self).emit(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &RunEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Vec<RunEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<RunEvent> {
        self.events
    }

    /// Statuses recorded for the step with the given key, in order.
    pub fn statuses_for(&self, key: &str) -> Vec<StepStatus> {
        self.events
            .iter()
            .filter(|e| e.key() == key)
            .map(|e| e.status)
            .collect()
    }

    /// `(key, status)` pairs in emission order.
    pub fn transitions(&self) -> Vec<(String, StepStatus)> {
        self.events
            .iter()
            .map(|e| (e.key().to_string(), e.status))
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &RunEvent) {
        self.events.push(event.clone());
    }
}

/// Forwards events into an unbounded channel.
///
/// Clones share the same receiver, so several concurrent runs can feed one
/// reporter task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: &RunEvent) {
        // A dropped receiver means nobody is watching; the run goes on.
        let _ = self.tx.send(event.clone());
    }
}

/// Adapts a closure into a sink.
pub struct FnSink<F>(pub F);

impl<F> EventSink for FnSink<F>
where
    F: FnMut(&RunEvent) + Send,
{
    fn emit(&mut self, event: &RunEvent) {
        (self.0)(event);
    }
}
