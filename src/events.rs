use serde::Serialize;
use tokio::sync::broadcast;

use crate::db::models::{ServiceRecord, ServiceStatus};
use crate::lifecycle::Severity;

/// Notifications flowing up to host views. Successful transitions and
/// rejected ones are distinct events so the UI can confirm one and toast
/// the other.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueueEvent {
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        service_id: String,
        status: ServiceStatus,
    },
    #[serde(rename_all = "camelCase")]
    TransitionRejected {
        service_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Tick {
        service_id: String,
        elapsed_seconds: i64,
        severity: Severity,
    },
    #[serde(rename_all = "camelCase")]
    ServiceCompleted {
        service_id: String,
        record: ServiceRecord,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.sender.subscribe()
    }

    /// Emitting with no subscribers is not an error.
    pub fn emit(&self, event: QueueEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
