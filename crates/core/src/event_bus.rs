//! Campaign event bus — trait for emitting delivery lifecycle events.
//!
//! Components accept an `Arc<dyn EventSink>`; the server wires a
//! tracing-backed sink, tests capture events in memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CampaignActivated,
    MessageQueued,
    MessageSent,
    MessageFailed,
    DuplicateReceipt,
    CampaignCompleted,
    CampaignCancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmEvent {
    pub event_id: Uuid,
    pub event_type: EventType,
    pub campaign_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: CrmEvent);
}

/// No-op sink for modules that don't need event emission.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: CrmEvent) {}
}

/// Writes every event as a structured `tracing` record.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: CrmEvent) {
        tracing::info!(
            target: "crm_events",
            event_id = %event.event_id,
            event_type = ?event.event_type,
            campaign_id = %event.campaign_id,
            customer_id = ?event.customer_id,
            detail = event.detail.as_deref().unwrap_or(""),
            "campaign event"
        );
    }
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<CrmEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<CrmEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn count_type(&self, event_type: EventType) -> usize {
        self.events
            .lock()
            .expect("event bus mutex poisoned")
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().expect("event bus mutex poisoned").clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: CrmEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

pub fn make_event(
    event_type: EventType,
    campaign_id: Uuid,
    customer_id: Option<Uuid>,
    detail: Option<String>,
) -> CrmEvent {
    CrmEvent {
        event_id: Uuid::new_v4(),
        event_type,
        campaign_id,
        customer_id,
        detail,
        timestamp: Utc::now(),
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn tracing_sink() -> Arc<dyn EventSink> {
    Arc::new(TracingSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
