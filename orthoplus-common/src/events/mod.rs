//! Domain events and the handler registry that dispatches them
//!
//! The [`EventBus`] maps event names to ordered lists of handlers. It is
//! built once at startup and handed to whoever publishes (usually wrapped
//! in an `Arc`). There is no process-wide instance.

mod audit;

pub use audit::AuditLogHandler;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::Result;

/// Events published by the split-payment use cases
///
/// Serialized with a `type` tag so audit rows and logs are self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    /// A split configuration was created
    SplitConfigCreated {
        config_id: Uuid,
        clinic_id: Uuid,
        created_by: Uuid,
        name: String,
        split_type: String,
        timestamp: DateTime<Utc>,
    },

    /// A split configuration was deactivated
    SplitConfigDeactivated {
        config_id: Uuid,
        clinic_id: Uuid,
        deactivated_by: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A payment was split and the transaction persisted
    SplitApplied {
        transaction_id: Uuid,
        clinic_id: Uuid,
        config_id: Uuid,
        amount_total_cents: i64,
        payment_method: String,
        created_by: Uuid,
        timestamp: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub const SPLIT_CONFIG_CREATED: &'static str = "split_config.created";
    pub const SPLIT_CONFIG_DEACTIVATED: &'static str = "split_config.deactivated";
    pub const SPLIT_APPLIED: &'static str = "split.applied";

    /// Every event name, in declaration order
    pub const ALL_NAMES: [&'static str; 3] = [
        Self::SPLIT_CONFIG_CREATED,
        Self::SPLIT_CONFIG_DEACTIVATED,
        Self::SPLIT_APPLIED,
    ];

    /// Registry key for this event
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::SplitConfigCreated { .. } => Self::SPLIT_CONFIG_CREATED,
            DomainEvent::SplitConfigDeactivated { .. } => Self::SPLIT_CONFIG_DEACTIVATED,
            DomainEvent::SplitApplied { .. } => Self::SPLIT_APPLIED,
        }
    }

    /// Tenant the event belongs to
    pub fn clinic_id(&self) -> Uuid {
        match self {
            DomainEvent::SplitConfigCreated { clinic_id, .. }
            | DomainEvent::SplitConfigDeactivated { clinic_id, .. }
            | DomainEvent::SplitApplied { clinic_id, .. } => *clinic_id,
        }
    }

    /// User who caused the event
    pub fn actor_id(&self) -> Uuid {
        match self {
            DomainEvent::SplitConfigCreated { created_by, .. } => *created_by,
            DomainEvent::SplitConfigDeactivated { deactivated_by, .. } => *deactivated_by,
            DomainEvent::SplitApplied { created_by, .. } => *created_by,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            DomainEvent::SplitConfigCreated { timestamp, .. }
            | DomainEvent::SplitConfigDeactivated { timestamp, .. }
            | DomainEvent::SplitApplied { timestamp, .. } => *timestamp,
        }
    }
}

/// Receives published events
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Identifier used in logs
    fn handler_name(&self) -> &'static str;

    /// Handle one event. Errors are logged by the bus and do not stop dispatch.
    async fn handle(&self, event: &DomainEvent) -> Result<()>;
}

/// Registry of event handlers keyed by event name
///
/// Handlers for one event run sequentially, in registration order, each
/// awaited before the next starts.
///
/// # Examples
///
/// ```
/// use orthoplus_common::events::EventBus;
///
/// let bus = EventBus::new();
/// assert_eq!(bus.handler_count("split.applied"), 0);
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `event_name`
    pub fn subscribe(&mut self, event_name: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.handlers
            .entry(event_name.into())
            .or_default()
            .push(handler);
    }

    /// Register `handler` for every known event
    pub fn subscribe_all(&mut self, handler: Arc<dyn EventHandler>) {
        for name in DomainEvent::ALL_NAMES {
            self.subscribe(name, Arc::clone(&handler));
        }
    }

    /// Number of handlers registered for `event_name`
    pub fn handler_count(&self, event_name: &str) -> usize {
        self.handlers.get(event_name).map_or(0, Vec::len)
    }

    /// Dispatch `event` to its handlers
    ///
    /// Returns how many handlers completed successfully.
    pub async fn publish(&self, event: &DomainEvent) -> usize {
        let Some(handlers) = self.handlers.get(event.name()) else {
            debug!("No handlers registered for {}", event.name());
            return 0;
        };

        let mut succeeded = 0;
        for handler in handlers {
            match handler.handle(event).await {
                Ok(()) => succeeded += 1,
                Err(e) => warn!(
                    "Event handler {} failed for {}: {}",
                    handler.handler_name(),
                    event.name(),
                    e
                ),
            }
        }

        succeeded
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<&str, usize> = self
            .handlers
            .iter()
            .map(|(name, list)| (name.as_str(), list.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Mutex;

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        fn handler_name(&self) -> &'static str {
            self.label
        }

        async fn handle(&self, event: &DomainEvent) -> Result<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.label, event.name()));
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl EventHandler for Failing {
        fn handler_name(&self) -> &'static str {
            "failing"
        }

        async fn handle(&self, _event: &DomainEvent) -> Result<()> {
            Err(Error::Internal("boom".to_string()))
        }
    }

    fn applied_event() -> DomainEvent {
        DomainEvent::SplitApplied {
            transaction_id: Uuid::new_v4(),
            clinic_id: Uuid::new_v4(),
            config_id: Uuid::new_v4(),
            amount_total_cents: 1000,
            payment_method: "PIX".to_string(),
            created_by: Uuid::new_v4(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(
            DomainEvent::SPLIT_APPLIED,
            Arc::new(Recorder { label: "first", log: Arc::clone(&log) }),
        );
        bus.subscribe(
            DomainEvent::SPLIT_APPLIED,
            Arc::new(Recorder { label: "second", log: Arc::clone(&log) }),
        );

        let succeeded = bus.publish(&applied_event()).await;

        assert_eq!(succeeded, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:split.applied", "second:split.applied"]
        );
    }

    #[tokio::test]
    async fn failing_handler_does_not_stop_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(DomainEvent::SPLIT_APPLIED, Arc::new(Failing));
        bus.subscribe(
            DomainEvent::SPLIT_APPLIED,
            Arc::new(Recorder { label: "after", log: Arc::clone(&log) }),
        );

        let succeeded = bus.publish(&applied_event()).await;

        assert_eq!(succeeded, 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unrelated_events_are_not_delivered() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(
            DomainEvent::SPLIT_CONFIG_CREATED,
            Arc::new(Recorder { label: "config", log: Arc::clone(&log) }),
        );

        assert_eq!(bus.publish(&applied_event()).await, 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn subscribe_all_covers_every_event() {
        let mut bus = EventBus::new();
        bus.subscribe_all(Arc::new(Failing));
        for name in DomainEvent::ALL_NAMES {
            assert_eq!(bus.handler_count(name), 1);
        }
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(applied_event()).unwrap();
        assert_eq!(json["type"], "SplitApplied");
        assert_eq!(json["amount_total_cents"], 1000);
    }
}
