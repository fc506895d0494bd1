use crate::events::{Alert, RiskAssessment, SensorReading};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Insert channels a client can listen on, one per row type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    SensorReadings,
    Alerts,
    RiskAssessments,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::SensorReadings, Topic::Alerts, Topic::RiskAssessments];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::SensorReadings => "sensor_readings",
            Topic::Alerts => "alerts",
            Topic::RiskAssessments => "risk_assessments",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A newly persisted row, as delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    Reading(SensorReading),
    Assessment(RiskAssessment),
    Alert(Alert),
}

impl RowEvent {
    pub fn topic(&self) -> Topic {
        match self {
            RowEvent::Reading(_) => Topic::SensorReadings,
            RowEvent::Assessment(_) => Topic::RiskAssessments,
            RowEvent::Alert(_) => Topic::Alerts,
        }
    }
}

/// A row type that has its own topic
pub trait Row: Clone + Send + Sync + 'static {
    const TOPIC: Topic;

    fn from_event(event: &RowEvent) -> Option<&Self>;

    fn into_event(self) -> RowEvent;
}

impl Row for SensorReading {
    const TOPIC: Topic = Topic::SensorReadings;

    fn from_event(event: &RowEvent) -> Option<&Self> {
        match event {
            RowEvent::Reading(reading) => Some(reading),
            _ => None,
        }
    }

    fn into_event(self) -> RowEvent {
        RowEvent::Reading(self)
    }
}

impl Row for RiskAssessment {
    const TOPIC: Topic = Topic::RiskAssessments;

    fn from_event(event: &RowEvent) -> Option<&Self> {
        match event {
            RowEvent::Assessment(assessment) => Some(assessment),
            _ => None,
        }
    }

    fn into_event(self) -> RowEvent {
        RowEvent::Assessment(self)
    }
}

impl Row for Alert {
    const TOPIC: Topic = Topic::Alerts;

    fn from_event(event: &RowEvent) -> Option<&Self> {
        match event {
            RowEvent::Alert(alert) => Some(alert),
            _ => None,
        }
    }

    fn into_event(self) -> RowEvent {
        RowEvent::Alert(self)
    }
}

/// Callback run for every event on a subscribed topic
pub type Handler = Arc<dyn Fn(&RowEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    closed: bool,
    handlers: HashMap<Topic, Vec<(u64, Handler)>>,
}

impl Registry {
    fn contains(&self, topic: Topic, id: u64) -> bool {
        self.handlers
            .get(&topic)
            .map_or(false, |list| list.iter().any(|(sid, _)| *sid == id))
    }

    fn remove(&mut self, topic: Topic, id: u64) -> bool {
        match self.handlers.get_mut(&topic) {
            Some(list) => {
                let before = list.len();
                list.retain(|(sid, _)| *sid != id);
                before != list.len()
            }
            None => false,
        }
    }
}

/// In-process publish/subscribe fan-out for inserted rows
///
/// Handlers are invoked synchronously on the publishing thread, after the
/// registry lock is released, so a handler may subscribe or unsubscribe.
/// Each publish sees the subscriber set as of the moment it started.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.lock();
        f.debug_struct("EventBus")
            .field("closed", &registry.closed)
            .field(
                "subscribers",
                &registry.handlers.values().map(Vec::len).sum::<usize>(),
            )
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        // a panicking handler never runs under this lock, so the data is intact
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `handler` for `topic`
    ///
    /// On a closed bus the returned subscription is already disconnected.
    pub fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;

        if registry.closed {
            warn!("Subscription to {} refused: event bus is closed", topic);
        } else {
            registry
                .handlers
                .entry(topic)
                .or_default()
                .push((id, handler));
            debug!("Subscribed #{} to {}", id, topic);
        }

        Subscription {
            registry: Arc::downgrade(&self.registry),
            topic,
            id,
        }
    }

    /// Deliver `event` to every current subscriber of its topic
    ///
    /// # Returns
    ///
    /// The number of handlers that were called
    pub fn publish(&self, event: &RowEvent) -> usize {
        let topic = event.topic();
        let handlers: Vec<Handler> = {
            let registry = self.lock();
            if registry.closed {
                return 0;
            }
            registry
                .handlers
                .get(&topic)
                .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.lock().handlers.get(&topic).map_or(0, Vec::len)
    }

    /// Drop every subscriber and refuse further deliveries
    pub fn close(&self) {
        let mut registry = self.lock();
        registry.closed = true;
        registry.handlers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Handle for one registered handler; unsubscribes when dropped
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    topic: Topic,
    id: u64,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Whether the handler is still registered on a live bus
    pub fn is_connected(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => {
                let registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
                !registry.closed && registry.contains(self.topic, self.id)
            }
            None => false,
        }
    }

    pub fn unsubscribe(self) {
        // Drop does the work
    }

    fn detach(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);
            if registry.remove(self.topic, self.id) {
                debug!("Unsubscribed #{} from {}", self.id, self.topic);
            }
        }
        self.registry = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
