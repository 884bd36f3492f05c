//! Subscriber registration and fan-out publication.

use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::event::{EventPublisher, OrgEvent};

/// Publisher that drops every event.
///
/// The default wiring for managers constructed without observability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPublisher;

impl EventPublisher for NullPublisher {
    fn publish(&self, _event: &OrgEvent) {}
}

/// Publisher that records events in memory for later inspection.
#[derive(Debug, Default)]
pub struct CollectingPublisher {
    events: Mutex<Vec<OrgEvent>>,
}

impl CollectingPublisher {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns all recorded events.
    ///
    /// # Panics
    ///
    /// Panics if the internal event buffer lock has been poisoned.
    #[must_use]
    pub fn drain(&self) -> Vec<OrgEvent> {
        let mut guard = self.events.lock().expect("event buffer poisoned");
        std::mem::take(&mut *guard)
    }

    /// Returns the number of recorded events without draining them.
    ///
    /// # Panics
    ///
    /// Panics if the internal event buffer lock has been poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().expect("event buffer poisoned").len()
    }

    /// Returns `true` when no events have been recorded.
    ///
    /// # Panics
    ///
    /// Panics if the internal event buffer lock has been poisoned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventPublisher for CollectingPublisher {
    fn publish(&self, event: &OrgEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}

/// Fan-out bus with explicit subscriber registration.
///
/// Subscribers are registered after construction, so a running organization
/// can gain observers without rebuilding its managers. Delivery order follows
/// registration order.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Arc<dyn EventPublisher>>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber list lock has been poisoned.
    pub fn subscribe(&self, subscriber: Arc<dyn EventPublisher>) {
        let mut guard = self.subscribers.write().expect("subscriber list poisoned");
        guard.push(subscriber);
    }

    /// Returns the number of registered subscribers.
    ///
    /// # Panics
    ///
    /// Panics if the subscriber list lock has been poisoned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscriber list poisoned")
            .len()
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: &OrgEvent) {
        let Ok(guard) = self.subscribers.read() else {
            debug!(event = event.label(), "event dropped, subscriber list poisoned");
            return;
        };
        for subscriber in guard.iter() {
            subscriber.publish(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_fans_out_to_all_subscribers() {
        let bus = EventBus::new();
        let first = Arc::new(CollectingPublisher::new());
        let second = Arc::new(CollectingPublisher::new());
        bus.subscribe(Arc::clone(&first) as Arc<dyn EventPublisher>);
        bus.subscribe(Arc::clone(&second) as Arc<dyn EventPublisher>);

        bus.publish(&OrgEvent::RuleRegistered {
            name: "r1".into(),
            engine: "access".into(),
        });

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn collector_drains_once() {
        let collector = CollectingPublisher::new();
        collector.publish(&OrgEvent::ChannelMessage {
            input: "ja".into(),
            intent: "approve".into(),
        });

        assert_eq!(collector.drain().len(), 1);
        assert!(collector.is_empty());
    }

    #[test]
    fn null_publisher_accepts_everything() {
        NullPublisher.publish(&OrgEvent::RuleRegistered {
            name: "noop".into(),
            engine: "escalation".into(),
        });
    }
}
