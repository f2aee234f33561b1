//! crates/clinic_core/src/events.rs
//!
//! The notification bridge: an explicit publish/subscribe bus owned by the
//! application state. Listeners are registered when a component mounts and
//! deregistered when the returned `Subscription` is dropped.

use std::sync::{Arc, Mutex, Weak};

/// The cross-component notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClinicEvent {
    /// The stored booking collection changed (create, toggle or delete).
    AppointmentsUpdated,
    /// A doctor was picked elsewhere on the page; carries the display name.
    SelectDoctor(String),
    /// A general "book now" call to action was used.
    BookNow,
}

type Listener = Box<dyn Fn(&ClinicEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Arc<Listener>)>,
}

/// Fire-and-forget publish/subscribe channel. Cloning shares the same bus.
#[derive(Clone, Default)]
pub struct NotificationBus {
    registry: Arc<Mutex<Registry>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener`. It stays registered until the guard is dropped.
    #[must_use = "dropping the subscription immediately deregisters the listener"]
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ClinicEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(Box::new(listener))));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Dispatches `event` synchronously to every current listener, in
    /// registration order.
    pub fn publish(&self, event: ClinicEvent) {
        // Snapshot so listeners may subscribe or unsubscribe while handling.
        let listeners: Vec<Arc<Listener>> = lock(&self.registry)
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

/// Keeps a listener registered; dropping it deregisters the listener.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

// The registry stays consistent even if a listener panicked mid-dispatch.
fn lock(registry: &Mutex<Registry>) -> std::sync::MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &NotificationBus) -> (Subscription, Arc<Mutex<Vec<ClinicEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = bus.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        (subscription, seen)
    }

    #[test]
    fn listeners_receive_events_in_publish_order() {
        let bus = NotificationBus::new();
        let (_subscription, seen) = recorder(&bus);

        bus.publish(ClinicEvent::BookNow);
        bus.publish(ClinicEvent::SelectDoctor("Dr. Li Wei".to_string()));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ClinicEvent::BookNow,
                ClinicEvent::SelectDoctor("Dr. Li Wei".to_string())
            ]
        );
    }

    #[test]
    fn dropping_the_subscription_stops_delivery() {
        let bus = NotificationBus::new();
        let (subscription, seen) = recorder(&bus);
        let (_other, other_seen) = recorder(&bus);
        assert_eq!(bus.listener_count(), 2);

        drop(subscription);
        bus.publish(ClinicEvent::AppointmentsUpdated);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(other_seen.lock().unwrap().len(), 1);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn clones_share_one_bus() {
        let bus = NotificationBus::new();
        let (_subscription, seen) = recorder(&bus);

        bus.clone().publish(ClinicEvent::AppointmentsUpdated);

        assert_eq!(*seen.lock().unwrap(), vec![ClinicEvent::AppointmentsUpdated]);
    }
}
