//! Value holders with change notification.
//!
//! Handlers run on the thread that publishes the change. They are cloned out
//! of the registry before being invoked, so a handler may subscribe or
//! publish again without deadlocking.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies a registered handler for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Broadcasts values to registered handlers.
pub struct Notifier<T> {
    handlers: Mutex<Vec<(SubscriptionId, Handler<T>)>>,
    next_id: AtomicU64,
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, handler: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, Arc::new(handler)));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    pub fn notify(&self, value: &T) {
        let handlers: Vec<Handler<T>> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(value);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.lock().len()
    }
}

/// A value that notifies subscribers when it changes.
pub struct ObservableValue<T> {
    value: Mutex<T>,
    notifier: Notifier<T>,
}

impl<T: Clone + PartialEq> ObservableValue<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            notifier: Notifier::new(),
        }
    }

    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    /// Stores `value` and notifies if it differs from the current one.
    pub fn set(&self, value: T) -> bool {
        {
            let mut current = self.value.lock();
            if *current == value {
                return false;
            }
            *current = value.clone();
        }
        self.notifier.notify(&value);
        true
    }

    /// Registers `handler`; with `sync` it is also called with the current value.
    pub fn subscribe(
        &self,
        handler: impl Fn(&T) + Send + Sync + 'static,
        sync: bool,
    ) -> SubscriptionId {
        if sync {
            handler(&self.get());
        }
        self.notifier.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_reaches_all_subscribers() {
        let notifier = Notifier::<i32>::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let received = Arc::clone(&received);
            notifier.subscribe(move |value| received.lock().push(*value));
        }
        notifier.notify(&7);

        assert_eq!(*received.lock(), vec![7, 7]);
    }

    #[test]
    fn test_unsubscribe() {
        let notifier = Notifier::<i32>::new();
        let id = notifier.subscribe(|_| {});
        assert!(notifier.unsubscribe(id));
        assert!(!notifier.unsubscribe(id));
        assert_eq!(notifier.subscriber_count(), 0);
    }

    #[test]
    fn test_observable_only_notifies_on_change() {
        let value = ObservableValue::new(false);
        let count = Arc::new(AtomicU64::new(0));
        {
            let count = Arc::clone(&count);
            value.subscribe(
                move |_| {
                    count.fetch_add(1, Ordering::SeqCst);
                },
                false,
            );
        }

        assert!(value.set(true));
        assert!(!value.set(true));
        assert!(value.set(false));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_observable_sync_subscribe_sees_current_value() {
        let value = ObservableValue::new(3);
        let seen = Arc::new(Mutex::new(None));
        {
            let seen = Arc::clone(&seen);
            value.subscribe(move |v| *seen.lock() = Some(*v), true);
        }
        assert_eq!(*seen.lock(), Some(3));
    }
}
