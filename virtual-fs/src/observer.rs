//! Synchronous observer lists.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Handle returned by [`EventHandlers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// An ordered list of callbacks for one kind of event.
///
/// Handlers run on the emitting thread, in subscription order. The list is
/// copied before dispatch so a handler may subscribe or unsubscribe (itself
/// included) while it runs.
pub struct EventHandlers<E> {
    next_id: AtomicU64,
    handlers: Mutex<Vec<(SubscriptionId, Handler<E>)>>,
}

impl<E> EventHandlers<E> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Register a handler.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` when it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.lock();
        match handlers.iter().position(|(existing, _)| *existing == id) {
            Some(index) => {
                handlers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Invoke every registered handler with `event`.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        for handler in snapshot {
            handler(event);
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().is_empty()
    }

    pub fn clear(&self) {
        self.handlers.lock().clear();
    }
}

impl<E> Default for EventHandlers<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHandlers<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("len", &self.len())
            .finish()
    }
}

/// Subscribe-only view over an [`EventHandlers`] list.
///
/// Tree items hand this out so callers can listen without being able to
/// raise events themselves.
pub struct EventSource<'a, E> {
    handlers: &'a EventHandlers<E>,
}

impl<'a, E> EventSource<'a, E> {
    pub fn new(handlers: &'a EventHandlers<E>) -> Self {
        Self { handlers }
    }

    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.handlers.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers.unsubscribe(id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_emit_in_subscription_order() {
        let handlers = EventHandlers::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            handlers.subscribe(move |value: &u32| seen.lock().push(format!("{tag}:{value}")));
        }

        handlers.emit(&7);
        assert_eq!(*seen.lock(), vec!["first:7", "second:7"]);
    }

    #[test]
    fn test_unsubscribe() {
        let handlers = EventHandlers::<()>::new();
        let id = handlers.subscribe(|_| {});

        assert!(handlers.unsubscribe(id));
        assert!(!handlers.unsubscribe(id));
        assert!(handlers.is_empty());
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let handlers = Arc::new(EventHandlers::<()>::new());
        let calls = Arc::new(Mutex::new(0));
        let own_id = Arc::new(Mutex::new(None));

        let id = {
            let handlers_ref = Arc::downgrade(&handlers);
            let calls = calls.clone();
            let own_id = own_id.clone();
            handlers.subscribe(move |_| {
                *calls.lock() += 1;
                if let (Some(list), Some(id)) = (handlers_ref.upgrade(), *own_id.lock()) {
                    list.unsubscribe(id);
                }
            })
        };
        *own_id.lock() = Some(id);

        handlers.emit(&());
        handlers.emit(&());
        assert_eq!(*calls.lock(), 1);
    }
}
