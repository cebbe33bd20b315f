//! Event bus for broadcasting loop notifications
//!
//! Handlers are kept per [`EventKind`] in registration order and invoked
//! synchronously by [`EventBus::emit`].

use crate::event::{EventKind, LoopEvent};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

type Handler = Rc<RefCell<dyn FnMut(f64)>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<EventKind, Vec<(u64, Handler)>>,
}

/// Publish/subscribe hub owned by a loop
#[derive(Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

/// Registration handle returned by [`EventBus::subscribe`].
///
/// Dropping it leaves the handler registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    kind: EventKind,
    id: u64,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler. Returns false if the bus is gone or the handler
    /// was already removed.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.borrow_mut();
        let Some(list) = registry.handlers.get_mut(&self.kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != self.id);
        list.len() != before
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one kind of event
    pub fn subscribe(&self, kind: EventKind, handler: impl FnMut(f64) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let handler: Handler = Rc::new(RefCell::new(handler));
        registry.handlers.entry(kind).or_default().push((id, handler));
        Subscription {
            registry: Rc::downgrade(&self.registry),
            kind,
            id,
        }
    }

    /// Deliver an event to every handler of its kind, in registration order.
    ///
    /// The handler list is snapshotted first, so handlers may subscribe,
    /// unsubscribe, or emit without invalidating this pass.
    pub fn emit(&self, event: LoopEvent) {
        self.emit_while(event, || true);
    }

    /// Like [`EventBus::emit`], but `keep_going` is checked before each
    /// handler and delivery stops as soon as it returns false.
    pub fn emit_while(&self, event: LoopEvent, keep_going: impl Fn() -> bool) {
        let snapshot: Vec<Handler> = self
            .registry
            .borrow()
            .handlers
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();

        let value = event.value();
        for handler in snapshot {
            if !keep_going() {
                break;
            }
            // Busy means the handler is re-entering its own emission.
            match handler.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(value),
                Err(_) => tracing::trace!(?event, "skipping re-entrant handler"),
            }
        }
    }

    /// Number of handlers registered for a kind
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.registry
            .borrow()
            .handlers
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Check if any handler is registered at all
    pub fn is_empty(&self) -> bool {
        self.registry.borrow().handlers.values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_emit_reaches_matching_kind_only() {
        let bus = EventBus::new();
        let updates = Rc::new(RefCell::new(Vec::new()));
        let drops = Rc::new(RefCell::new(Vec::new()));

        let u = updates.clone();
        let _a = bus.subscribe(EventKind::Update, move |v| u.borrow_mut().push(v));
        let d = drops.clone();
        let _b = bus.subscribe(EventKind::StepDropped, move |v| d.borrow_mut().push(v));

        bus.emit(LoopEvent::Update { alpha: 0.25 });
        bus.emit(LoopEvent::StepDropped { overflow_ms: 12.0 });
        bus.emit(LoopEvent::Update { alpha: 0.5 });

        assert_eq!(*updates.borrow(), vec![0.25, 0.5]);
        assert_eq!(*drops.borrow(), vec![12.0]);
    }

    #[test]
    fn test_registration_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let o = order.clone();
            let _ = bus.subscribe(EventKind::Update, move |_| o.borrow_mut().push(name));
        }

        bus.emit(LoopEvent::Update { alpha: 0.0 });
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let sub = bus.subscribe(EventKind::Update, move |_| h.set(h.get() + 1));
        assert_eq!(bus.handler_count(EventKind::Update), 1);

        bus.emit(LoopEvent::Update { alpha: 0.1 });
        assert!(sub.unsubscribe());
        bus.emit(LoopEvent::Update { alpha: 0.2 });

        assert_eq!(hits.get(), 1);
        assert_eq!(bus.handler_count(EventKind::Update), 0);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = EventBus::new();
        let sub = bus.subscribe(EventKind::StepDropped, |_| {});
        drop(bus);
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn test_subscribe_during_emit_applies_next_time() {
        let bus = Rc::new(EventBus::new());
        let late_hits = Rc::new(Cell::new(0));

        let (b, l) = (bus.clone(), late_hits.clone());
        let _ = bus.subscribe(EventKind::Update, move |_| {
            let l = l.clone();
            let _ = b.subscribe(EventKind::Update, move |_| l.set(l.get() + 1));
        });

        bus.emit(LoopEvent::Update { alpha: 0.0 });
        assert_eq!(late_hits.get(), 0);
        bus.emit(LoopEvent::Update { alpha: 0.0 });
        assert_eq!(late_hits.get(), 1);
    }

    #[test]
    fn test_emit_while_stops_delivery() {
        let bus = Rc::new(EventBus::new());
        let open = Rc::new(Cell::new(true));
        let calls = Rc::new(RefCell::new(Vec::new()));

        let (o, c) = (open.clone(), calls.clone());
        let _ = bus.subscribe(EventKind::Update, move |_| {
            c.borrow_mut().push("first");
            o.set(false);
        });
        let c = calls.clone();
        let _ = bus.subscribe(EventKind::Update, move |_| c.borrow_mut().push("second"));

        let o = open.clone();
        bus.emit_while(LoopEvent::Update { alpha: 0.0 }, || o.get());
        assert_eq!(*calls.borrow(), vec!["first"]);

        open.set(true);
        bus.emit(LoopEvent::Update { alpha: 0.0 });
        assert_eq!(*calls.borrow(), vec!["first", "first", "second"]);
    }

    #[test]
    fn test_reentrant_emit_skips_busy_handler() {
        let bus = Rc::new(EventBus::new());
        let calls = Rc::new(Cell::new(0));

        let (b, c) = (bus.clone(), calls.clone());
        let _ = bus.subscribe(EventKind::Update, move |_| {
            c.set(c.get() + 1);
            b.emit(LoopEvent::Update { alpha: 0.0 });
        });

        bus.emit(LoopEvent::Update { alpha: 0.0 });
        assert_eq!(calls.get(), 1);
    }
}
