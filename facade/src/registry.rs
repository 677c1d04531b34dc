//! Module with [`EventRegistry`] mapping event kinds to registered [`Handler`]s.

use std::{collections::BTreeMap, fmt, rc::Rc};

use drop_bomb::DebugDropBomb;
use miniapp_data_model::{Event, EventKind};

use crate::WebApp;

/// Event handler.
///
/// Handlers are compared by reference: clones of the same handler are equal, while two
/// handlers created from identical closures are not.
#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Event)>);

impl Handler {
    /// Construct new [`Handler`] from a function.
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// Invoke the handler.
    pub(crate) fn call(&self, event: &Event) {
        (self.0)(event);
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Handler {}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Rc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

/// Handlers registered for every event kind, in registration order.
#[derive(Debug, Default)]
pub(crate) struct EventRegistry {
    /// Handlers by event kind. Kinds without handlers are absent.
    handlers: BTreeMap<EventKind, Vec<Handler>>,
}

impl EventRegistry {
    /// Register `handler` for `kind`.
    ///
    /// The same handler may be registered several times and will be invoked once per
    /// registration.
    pub fn subscribe(&mut self, kind: EventKind, handler: Handler) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Remove the first registration of `handler` for `kind`.
    ///
    /// Returns `false` if `handler` wasn't registered.
    pub fn unsubscribe(&mut self, kind: EventKind, handler: &Handler) -> bool {
        let Some(handlers) = self.handlers.get_mut(&kind) else {
            return false;
        };
        let Some(index) = handlers.iter().position(|registered| registered == handler) else {
            return false;
        };

        handlers.remove(index);
        if handlers.is_empty() {
            self.handlers.remove(&kind);
        }
        true
    }

    /// Snapshot of handlers registered for `kind`.
    ///
    /// A snapshot is returned so handlers may (un)subscribe while being invoked.
    /// Such changes take effect starting from the next event.
    pub fn handlers(&self, kind: EventKind) -> Vec<Handler> {
        self.handlers.get(&kind).cloned().unwrap_or_default()
    }

    /// Number of registrations for `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }
}

/// Registered handler which must be removed explicitly.
///
/// The host never cleans handlers up, so a handler registered on every show of some UI leaks
/// unless it's removed on hide. Dropping a [`Subscription`] without calling
/// [`unsubscribe()`](Self::unsubscribe) or [`detach()`](Self::detach) panics in debug builds.
#[must_use = "subscription must be explicitly unsubscribed or detached"]
pub struct Subscription {
    /// Event kind the handler is registered for.
    kind: EventKind,
    /// Registered handler.
    handler: Handler,
    /// Bomb to catch forgotten subscriptions.
    bomb: DebugDropBomb,
}

impl Subscription {
    /// Construct new [`Subscription`] for an already registered `handler`.
    pub(crate) fn new(kind: EventKind, handler: Handler) -> Self {
        Self {
            kind,
            handler,
            bomb: DebugDropBomb::new("`Subscription` dropped without `unsubscribe()` or `detach()`"),
        }
    }

    /// Event kind the handler is registered for.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the handler from `web_app`.
    ///
    /// Returns `false` if it was already removed with [`WebApp::off_event()`].
    pub fn unsubscribe<W: WebApp + ?Sized>(mut self, web_app: &W) -> bool {
        self.bomb.defuse();
        web_app.off_event(self.kind, &self.handler)
    }

    /// Leave the handler registered for the whole session, returning it.
    pub fn detach(mut self) -> Handler {
        self.bomb.defuse();
        self.handler
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Handler which records its `id` into `log`.
    fn recorder(log: &Rc<RefCell<Vec<u8>>>, id: u8) -> Handler {
        let log = Rc::clone(log);
        Handler::new(move |_event| log.borrow_mut().push(id))
    }

    fn dispatch(registry: &EventRegistry, event: &Event) {
        for handler in registry.handlers(event.kind()) {
            handler.call(event);
        }
    }

    #[test]
    fn handlers_are_invoked_once_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EventRegistry::default();
        for id in 0..3 {
            registry.subscribe(EventKind::MainButtonClicked, recorder(&log, id));
        }

        dispatch(&registry, &Event::MainButtonClicked);

        assert_eq!(*log.borrow(), [0, 1, 2]);
    }

    #[test]
    fn handlers_receive_only_their_kind() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EventRegistry::default();
        registry.subscribe(EventKind::BackButtonClicked, recorder(&log, 1));
        registry.subscribe(EventKind::MainButtonClicked, recorder(&log, 2));

        dispatch(&registry, &Event::BackButtonClicked);

        assert_eq!(*log.borrow(), [1]);
    }

    #[test]
    fn unsubscribed_handler_is_not_invoked() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EventRegistry::default();
        let first = recorder(&log, 1);
        registry.subscribe(EventKind::ThemeChanged, first.clone());
        registry.subscribe(EventKind::ThemeChanged, recorder(&log, 2));

        assert!(registry.unsubscribe(EventKind::ThemeChanged, &first));
        dispatch(&registry, &Event::ThemeChanged);

        assert_eq!(*log.borrow(), [2]);
    }

    #[test]
    fn unsubscribe_compares_by_reference() {
        let mut registry = EventRegistry::default();
        let registered = Handler::new(|_event| {});
        registry.subscribe(EventKind::ThemeChanged, registered);

        let lookalike = Handler::new(|_event| {});
        assert!(!registry.unsubscribe(EventKind::ThemeChanged, &lookalike));
        assert_eq!(registry.count(EventKind::ThemeChanged), 1);
    }

    #[test]
    fn unsubscribe_from_another_kind_does_nothing() {
        let mut registry = EventRegistry::default();
        let handler = Handler::new(|_event| {});
        registry.subscribe(EventKind::ThemeChanged, handler.clone());

        assert!(!registry.unsubscribe(EventKind::ViewportChanged, &handler));
        assert_eq!(registry.count(EventKind::ThemeChanged), 1);
    }

    #[test]
    fn duplicate_registrations_are_removed_one_by_one() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = EventRegistry::default();
        let handler = recorder(&log, 1);
        registry.subscribe(EventKind::ThemeChanged, handler.clone());
        registry.subscribe(EventKind::ThemeChanged, handler.clone());

        dispatch(&registry, &Event::ThemeChanged);
        assert_eq!(*log.borrow(), [1, 1]);

        assert!(registry.unsubscribe(EventKind::ThemeChanged, &handler));
        dispatch(&registry, &Event::ThemeChanged);
        assert_eq!(*log.borrow(), [1, 1, 1]);

        assert!(registry.unsubscribe(EventKind::ThemeChanged, &handler));
        assert!(!registry.unsubscribe(EventKind::ThemeChanged, &handler));
        assert_eq!(registry.count(EventKind::ThemeChanged), 0);
    }

    #[test]
    fn event_without_handlers_is_dropped() {
        let registry = EventRegistry::default();
        assert!(registry.handlers(EventKind::InvoiceClosed).is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "dropped without `unsubscribe()` or `detach()`")]
    fn forgotten_subscription_panics_in_debug() {
        let subscription = Subscription::new(EventKind::ThemeChanged, Handler::new(|_event| {}));
        drop(subscription);
    }

    #[test]
    fn detached_subscription_returns_its_handler() {
        let handler = Handler::new(|_event| {});
        let subscription = Subscription::new(EventKind::ThemeChanged, handler.clone());

        assert_eq!(subscription.kind(), EventKind::ThemeChanged);
        assert_eq!(subscription.detach(), handler);
    }
}
