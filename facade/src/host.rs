//! Module with [`Host`] trait to abstract the external runtime implementing `Telegram.WebApp`.
//!
//! Used to swap the real JS object with a [simulated](crate::simulated) one in tests.

use std::{fmt, rc::Weak};

use miniapp_data_model::{Command, Event, HostState, Request, Response, Version};
#[cfg(test)]
use mockall::automock;
use tracing::trace;

use crate::RequestToken;

/// Receiver of everything the host sends back.
pub(crate) trait Dispatch {
    /// Handle `event` emitted by the host.
    fn dispatch(&self, event: Event);

    /// Handle `response` delivered through the completion callback of request `token`.
    fn complete(&self, token: RequestToken, response: Response);
}

/// Trait to reflect all used capabilities of the host object.
/// If a new capability is needed, then it should be added in this trait.
///
/// Every method returns immediately. The host applies commands and answers requests later,
/// reporting back through the [`EventSink`] passed to [`attach()`](Host::attach) and through
/// [`Reply`].
#[cfg_attr(test, automock)]
pub trait Host {
    /// Current snapshot of the host state.
    fn state(&self) -> HostState;

    /// Version of the Bot API supported by the host.
    fn version(&self) -> Version {
        self.state().version
    }

    /// Forward `command` to the host.
    fn execute(&self, command: Command);

    /// Forward `request` to the host. Callback response must be sent with `reply`.
    fn submit(&self, request: Request, reply: Reply);

    /// Start delivering host events to `sink`.
    fn attach(&self, sink: EventSink);
}

/// Sink for events emitted by the host.
///
/// Holds only a weak reference to the facade, so events emitted after the facade is dropped
/// are silently discarded.
#[derive(Clone)]
pub struct EventSink {
    /// Facade receiving events.
    target: Weak<dyn Dispatch>,
}

impl EventSink {
    /// Construct new [`EventSink`] delivering to `target`.
    pub(crate) fn new(target: Weak<dyn Dispatch>) -> Self {
        Self { target }
    }

    /// Deliver `event` to the facade.
    pub fn emit(&self, event: Event) {
        match self.target.upgrade() {
            Some(target) => target.dispatch(event),
            None => trace!(kind = %event.kind(), "Facade is dropped, discarding event"),
        }
    }

    /// Whether the facade is still alive.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("attached", &self.is_attached())
            .finish()
    }
}

/// Handle to deliver the callback response of a single request.
pub struct Reply {
    /// Correlation token of the request.
    token: RequestToken,
    /// Facade waiting for the response.
    target: Weak<dyn Dispatch>,
}

impl Reply {
    /// Construct new [`Reply`] for request `token`.
    pub(crate) fn new(token: RequestToken, target: Weak<dyn Dispatch>) -> Self {
        Self { token, target }
    }

    /// Correlation token of the request.
    #[must_use]
    pub const fn token(&self) -> RequestToken {
        self.token
    }

    /// Deliver `response` to the facade.
    ///
    /// Ignored if the request is already resolved by an event or abandoned.
    pub fn send(self, response: Response) {
        match self.target.upgrade() {
            Some(target) => target.complete(self.token, response),
            None => trace!(token = %self.token, "Facade is dropped, discarding response"),
        }
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reply").field("token", &self.token).finish()
    }
}
