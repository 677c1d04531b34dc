//! Module with [`Facade`] structure implementing [`WebApp`] on top of any [`Host`].

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use miniapp_data_model::{Command, Event, EventKind, HostState, Request, Response, Version};
use tracing::{debug, info, trace, warn};

use crate::{
    Completion, Error, Handler, RequestToken, Result, WebApp,
    host::{Dispatch, EventSink, Host, Reply},
    pending::PendingRequests,
    registry::EventRegistry,
};

/// The single access point to the host capabilities.
///
/// Owns the [`Host`] and routes everything it sends back: events go to the registered
/// handlers and resolve matching pending requests, callback responses resolve the request
/// they were issued for.
#[derive(Debug)]
pub struct Facade<H> {
    /// Weak reference to itself passed to the host with every [`Reply`].
    this: Weak<Self>,
    /// Host implementation.
    host: H,
    /// Registered event handlers.
    events: RefCell<EventRegistry>,
    /// Requests waiting for a response.
    pending: RefCell<PendingRequests>,
    /// Last value returned by [`next_token()`](Self::next_token).
    last_token: Cell<u64>,
}

impl<H: Host + 'static> Facade<H> {
    /// Construct new [`Facade`] and attach it to `host`.
    pub fn new(host: H) -> Rc<Self> {
        let facade = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            host,
            events: RefCell::default(),
            pending: RefCell::default(),
            last_token: Cell::new(0),
        });

        let target: Weak<dyn Dispatch> = facade.this.clone();
        facade.host.attach(EventSink::new(target));
        info!(version = %facade.host.version(), "Attached to the Mini App host");

        facade
    }

    /// Check that the host supports `method` introduced in `required` version.
    fn check_version(&self, method: &'static str, required: Version) -> Result<()> {
        let actual = self.host.version();
        if actual < required {
            warn!(method, %required, %actual, "Method is not supported by the host");
            return Err(Error::Unsupported {
                method,
                required,
                actual,
            });
        }
        Ok(())
    }
}

impl<H> Facade<H> {
    /// Underlying host.
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Generate a token not returned before by this facade.
    pub fn next_token(&self) -> RequestToken {
        let token = self.last_token.get().wrapping_add(1);
        self.last_token.set(token);
        RequestToken(token)
    }

    /// Number of requests waiting for a response.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.events.borrow().count(kind)
    }
}

impl<H: Host> Dispatch for Facade<H> {
    fn dispatch(&self, event: Event) {
        let kind = event.kind();
        debug!(%kind, "Dispatching host event");

        let resolved = self
            .pending
            .borrow_mut()
            .take_resolved_by(&event, &|| self.host.state());
        if let Some((token, completion, response)) = resolved {
            debug!(%token, ?response, "Request resolved by event");
            completion.complete(response);
        }

        let handlers = self.events.borrow().handlers(kind);
        if handlers.is_empty() {
            trace!(%kind, "No handlers registered, dropping event");
            return;
        }
        for handler in handlers {
            handler.call(&event);
        }
    }

    fn complete(&self, token: RequestToken, response: Response) {
        let completion = self.pending.borrow_mut().take(token);
        match completion {
            Some(completion) => {
                debug!(%token, ?response, "Request resolved by callback");
                completion.complete(response);
            }
            None => debug!(%token, "Request is already resolved, ignoring callback response"),
        }
    }
}

impl<H: Host + 'static> WebApp for Facade<H> {
    fn state(&self) -> HostState {
        self.host.state()
    }

    fn version(&self) -> Version {
        self.host.version()
    }

    fn execute(&self, command: Command) -> Result<()> {
        self.check_version(command.method(), command.min_version())?;
        command.validate()?;

        debug!(method = command.method(), "Executing command");
        self.host.execute(command);
        Ok(())
    }

    fn on_event(&self, kind: EventKind, handler: Handler) {
        trace!(%kind, ?handler, "Registering handler");
        self.events.borrow_mut().subscribe(kind, handler);
    }

    fn off_event(&self, kind: EventKind, handler: &Handler) -> bool {
        trace!(%kind, ?handler, "Removing handler");
        self.events.borrow_mut().unsubscribe(kind, handler)
    }

    fn submit(&self, token: RequestToken, request: Request, completion: Completion) -> Result<()> {
        let method = request.method();
        self.check_version(method, request.min_version())?;
        request.validate()?;
        self.pending
            .borrow_mut()
            .insert(token, request.clone(), completion)?;

        debug!(%token, method, "Submitting request");
        let target: Weak<dyn Dispatch> = self.this.clone();
        self.host.submit(request, Reply::new(token, target));
        Ok(())
    }

    fn abandon(&self, token: RequestToken) -> bool {
        let abandoned = self.pending.borrow_mut().take(token).is_some();
        if abandoned {
            debug!(%token, "Request abandoned");
        }
        abandoned
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "it's ok in tests")]

    use miniapp_data_model::{
        HostError, Outcome, PopupParams,
        command::Visibility,
        event::{PaymentStatus, payload},
        request::CloudStorageRequest,
    };

    use super::*;
    use crate::host::MockHost;

    /// Mocked host reporting `version` and remembering the attached sink.
    fn mock_host(version: Version) -> (MockHost, Rc<RefCell<Option<EventSink>>>) {
        let sink = Rc::new(RefCell::new(None));

        let mut host = MockHost::new();
        host.expect_version().return_const(version);
        host.expect_attach().times(1).returning_st({
            let sink = Rc::clone(&sink);
            move |attached| *sink.borrow_mut() = Some(attached)
        });
        (host, sink)
    }

    fn emit(sink: &RefCell<Option<EventSink>>, event: Event) {
        let sink = sink.borrow().clone().unwrap();
        sink.emit(event);
    }

    #[test]
    fn command_is_forwarded_to_host() {
        let (mut host, _sink) = mock_host(Version::new(7, 0));
        host.expect_execute()
            .withf(|command| *command == Command::BackButton(Visibility::Show))
            .times(1)
            .return_const(());
        let facade = Facade::new(host);

        facade.execute(Command::BackButton(Visibility::Show)).unwrap();
    }

    #[test]
    fn unsupported_command_never_reaches_host() {
        let (mut host, _sink) = mock_host(Version::new(6, 0));
        host.expect_execute().never();
        let facade = Facade::new(host);

        assert_eq!(
            facade
                .execute(Command::SetClosingConfirmation(true))
                .unwrap_err(),
            Error::Unsupported {
                method: "enableClosingConfirmation",
                required: Version::new(6, 2),
                actual: Version::new(6, 0),
            }
        );
    }

    #[test]
    fn invalid_command_never_reaches_host() {
        let (mut host, _sink) = mock_host(Version::new(7, 0));
        host.expect_execute().never();
        let facade = Facade::new(host);

        assert!(matches!(
            facade.execute(Command::SendData(String::new())),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn callback_response_resolves_request() {
        let (mut host, _sink) = mock_host(Version::new(7, 0));
        host.expect_submit()
            .times(1)
            .returning(|request, reply| {
                assert_eq!(request, Request::RequestWriteAccess);
                reply.send(Ok(Outcome::WriteAccess(true)));
            });
        let facade = Facade::new(host);

        let response = Rc::new(RefCell::new(None));
        facade
            .submit(
                RequestToken(1),
                Request::RequestWriteAccess,
                Completion::callback({
                    let response = Rc::clone(&response);
                    move |received| *response.borrow_mut() = Some(received)
                }),
            )
            .unwrap();

        assert_eq!(*response.borrow(), Some(Ok(Outcome::WriteAccess(true))));
        assert_eq!(facade.pending_count(), 0);
    }

    #[test]
    fn event_and_callback_resolve_request_exactly_once() {
        let (mut host, sink) = mock_host(Version::new(7, 0));
        let replies = Rc::new(RefCell::new(Vec::new()));
        host.expect_submit().times(1).returning_st({
            let replies = Rc::clone(&replies);
            move |_request, reply| replies.borrow_mut().push(reply)
        });
        let facade = Facade::new(host);

        let responses = Rc::new(RefCell::new(Vec::new()));
        facade
            .submit(
                RequestToken(1),
                Request::OpenInvoice("https://t.me/$invoice".to_owned()),
                Completion::callback({
                    let responses = Rc::clone(&responses);
                    move |response| responses.borrow_mut().push(response)
                }),
            )
            .unwrap();

        emit(
            &sink,
            Event::InvoiceClosed(payload::InvoiceClosed {
                url: "https://t.me/$invoice".to_owned(),
                status: PaymentStatus::Paid,
            }),
        );
        let reply = replies.borrow_mut().pop().unwrap();
        reply.send(Err(HostError("too late".to_owned())));

        assert_eq!(*responses.borrow(), [Ok(Outcome::Invoice(PaymentStatus::Paid))]);
    }

    #[test]
    fn error_first_callback_is_delivered() {
        let (mut host, _sink) = mock_host(Version::new(7, 0));
        host.expect_submit().times(1).returning(|_request, reply| {
            reply.send(Err(HostError("STORAGE_KEY_CLOUD_QUOTA_EXCEEDED".to_owned())));
        });
        let facade = Facade::new(host);

        let response = Rc::new(RefCell::new(None));
        facade
            .submit(
                facade.next_token(),
                Request::CloudStorage(CloudStorageRequest::GetKeys),
                Completion::callback({
                    let response = Rc::clone(&response);
                    move |received| *response.borrow_mut() = Some(received)
                }),
            )
            .unwrap();

        assert_eq!(
            *response.borrow(),
            Some(Err(HostError("STORAGE_KEY_CLOUD_QUOTA_EXCEEDED".to_owned())))
        );
    }

    #[test]
    fn duplicate_token_never_reaches_host() {
        let (mut host, _sink) = mock_host(Version::new(7, 0));
        host.expect_submit().times(1).return_const(());
        let facade = Facade::new(host);

        facade
            .submit(
                RequestToken(5),
                Request::ShowPopup(PopupParams::new("first")),
                Completion::Detached,
            )
            .unwrap();
        assert_eq!(
            facade
                .submit(
                    RequestToken(5),
                    Request::ShowPopup(PopupParams::new("second")),
                    Completion::Detached,
                )
                .unwrap_err(),
            Error::DuplicateToken(RequestToken(5))
        );
    }

    #[test]
    fn event_without_handler_is_dropped_silently() {
        let (host, sink) = mock_host(Version::new(7, 0));
        let facade = Facade::new(host);

        emit(&sink, Event::SettingsButtonClicked);

        assert_eq!(facade.handler_count(EventKind::SettingsButtonClicked), 0);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let (host, sink) = mock_host(Version::new(7, 0));
        let facade = Facade::new(host);
        let calls = Rc::new(Cell::new(0_u32));

        let handler = Rc::new(RefCell::new(None::<Handler>));
        let registered = Handler::new({
            let facade = Rc::downgrade(&facade);
            let handler = Rc::clone(&handler);
            let calls = Rc::clone(&calls);
            move |_event| {
                calls.set(calls.get() + 1);
                if let (Some(facade), Some(handler)) = (facade.upgrade(), handler.borrow().as_ref()) {
                    facade.off_event(EventKind::MainButtonClicked, handler);
                }
            }
        });
        *handler.borrow_mut() = Some(registered.clone());
        facade.on_event(EventKind::MainButtonClicked, registered);

        emit(&sink, Event::MainButtonClicked);
        emit(&sink, Event::MainButtonClicked);

        assert_eq!(calls.get(), 1);
        assert_eq!(facade.handler_count(EventKind::MainButtonClicked), 0);
    }

    #[test]
    fn events_after_facade_drop_are_discarded() {
        let (host, sink) = mock_host(Version::new(7, 0));
        let facade = Facade::new(host);
        let stored = sink.borrow().clone().unwrap();
        drop(facade);

        assert!(!stored.is_attached());
        stored.emit(Event::ThemeChanged);
    }

    #[test]
    fn tokens_are_unique() {
        let (host, _sink) = mock_host(Version::new(7, 0));
        let facade = Facade::new(host);

        let first = facade.next_token();
        let second = facade.next_token();
        assert_ne!(first, second);
    }
}
