//! Module with [`PendingRequests`] correlating responses with the requests they answer.

use std::{
    collections::VecDeque,
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use miniapp_data_model::{Event, HostState, Request, Response};
use tokio::sync::oneshot;

use crate::{Error, Result};

/// Correlation token of a request, generated by the caller.
///
/// Any value works as long as it's not used by another pending request.
/// [`Facade::next_token()`](crate::Facade::next_token) generates unique ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RequestToken {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// What to do with the response once the request is resolved.
pub enum Completion {
    /// Call a function.
    Callback(Box<dyn FnOnce(Response)>),
    /// Send to a channel, see [`ResponseFuture`].
    Channel(oneshot::Sender<Response>),
    /// Nothing. The outcome is observable only through events.
    Detached,
}

impl Completion {
    /// Construct [`Completion::Callback`].
    pub fn callback(callback: impl FnOnce(Response) + 'static) -> Self {
        Self::Callback(Box::new(callback))
    }

    /// Deliver `response`.
    pub(crate) fn complete(self, response: Response) {
        match self {
            Self::Callback(callback) => callback(response),
            Self::Channel(sender) => {
                // Receiver is dropped if the caller lost interest
                let _ignored = sender.send(response);
            }
            Self::Detached => {}
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Callback(_) => "Callback",
            Self::Channel(_) => "Channel",
            Self::Detached => "Detached",
        })
    }
}

/// Future resolving with the response to a request.
///
/// Fails with [`Error::Abandoned`] if the request was
/// [abandoned](crate::WebApp::abandon) or the facade was dropped.
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct ResponseFuture {
    /// Token of the awaited request.
    token: RequestToken,
    /// Receiving end of [`Completion::Channel`].
    receiver: oneshot::Receiver<Response>,
}

impl ResponseFuture {
    /// Construct new [`ResponseFuture`] together with the completion feeding it.
    pub(crate) fn channel(token: RequestToken) -> (Self, Completion) {
        let (sender, receiver) = oneshot::channel();
        (Self { token, receiver }, Completion::Channel(sender))
    }

    /// Token of the awaited request.
    pub const fn token(&self) -> RequestToken {
        self.token
    }
}

impl Future for ResponseFuture {
    type Output = Result<Response>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let token = this.token;
        Pin::new(&mut this.receiver)
            .poll(cx)
            .map(|received| received.map_err(|_closed| Error::Abandoned(token)))
    }
}

/// Request waiting for its response.
#[derive(Debug)]
struct Pending {
    /// Correlation token.
    token: RequestToken,
    /// Original request, needed to recognize resolving events.
    request: Request,
    /// Response handling.
    completion: Completion,
}

/// Requests waiting for their responses, in submission order.
///
/// Every request is resolved at most once: the first of callback response or matching event
/// removes it, the other one finds nothing.
#[derive(Debug, Default)]
pub(crate) struct PendingRequests {
    /// Pending requests, oldest first.
    entries: VecDeque<Pending>,
}

impl PendingRequests {
    /// Register new pending request.
    ///
    /// # Errors
    ///
    /// Fails if `token` is already used by another pending request.
    pub fn insert(
        &mut self,
        token: RequestToken,
        request: Request,
        completion: Completion,
    ) -> Result<()> {
        if self.contains(token) {
            return Err(Error::DuplicateToken(token));
        }
        self.entries.push_back(Pending {
            token,
            request,
            completion,
        });
        Ok(())
    }

    /// Whether request `token` is pending.
    pub fn contains(&self, token: RequestToken) -> bool {
        self.entries.iter().any(|pending| pending.token == token)
    }

    /// Number of pending requests.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Remove request `token` returning its completion.
    pub fn take(&mut self, token: RequestToken) -> Option<Completion> {
        let index = self
            .entries
            .iter()
            .position(|pending| pending.token == token)?;
        self.entries
            .remove(index)
            .map(|pending| pending.completion)
    }

    /// Remove the oldest request resolved by `event`.
    ///
    /// Returns its token, completion and the response derived from `event`.
    pub fn take_resolved_by(
        &mut self,
        event: &Event,
        state: &dyn Fn() -> HostState,
    ) -> Option<(RequestToken, Completion, Response)> {
        let (index, response) = self
            .entries
            .iter()
            .enumerate()
            .find_map(|(index, pending)| {
                pending
                    .request
                    .resolve_by(event, state)
                    .map(|response| (index, response))
            })?;
        self.entries
            .remove(index)
            .map(|pending| (pending.token, pending.completion, response))
    }
}
