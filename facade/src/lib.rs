//! Typed facade over the `Telegram.WebApp` object injected into a Mini App page by the host.
//!
//! The host owns every behavior. This crate only forwards [`Command`]s and [`Request`]s to it,
//! routes the [`Event`]s it emits to registered handlers and correlates asynchronous responses
//! with the requests they answer.
//!
//! Everything is single-threaded: the host runs callbacks on the page's event loop,
//! so [`Facade`] is neither [`Send`] nor [`Sync`].
//!
//! [`Command`]: miniapp_data_model::Command
//! [`Request`]: miniapp_data_model::Request
//! [`Event`]: miniapp_data_model::Event

pub use miniapp_data_model as data_model;
use miniapp_data_model::{ValidationError, Version};

pub mod controls;
pub mod facade;
pub mod host;
#[cfg(feature = "js")]
pub mod js;
mod pending;
mod registry;
pub mod simulated;
pub mod web_app;

pub use facade::Facade;
pub use host::{EventSink, Host, Reply};
pub use pending::{Completion, RequestToken, ResponseFuture};
pub use registry::{Handler, Subscription};
pub use web_app::WebApp;

/// Error returned by the facade before anything reaches the host.
///
/// Failures of the host itself are never reported here: they arrive as
/// [`HostError`](miniapp_data_model::HostError) in a response or not at all.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
pub enum Error {
    /// `{method}` requires host version {required}, but the host supports only {actual}
    Unsupported {
        /// Host method name.
        method: &'static str,
        /// Minimal version supporting the method.
        required: Version,
        /// Version reported by the host.
        actual: Version,
    },
    /// Invalid input: {0}
    Validation(#[from] ValidationError),
    /// Request {0} is already pending
    DuplicateToken(RequestToken),
    /// Request {0} was abandoned before the host responded
    Abandoned(RequestToken),
    /// Host object is not available: {0}
    HostUnavailable(String),
}

/// Result of facade operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;
