//! Common items of components.

use std::rc::Rc;

use leptos::{view, CollectView as _, ErrorBoundary, IntoView, SignalGet as _};
use miniapp_facade::{
    data_model::{HostError, Outcome},
    js::JsHost,
    Facade,
};

/// Facade shared between components.
pub type SharedWebApp = Rc<Facade<JsHost>>;

/// Error shown to the user.
#[derive(Debug, Clone, thiserror::Error, displaydoc::Display)]
pub enum Error {
    /// {0}
    Facade(#[from] miniapp_facade::Error),
    /// {0}
    Host(#[from] HostError),
    /// Unexpected host response: {0}
    UnexpectedOutcome(String),
}

impl From<Outcome> for Error {
    fn from(outcome: Outcome) -> Self {
        Self::UnexpectedOutcome(format!("{outcome:?}"))
    }
}

/// Result with [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Render `result` showing all errors in a separate block.
pub fn with_errors<T>(result: impl Fn() -> Result<T> + 'static) -> impl IntoView
where
    T: IntoView + 'static,
{
    view! {
        <ErrorBoundary fallback=|errors| view! {
            <div class = "error">
                { move || {
                    errors.get()
                    .into_iter()
                    .map(|(_, e)| view! { <p>{e.to_string()}</p>})
                    .collect_view()
                }}
            </div>
        }>
            { result }
        </ErrorBoundary>
    }
}
