//! Crate with passive descriptors exchanged between a Mini App and the Telegram host
//! which injects `Telegram.WebApp` into the page.
//!
//! Nothing here talks to the host. See `miniapp_facade` for that.

pub mod command;
pub mod control;
pub mod event;
pub mod request;
pub mod session;
pub mod theme;
pub mod version;

pub use command::Command;
pub use control::HostState;
pub use event::{Event, EventKind};
pub use request::{HostError, Outcome, PopupParams, Request, Response};
pub use session::{Chat, InitData, User};
pub use theme::{Color, ColorScheme, ThemeParams};
pub use version::Version;

/// Input rejected before it reaches the host.
///
/// The host performs the same checks and would throw from inside its own code,
/// so they are repeated here to fail early with a typed error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, displaydoc::Display)]
pub enum ValidationError {
    /// Invalid color `{0}`: expected `#RRGGBB` or `#RGB`
    Color(String),
    /// {field} is too long: {len} characters, at most {max} allowed
    TooLong {
        /// Name of the checked field.
        field: &'static str,
        /// Actual length.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },
    /// {0} must not be empty
    Empty(&'static str),
    /// Popup must have from 1 to 3 buttons, got {0}
    ButtonCount(usize),
    /// Invalid cloud storage key `{0}`: expected 1-128 characters of `A-Z`, `a-z`, `0-9`, `_` and `-`
    StorageKey(String),
    /// Invalid version `{0}`: expected dot-separated numbers
    Version(String),
}

/// Check that `value` has at most `max` characters.
pub(crate) fn check_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::TooLong { field, len, max });
    }
    Ok(())
}

/// Check that `value` is non-empty and has at most `max` characters.
pub(crate) fn check_non_empty_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    check_len(field, value, max)
}
