//! Module with Web App components.

mod common;
pub mod confirmation;
pub mod counter;
pub mod note;
pub mod session;

pub use confirmation::Confirmation;
pub use counter::ClickCounter;
pub use note::Note;
pub use session::Session;
