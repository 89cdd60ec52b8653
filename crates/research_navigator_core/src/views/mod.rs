//! crates/research_navigator_core/src/views/mod.rs
//!
//! Headless page models. Each holds the local state of one screen, calls the
//! ports, and reports the outcome as a notice. Local state is only changed
//! after the remote call succeeded; a failure leaves it as it was.

pub mod auth;
pub mod folders;
pub mod history;
pub mod profile;
pub mod search;

use crate::domain::Notice;
use crate::ports::PortError;

pub use auth::{sign_in, sign_up, SignUpForm, SignedIn};
pub use folders::TaggedFoldersView;
pub use history::SearchHistoryView;
pub use profile::ProfileSettingsView;
pub use search::SearchView;

/// A failed view operation: the notice to show and what caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub notice: Notice,
    pub cause: PortError,
}

impl Failure {
    pub fn new(message: impl Into<String>, cause: PortError) -> Self {
        Self {
            notice: Notice::error(message),
            cause,
        }
    }
}

/// `Ok` carries an optional success notice; quiet loads return `Ok(None)`.
pub type ViewResult = Result<Option<Notice>, Failure>;
