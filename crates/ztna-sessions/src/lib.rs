//! # ztna-sessions
//!
//! Session registry. A session is created by the post-login hook once the
//! external identity provider has authenticated a user; at most one session
//! per user is live at any time.

#![warn(clippy::all)]

pub mod errors;
mod service;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use errors::{Result, SessionError};
pub use service::{SessionService, DEFAULT_INDEX_RETENTION_SECONDS};
pub use traits::SessionManager;
pub use types::*;
