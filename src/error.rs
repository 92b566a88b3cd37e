//! Error taxonomy shared by the store and the query engine.
//!
//! The HTTP layer maps these onto status codes; the variants themselves
//! carry the user-visible message so no operation fails silently.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A required field was missing or a supplied value failed to parse.
    #[error("{0}")]
    InvalidArgument(String),
    /// The given user identity does not resolve.
    #[error("{0}")]
    NotFound(String),
    /// Storage failure unrelated to the request itself. The message shown
    /// to callers is generic; the cause is kept for logging at the boundary.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// `NotFound` for an unresolvable user id.
    pub fn unknown_user(user_id: &str) -> Self {
        Error::NotFound(format!("User '{user_id}' Not Found"))
    }
}
