//! Session error taxonomy.
//!
//! Each variant maps to one recovery strategy at the boundary:
//! `Unauthenticated` redirects to login, `Transient` may be retried,
//! `RefreshFailed`/`NoRefreshToken` end the session, `StorageUnavailable`
//! is treated conservatively as unauthenticated, `Malformed` is a contract
//! break with the backend, and `Rejected` carries a user-facing message.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No credentials, or the backend no longer accepts them.
    #[error("not authenticated")]
    Unauthenticated,

    /// Network failure, timeout, or backend 5xx. Credentials are untouched;
    /// the specific operation may be retried.
    #[error("transient backend failure: {0}")]
    Transient(String),

    /// A refresh attempt failed. The credential store has been cleared and a
    /// fresh login is required.
    #[error("token refresh failed")]
    RefreshFailed,

    /// A refresh was requested but no refresh token is stored.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// Cookie/local persistence failed; session state is indeterminate.
    #[error("credential storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The backend answered with a shape the contract does not allow.
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// The backend rejected the operation; the message is user-facing.
    #[error("{0}")]
    Rejected(String),
}

impl SessionError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Whether the current session cannot continue and a fresh login is the
    /// only way forward.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            SessionError::Unauthenticated
                | SessionError::RefreshFailed
                | SessionError::NoRefreshToken
        )
    }
}
