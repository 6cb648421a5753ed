//! Credential store contract and the in-memory implementation.
//!
//! The store owns the three session credentials exclusively; nothing above
//! the session layer reads tokens directly. Writes used by authorization
//! decisions are critical sections: a read that races a clear must see the
//! fully-old or fully-new record, never a half-cleared one. The contract
//! exposes atomic `snapshot`/`set_tokens`/`clear_all` operations instead of
//! leaving callers to compose them.

use std::sync::Mutex;
use std::time::Duration;

use balcao_core::TenantId;

use crate::error::SessionError;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// The three credentials a browser session carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Short-lived bearer token for the backend.
    AuthToken,
    /// Long-lived token exchanged for a fresh auth token.
    RefreshToken,
    /// Active tenant identifier (the `client_id` cookie).
    TenantId,
}

impl CredentialKind {
    /// Cookie name on the wire.
    pub fn cookie_name(&self) -> &'static str {
        match self {
            CredentialKind::AuthToken => "auth_token",
            CredentialKind::RefreshToken => "refresh_token",
            CredentialKind::TenantId => "client_id",
        }
    }

    /// Persistence lifetime. Auth tokens are deliberately shorter-lived than
    /// the refresh token and tenant mirror.
    pub fn ttl(&self) -> Duration {
        match self {
            CredentialKind::AuthToken => 7 * DAY,
            CredentialKind::RefreshToken | CredentialKind::TenantId => 30 * DAY,
        }
    }
}

/// Atomic view of the stored credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub auth_token: Option<String>,
    pub refresh_token: Option<String>,
    pub tenant_id: Option<TenantId>,
}

impl Credentials {
    /// Presence check used by the route gate: both the auth token and the
    /// tenant mirror must exist before a request is worth resolving.
    pub fn present(&self) -> bool {
        self.auth_token.is_some() && self.tenant_id.is_some()
    }
}

/// Persistence of session credentials.
///
/// Implementations must make every method atomic with respect to each other:
/// concurrent readers never observe a partially-applied write or clear.
pub trait CredentialStore: Send + Sync {
    fn set(&self, kind: CredentialKind, value: &str) -> Result<(), SessionError>;

    fn get(&self, kind: CredentialKind) -> Result<Option<String>, SessionError>;

    fn clear(&self, kind: CredentialKind) -> Result<(), SessionError>;

    /// Clear all three credentials together. Partial clears are not a valid
    /// terminal state, so this is a single atomic operation.
    fn clear_all(&self) -> Result<(), SessionError>;

    /// Atomic read of the whole record.
    fn snapshot(&self) -> Result<Credentials, SessionError>;

    /// Replace the token pair in one step. `refresh` of `None` leaves the
    /// stored refresh token untouched (tenant switches may rotate only the
    /// auth token).
    fn set_tokens(&self, auth: &str, refresh: Option<&str>) -> Result<(), SessionError>;

    /// Clear everything iff the stored auth token is still `expected`.
    ///
    /// Returns whether this call performed the clear. Concurrent cleanups of
    /// the same rejected token collapse to exactly one effective clear.
    fn clear_all_if_token(&self, expected: &str) -> Result<bool, SessionError>;
}

/// In-memory credential store (tests, and any non-cookie frontend).
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    record: Mutex<Credentials>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_record<T>(
        &self,
        f: impl FnOnce(&mut Credentials) -> T,
    ) -> Result<T, SessionError> {
        let mut record = self
            .record
            .lock()
            .map_err(|_| SessionError::storage("credential store lock poisoned"))?;
        Ok(f(&mut record))
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn set(&self, kind: CredentialKind, value: &str) -> Result<(), SessionError> {
        self.with_record(|record| match kind {
            CredentialKind::AuthToken => record.auth_token = Some(value.to_string()),
            CredentialKind::RefreshToken => record.refresh_token = Some(value.to_string()),
            CredentialKind::TenantId => record.tenant_id = Some(TenantId::new(value)),
        })
    }

    fn get(&self, kind: CredentialKind) -> Result<Option<String>, SessionError> {
        self.with_record(|record| match kind {
            CredentialKind::AuthToken => record.auth_token.clone(),
            CredentialKind::RefreshToken => record.refresh_token.clone(),
            CredentialKind::TenantId => record.tenant_id.as_ref().map(|t| t.as_str().to_string()),
        })
    }

    fn clear(&self, kind: CredentialKind) -> Result<(), SessionError> {
        self.with_record(|record| match kind {
            CredentialKind::AuthToken => record.auth_token = None,
            CredentialKind::RefreshToken => record.refresh_token = None,
            CredentialKind::TenantId => record.tenant_id = None,
        })
    }

    fn clear_all(&self) -> Result<(), SessionError> {
        self.with_record(|record| *record = Credentials::default())
    }

    fn snapshot(&self) -> Result<Credentials, SessionError> {
        self.with_record(|record| record.clone())
    }

    fn set_tokens(&self, auth: &str, refresh: Option<&str>) -> Result<(), SessionError> {
        self.with_record(|record| {
            record.auth_token = Some(auth.to_string());
            if let Some(refresh) = refresh {
                record.refresh_token = Some(refresh.to_string());
            }
        })
    }

    fn clear_all_if_token(&self, expected: &str) -> Result<bool, SessionError> {
        self.with_record(|record| {
            if record.auth_token.as_deref() == Some(expected) {
                *record = Credentials::default();
                true
            } else {
                false
            }
        })
    }
}
