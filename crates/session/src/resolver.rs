//! Credentials → authenticated principal.

use tracing::{debug, warn};

use balcao_auth::Principal;

use crate::backend::IdentityBackend;
use crate::credentials::CredentialStore;
use crate::error::SessionError;
use crate::refresh::RefreshCoordinator;

/// Resolves the current principal for one request.
///
/// Safe to call repeatedly: with unchanged valid credentials it performs no
/// mutation at all; the only write path is the cleanup after a definitive
/// rejection by the identity endpoint.
pub struct SessionResolver<'a> {
    store: &'a dyn CredentialStore,
    backend: &'a dyn IdentityBackend,
    refresh: &'a RefreshCoordinator,
}

impl<'a> SessionResolver<'a> {
    pub fn new(
        store: &'a dyn CredentialStore,
        backend: &'a dyn IdentityBackend,
        refresh: &'a RefreshCoordinator,
    ) -> Self {
        Self {
            store,
            backend,
            refresh,
        }
    }

    /// Resolve the authenticated principal from the stored credentials.
    ///
    /// - missing auth token or tenant id: `Unauthenticated` without touching
    ///   the network;
    /// - identity endpoint 401: at most one refresh-and-retry, after which a
    ///   still-rejected session is fully cleared (exactly once, even when
    ///   concurrent requests race on the same stale token);
    /// - network/5xx: `Transient`, credentials untouched so a retry can
    ///   succeed.
    pub async fn resolve_current_principal(&self) -> Result<Principal, SessionError> {
        let credentials = self.store.snapshot()?;
        let Some(token) = credentials.auth_token else {
            return Err(SessionError::Unauthenticated);
        };
        if credentials.tenant_id.is_none() {
            return Err(SessionError::Unauthenticated);
        }

        match self.backend.me(&token).await {
            Ok(principal) => Ok(principal),
            Err(SessionError::Unauthenticated) => {
                debug!("auth token rejected; attempting refresh");
                self.refresh_and_retry(&token).await
            }
            Err(other) => Err(other),
        }
    }

    async fn refresh_and_retry(&self, failed_token: &str) -> Result<Principal, SessionError> {
        match self
            .refresh
            .refresh(self.store, self.backend, Some(failed_token))
            .await
        {
            Ok(pair) => match self.backend.me(&pair.token).await {
                Ok(principal) => Ok(principal),
                Err(SessionError::Unauthenticated) => {
                    // The freshly issued token was rejected too; nothing left
                    // to try with this session.
                    warn!("refreshed token rejected by identity endpoint");
                    self.store.clear_all_if_token(&pair.token)?;
                    Err(SessionError::Unauthenticated)
                }
                Err(other) => Err(other),
            },
            Err(SessionError::NoRefreshToken) => {
                // Stale token with no way to renew it must not linger.
                self.store.clear_all_if_token(failed_token)?;
                Err(SessionError::Unauthenticated)
            }
            // The coordinator already cleared the store.
            Err(SessionError::RefreshFailed) => Err(SessionError::Unauthenticated),
            Err(other) => Err(other),
        }
    }
}
