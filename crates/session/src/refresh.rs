//! Single-flight token refresh.
//!
//! Concurrent requests that hit an expired auth token at the same time must
//! not each call the refresh endpoint: a second refresh with the same (now
//! consumed) refresh token would invalidate the pair the first one just
//! obtained. The coordinator serializes attempts per session and lets late
//! arrivals ride on the winner's outcome.

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::backend::{IdentityBackend, TokenPair};
use crate::credentials::CredentialStore;
use crate::error::SessionError;

/// Per-session refresh coordinator.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    in_flight: Mutex<()>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exchange the stored refresh token for a fresh pair.
    ///
    /// `observed_auth` is the auth token the caller saw fail; when another
    /// flight already rotated the pair while we waited for the lock, the
    /// rotated tokens are returned without a second network call.
    ///
    /// - no refresh token stored: `NoRefreshToken`, no network call, store
    ///   untouched;
    /// - endpoint success: auth and refresh tokens replaced together;
    /// - any failure: the store is fully cleared and `RefreshFailed` is
    ///   returned; the caller must force a fresh login. There is no retry.
    pub async fn refresh(
        &self,
        store: &dyn CredentialStore,
        backend: &dyn IdentityBackend,
        observed_auth: Option<&str>,
    ) -> Result<TokenPair, SessionError> {
        let _guard = self.in_flight.lock().await;

        let current = store.snapshot()?;
        if let Some(observed) = observed_auth {
            match current.auth_token.as_deref() {
                // A concurrent flight already rotated the pair.
                Some(token) if token != observed => {
                    debug!("refresh already performed by a concurrent request");
                    return Ok(TokenPair {
                        token: token.to_string(),
                        refresh_token: current.refresh_token.clone(),
                    });
                }
                // A concurrent flight failed and cleared the session.
                None => return Err(SessionError::RefreshFailed),
                _ => {}
            }
        }

        let Some(refresh_token) = current.refresh_token else {
            return Err(SessionError::NoRefreshToken);
        };

        match backend.refresh(&refresh_token).await {
            Ok(pair) => {
                store.set_tokens(&pair.token, pair.refresh_token.as_deref())?;
                debug!("auth token refreshed");
                Ok(pair)
            }
            Err(err) => {
                warn!(error = %err, "token refresh failed; clearing session credentials");
                store.clear_all()?;
                Err(SessionError::RefreshFailed)
            }
        }
    }
}
