//! Cookie-backed credential store.
//!
//! One instance lives per request: it is seeded from the incoming `Cookie`
//! header, mutated by the session layer while the request is handled, and
//! drained into `Set-Cookie` headers when the response is built. Credentials
//! are HttpOnly and `SameSite=Lax`; the `Secure` attribute follows the
//! production flag.

use std::sync::Mutex;

use chrono::{Duration as ChronoDuration, Utc};

use balcao_core::TenantId;

use crate::credentials::{CredentialKind, CredentialStore, Credentials};
use crate::error::SessionError;

const KINDS: [CredentialKind; 3] = [
    CredentialKind::AuthToken,
    CredentialKind::RefreshToken,
    CredentialKind::TenantId,
];

#[derive(Debug, Default)]
struct CookieState {
    values: Credentials,
    /// Pending response mutations per cookie: `Some` sets, `None` expires.
    dirty: Vec<(CredentialKind, Option<String>)>,
}

/// Per-request credential store over the browser's cookie jar.
#[derive(Debug, Default)]
pub struct CookieCredentialStore {
    state: Mutex<CookieState>,
    secure: bool,
}

impl CookieCredentialStore {
    /// Seed the store from a raw `Cookie` request header.
    ///
    /// Only the three credential cookies are retained; everything else in
    /// the header is ignored.
    pub fn from_cookie_header(header: Option<&str>, secure: bool) -> Self {
        let mut values = Credentials::default();
        if let Some(header) = header {
            for kind in KINDS {
                if let Some(value) = parse_cookie(header, kind.cookie_name()) {
                    match kind {
                        CredentialKind::AuthToken => values.auth_token = Some(value),
                        CredentialKind::RefreshToken => values.refresh_token = Some(value),
                        CredentialKind::TenantId => values.tenant_id = Some(TenantId::new(value)),
                    }
                }
            }
        }

        Self {
            state: Mutex::new(CookieState {
                values,
                dirty: Vec::new(),
            }),
            secure,
        }
    }

    /// Drain the pending mutations as `Set-Cookie` header values.
    pub fn set_cookie_values(&self) -> Result<Vec<String>, SessionError> {
        let mut state = self.lock()?;
        let dirty = std::mem::take(&mut state.dirty);
        Ok(dirty
            .into_iter()
            .map(|(kind, value)| match value {
                Some(value) => set_cookie(kind, &value, self.secure),
                None => expire_cookie(kind, self.secure),
            })
            .collect())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CookieState>, SessionError> {
        self.state
            .lock()
            .map_err(|_| SessionError::storage("cookie store lock poisoned"))
    }

    fn record_set(state: &mut CookieState, kind: CredentialKind, value: &str) {
        match kind {
            CredentialKind::AuthToken => state.values.auth_token = Some(value.to_string()),
            CredentialKind::RefreshToken => state.values.refresh_token = Some(value.to_string()),
            CredentialKind::TenantId => state.values.tenant_id = Some(TenantId::new(value)),
        }
        state.dirty.retain(|(k, _)| *k != kind);
        state.dirty.push((kind, Some(value.to_string())));
    }

    fn record_clear(state: &mut CookieState, kind: CredentialKind) {
        match kind {
            CredentialKind::AuthToken => state.values.auth_token = None,
            CredentialKind::RefreshToken => state.values.refresh_token = None,
            CredentialKind::TenantId => state.values.tenant_id = None,
        }
        state.dirty.retain(|(k, _)| *k != kind);
        state.dirty.push((kind, None));
    }
}

impl CredentialStore for CookieCredentialStore {
    fn set(&self, kind: CredentialKind, value: &str) -> Result<(), SessionError> {
        let mut state = self.lock()?;
        Self::record_set(&mut state, kind, value);
        Ok(())
    }

    fn get(&self, kind: CredentialKind) -> Result<Option<String>, SessionError> {
        let state = self.lock()?;
        Ok(match kind {
            CredentialKind::AuthToken => state.values.auth_token.clone(),
            CredentialKind::RefreshToken => state.values.refresh_token.clone(),
            CredentialKind::TenantId => state
                .values
                .tenant_id
                .as_ref()
                .map(|t| t.as_str().to_string()),
        })
    }

    fn clear(&self, kind: CredentialKind) -> Result<(), SessionError> {
        let mut state = self.lock()?;
        Self::record_clear(&mut state, kind);
        Ok(())
    }

    fn clear_all(&self) -> Result<(), SessionError> {
        let mut state = self.lock()?;
        for kind in KINDS {
            Self::record_clear(&mut state, kind);
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<Credentials, SessionError> {
        Ok(self.lock()?.values.clone())
    }

    fn set_tokens(&self, auth: &str, refresh: Option<&str>) -> Result<(), SessionError> {
        let mut state = self.lock()?;
        Self::record_set(&mut state, CredentialKind::AuthToken, auth);
        if let Some(refresh) = refresh {
            Self::record_set(&mut state, CredentialKind::RefreshToken, refresh);
        }
        Ok(())
    }

    fn clear_all_if_token(&self, expected: &str) -> Result<bool, SessionError> {
        let mut state = self.lock()?;
        if state.values.auth_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        for kind in KINDS {
            Self::record_clear(&mut state, kind);
        }
        Ok(true)
    }
}

/// Extract one cookie value from a raw `Cookie` header.
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
    for part in header.split(';') {
        let part = part.trim();
        if let Some((k, v)) = part.split_once('=') {
            if k.trim() == name && !v.is_empty() {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}

fn set_cookie(kind: CredentialKind, value: &str, secure: bool) -> String {
    let ttl = kind.ttl();
    let expires = (Utc::now() + ChronoDuration::seconds(ttl.as_secs() as i64))
        .format("%a, %d %b %Y %H:%M:%S GMT");
    let mut cookie = format!(
        "{}={}; Max-Age={}; Expires={}; Path=/; HttpOnly; SameSite=Lax",
        kind.cookie_name(),
        value,
        ttl.as_secs(),
        expires,
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn expire_cookie(kind: CredentialKind, secure: bool) -> String {
    let mut cookie = format!(
        "{}=; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Path=/; HttpOnly; SameSite=Lax",
        kind.cookie_name(),
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_from_cookie_header() {
        let store = CookieCredentialStore::from_cookie_header(
            Some("auth_token=T1; client_id=C1; theme=dark"),
            false,
        );

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.auth_token.as_deref(), Some("T1"));
        assert_eq!(snapshot.tenant_id, Some(TenantId::new("C1")));
        assert_eq!(snapshot.refresh_token, None);
    }

    #[test]
    fn missing_header_means_no_credentials() {
        let store = CookieCredentialStore::from_cookie_header(None, false);
        assert_eq!(store.snapshot().unwrap(), Credentials::default());
    }

    #[test]
    fn set_emits_cookie_with_ttl_and_attributes() {
        let store = CookieCredentialStore::from_cookie_header(None, false);
        store.set(CredentialKind::AuthToken, "T1").unwrap();

        let cookies = store.set_cookie_values().unwrap();
        assert_eq!(cookies.len(), 1);
        let cookie = &cookies[0];
        assert!(cookie.starts_with("auth_token=T1;"), "{cookie}");
        assert!(cookie.contains("Max-Age=604800"), "{cookie}");
        assert!(cookie.contains("HttpOnly"), "{cookie}");
        assert!(cookie.contains("SameSite=Lax"), "{cookie}");
        assert!(!cookie.contains("Secure"), "{cookie}");
    }

    #[test]
    fn secure_flag_follows_configuration() {
        let store = CookieCredentialStore::from_cookie_header(None, true);
        store.set(CredentialKind::RefreshToken, "R1").unwrap();

        let cookies = store.set_cookie_values().unwrap();
        assert!(cookies[0].contains("; Secure"), "{}", cookies[0]);
        assert!(cookies[0].contains("Max-Age=2592000"), "{}", cookies[0]);
    }

    #[test]
    fn clear_all_expires_every_credential_cookie() {
        let store = CookieCredentialStore::from_cookie_header(
            Some("auth_token=T1; refresh_token=R1; client_id=C1"),
            false,
        );
        store.clear_all().unwrap();

        let cookies = store.set_cookie_values().unwrap();
        assert_eq!(cookies.len(), 3);
        for cookie in &cookies {
            assert!(cookie.contains("Max-Age=0"), "{cookie}");
        }
        assert_eq!(store.snapshot().unwrap(), Credentials::default());
    }

    #[test]
    fn later_mutation_of_same_cookie_wins() {
        let store = CookieCredentialStore::from_cookie_header(None, false);
        store.set(CredentialKind::AuthToken, "T1").unwrap();
        store.set(CredentialKind::AuthToken, "T2").unwrap();

        let cookies = store.set_cookie_values().unwrap();
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with("auth_token=T2;"));
    }

    #[test]
    fn drained_mutations_are_not_reemitted() {
        let store = CookieCredentialStore::from_cookie_header(None, false);
        store.set(CredentialKind::AuthToken, "T1").unwrap();

        assert_eq!(store.set_cookie_values().unwrap().len(), 1);
        assert!(store.set_cookie_values().unwrap().is_empty());
        // The in-request view keeps the written value.
        assert_eq!(
            store.get(CredentialKind::AuthToken).unwrap().as_deref(),
            Some("T1")
        );
    }
}
