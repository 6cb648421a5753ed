//! Per-browser-session state held by the gateway process.
//!
//! The registry carries only derived state (tenant context, refresh
//! single-flight); credentials themselves always live in cookies. Losing an
//! entry (process restart) therefore costs nothing but a tenant-context
//! restore on the next request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use balcao_session::cookie::parse_cookie;
use balcao_session::{MemoryTenantStore, RefreshCoordinator, SessionError, TenantContext};

/// Session-continuity cookie. Not a credential: it only keys derived state.
pub const SID_COOKIE: &str = "sid";

/// Per-session derived state.
pub struct SessionState {
    pub tenant: TenantContext,
    pub refresh: RefreshCoordinator,
}

impl SessionState {
    fn new() -> Self {
        Self {
            tenant: TenantContext::new(Arc::new(MemoryTenantStore::new())),
            refresh: RefreshCoordinator::new(),
        }
    }
}

/// Registry of live sessions, keyed by the `sid` cookie.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, Arc<SessionState>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the session for a request.
    ///
    /// Returns the session state plus, for first-time visitors, the
    /// `Set-Cookie` value that pins the new session id to the browser.
    pub fn attach(
        &self,
        headers: &HeaderMap,
        secure: bool,
    ) -> Result<(Arc<SessionState>, Option<String>), SessionError> {
        let existing = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| parse_cookie(cookies, SID_COOKIE));

        let mut sessions = self
            .inner
            .lock()
            .map_err(|_| SessionError::storage("session registry lock poisoned"))?;

        match existing {
            Some(sid) => {
                // An unknown sid (e.g. after a restart) is re-seeded in place
                // so the browser keeps its id.
                let state = sessions
                    .entry(sid)
                    .or_insert_with(|| Arc::new(SessionState::new()))
                    .clone();
                Ok((state, None))
            }
            None => {
                let sid = Uuid::now_v7().to_string();
                let state = Arc::new(SessionState::new());
                sessions.insert(sid.clone(), state.clone());
                Ok((state, Some(sid_cookie(&sid, secure))))
            }
        }
    }

    /// Drop a session's derived state (logout).
    pub fn discard(&self, headers: &HeaderMap) -> Result<(), SessionError> {
        let Some(sid) = headers
            .get(header::COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|cookies| parse_cookie(cookies, SID_COOKIE))
        else {
            return Ok(());
        };
        self.inner
            .lock()
            .map_err(|_| SessionError::storage("session registry lock poisoned"))?
            .remove(&sid);
        Ok(())
    }
}

fn sid_cookie(sid: &str, secure: bool) -> String {
    // Browser-session lifetime: no Max-Age on purpose.
    let mut cookie = format!("{SID_COOKIE}={sid}; Path=/; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}
