//! Route gate: request admission before any page logic runs.
//!
//! The gate is an explicit state machine with a single pure transition
//! function. It is deliberately cheap: it looks at the path and at cookie
//! *presence* only, and never calls the identity endpoint. Full verification
//! belongs to the page-level resolver.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use balcao_auth::{dev_principal, Principal};
use balcao_session::{CookieCredentialStore, CredentialStore};

use crate::app::AppState;

/// Prefix under which every path requires an authenticated session.
pub const PROTECTED_PREFIX: &str = "/dashboard";
/// Login view.
pub const LOGIN_PATH: &str = "/login";
/// Administrative root view (target of exit-tenant-mode).
pub const ADMIN_ROOT: &str = "/admin";

/// Exact-match public allow-list.
const PUBLIC_PATHS: &[&str] = &["/", LOGIN_PATH, "/health", "/sobre", "/planos", "/contato"];
/// Prefix-match public allow-list (static assets).
const PUBLIC_PREFIXES: &[&str] = &["/assets/"];

/// Admission state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Public,
    ProtectedUnresolved,
    ProtectedAuthenticated,
    ProtectedDenied,
}

/// What the edge does with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    PassThrough,
    PassWithDevPrincipal,
    DeferToResolver,
    RedirectToLogin,
    RedirectToDashboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutcome {
    pub state: GateState,
    pub action: GateAction,
}

impl GateOutcome {
    const fn new(state: GateState, action: GateAction) -> Self {
        Self { state, action }
    }
}

/// Single transition function of the gate.
///
/// `credentials_present` is the cookie-presence signal (auth token + tenant
/// mirror both set); `dev_bypass` must already be resolved against the
/// build-time production flag by the caller.
pub fn evaluate(path: &str, credentials_present: bool, dev_bypass: bool) -> GateOutcome {
    // A live session has no business on the login view.
    if path == LOGIN_PATH && credentials_present {
        return GateOutcome::new(GateState::Public, GateAction::RedirectToDashboard);
    }

    if is_public(path) {
        return GateOutcome::new(GateState::Public, GateAction::PassThrough);
    }

    if is_protected(path) {
        return if credentials_present {
            // Cookie presence only; the page resolver owns real verification.
            GateOutcome::new(GateState::ProtectedUnresolved, GateAction::DeferToResolver)
        } else if dev_bypass {
            GateOutcome::new(
                GateState::ProtectedAuthenticated,
                GateAction::PassWithDevPrincipal,
            )
        } else {
            GateOutcome::new(GateState::ProtectedDenied, GateAction::RedirectToLogin)
        };
    }

    // Anything else (marketing long-tail, 404s) is not the gate's concern.
    GateOutcome::new(GateState::Public, GateAction::PassThrough)
}

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

fn is_protected(path: &str) -> bool {
    path == PROTECTED_PREFIX
        || path
            .strip_prefix(PROTECTED_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Gate verdict attached to admitted requests.
#[derive(Debug, Clone)]
pub struct GateContext {
    pub state: GateState,
    /// Present only when the development bypass admitted the request.
    pub dev_principal: Option<Principal>,
}

/// Edge middleware applying [`evaluate`] to every request.
pub async fn gate_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let credentials_present = credentials_present(&req);
    let outcome = evaluate(
        &path,
        credentials_present,
        state.config.auth_bypass_active(),
    );

    match outcome.action {
        GateAction::RedirectToLogin => {
            tracing::debug!(%path, "gate denied unauthenticated request");
            Redirect::to(LOGIN_PATH).into_response()
        }
        GateAction::RedirectToDashboard => Redirect::to(PROTECTED_PREFIX).into_response(),
        GateAction::PassWithDevPrincipal => {
            tracing::warn!(%path, "development bypass admitted request");
            req.extensions_mut().insert(GateContext {
                state: outcome.state,
                dev_principal: Some(dev_principal()),
            });
            next.run(req).await
        }
        GateAction::PassThrough | GateAction::DeferToResolver => {
            req.extensions_mut().insert(GateContext {
                state: outcome.state,
                dev_principal: None,
            });
            next.run(req).await
        }
    }
}

fn credentials_present(req: &Request<Body>) -> bool {
    let header = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok());
    CookieCredentialStore::from_cookie_header(header, false)
        .snapshot()
        .map(|credentials| credentials.present())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn public_paths_pass_unconditionally() {
        for path in ["/", "/health", "/sobre", "/assets/app.css"] {
            let outcome = evaluate(path, false, false);
            assert_eq!(outcome.state, GateState::Public);
            assert_eq!(outcome.action, GateAction::PassThrough);
        }
    }

    #[test]
    fn protected_path_without_credentials_redirects_to_login() {
        let outcome = evaluate("/dashboard/x", false, false);
        assert_eq!(outcome.state, GateState::ProtectedDenied);
        assert_eq!(outcome.action, GateAction::RedirectToLogin);
    }

    #[test]
    fn protected_path_without_credentials_passes_under_bypass() {
        let outcome = evaluate("/dashboard/x", false, true);
        assert_eq!(outcome.state, GateState::ProtectedAuthenticated);
        assert_eq!(outcome.action, GateAction::PassWithDevPrincipal);
    }

    #[test]
    fn protected_path_with_credentials_defers_to_resolver() {
        let outcome = evaluate("/dashboard", true, false);
        assert_eq!(outcome.state, GateState::ProtectedUnresolved);
        assert_eq!(outcome.action, GateAction::DeferToResolver);

        // Bypass is irrelevant once credentials exist.
        let outcome = evaluate("/dashboard/clinica/agenda", true, true);
        assert_eq!(outcome.action, GateAction::DeferToResolver);
    }

    #[test]
    fn login_with_credentials_redirects_to_dashboard() {
        let outcome = evaluate("/login", true, false);
        assert_eq!(outcome.action, GateAction::RedirectToDashboard);

        let outcome = evaluate("/login", false, false);
        assert_eq!(outcome.action, GateAction::PassThrough);
    }

    #[test]
    fn prefix_matching_does_not_leak_to_lookalike_paths() {
        // "/dashboardx" is not under the protected prefix.
        let outcome = evaluate("/dashboardx", false, false);
        assert_eq!(outcome.action, GateAction::PassThrough);
    }

    proptest! {
        /// The dev principal can never be minted unless the bypass is on.
        #[test]
        fn bypass_off_never_mints_dev_principal(
            path in "/[a-z0-9/._-]{0,40}",
            credentials in any::<bool>(),
        ) {
            let outcome = evaluate(&path, credentials, false);
            prop_assert_ne!(outcome.action, GateAction::PassWithDevPrincipal);
        }

        /// Protected paths without credentials never reach a handler when the
        /// bypass is off.
        #[test]
        fn anonymous_protected_requests_are_denied(rest in "[a-z0-9/._-]{0,40}") {
            let path = format!("/dashboard/{rest}");
            let outcome = evaluate(&path, false, false);
            prop_assert_eq!(outcome.state, GateState::ProtectedDenied);
            prop_assert_eq!(outcome.action, GateAction::RedirectToLogin);
        }

        /// With credentials present the gate always defers instead of
        /// resolving identity itself.
        #[test]
        fn credentialed_protected_requests_defer(rest in "[a-z0-9/._-]{0,40}") {
            let path = format!("/dashboard/{rest}");
            let outcome = evaluate(&path, true, false);
            prop_assert_eq!(outcome.state, GateState::ProtectedUnresolved);
            prop_assert_eq!(outcome.action, GateAction::DeferToResolver);
        }

        /// The transition function is a pure function of its inputs.
        #[test]
        fn evaluation_is_deterministic(
            path in "/[a-z0-9/._-]{0,40}",
            credentials in any::<bool>(),
            bypass in any::<bool>(),
        ) {
            prop_assert_eq!(
                evaluate(&path, credentials, bypass),
                evaluate(&path, credentials, bypass)
            );
        }
    }
}
