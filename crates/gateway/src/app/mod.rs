//! HTTP application wiring (axum router + state).
//!
//! Layout:
//! - `routes/`: HTTP handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: the action boundary; session errors become structured
//!   `{success: false, message}` results, never raw internals

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};

use balcao_session::{CookieCredentialStore, HttpBackend, IdentityBackend};

use crate::config::GatewayConfig;
use crate::gate;
use crate::sessions::SessionRegistry;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared application state.
pub struct AppState {
    pub config: GatewayConfig,
    pub backend: Arc<dyn IdentityBackend>,
    pub sessions: SessionRegistry,
}

/// Build the full router against the configured HTTP backend (public
/// entrypoint used by `main.rs`).
pub fn build_app(config: GatewayConfig) -> anyhow::Result<Router> {
    let backend = Arc::new(HttpBackend::new(
        config.api_url.as_str(),
        config.backend_timeout,
    )?);
    Ok(build_app_with_backend(config, backend))
}

/// Build the router with an explicit backend (tests inject fakes here).
pub fn build_app_with_backend(
    config: GatewayConfig,
    backend: Arc<dyn IdentityBackend>,
) -> Router {
    let state = Arc::new(AppState {
        config,
        backend,
        sessions: SessionRegistry::new(),
    });

    Router::new()
        .route("/", get(routes::system::home))
        .route("/health", get(routes::system::health))
        .route(
            "/login",
            get(routes::auth::login_view).post(routes::auth::login),
        )
        .route("/logout", post(routes::auth::logout))
        .route("/admin", get(routes::dashboard::admin_root))
        .route("/dashboard", get(routes::dashboard::dashboard_view))
        .route("/dashboard/switch-tenant", post(routes::tenant::switch_tenant))
        .route("/dashboard/exit-tenant", post(routes::tenant::exit_tenant))
        // A catch-all directly under /dashboard would collide with the action
        // routes above; the vertical segment is a named parameter instead.
        .route("/dashboard/:vertical", get(routes::dashboard::dashboard_view))
        .route(
            "/dashboard/:vertical/*rest",
            get(routes::dashboard::dashboard_view),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            gate::gate_middleware,
        ))
        .with_state(state)
}

/// Per-request cookie-backed credential store, seeded from the request.
pub(crate) fn credential_store(
    headers: &HeaderMap,
    config: &GatewayConfig,
) -> CookieCredentialStore {
    CookieCredentialStore::from_cookie_header(
        headers.get(header::COOKIE).and_then(|v| v.to_str().ok()),
        config.secure_cookies,
    )
}

/// Attach the store's pending cookie mutations (and optionally a fresh `sid`
/// cookie) to the response.
pub(crate) fn respond_with_cookies(
    resp: impl IntoResponse,
    store: &CookieCredentialStore,
    sid_cookie: Option<String>,
) -> Response {
    let mut response = resp.into_response();
    let cookies = match store.set_cookie_values() {
        Ok(cookies) => cookies,
        Err(err) => return errors::session_error_response(&err),
    };
    for cookie in cookies.into_iter().chain(sid_cookie) {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => {
                tracing::error!("set-cookie value is not a valid header value");
                return errors::internal_error_response();
            }
        }
    }
    response
}
