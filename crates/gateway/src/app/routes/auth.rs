//! Login/logout actions.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use tracing::{info, warn};

use balcao_auth::LoginCredentials;
use balcao_session::{
    CookieCredentialStore, CredentialKind, CredentialStore, LoginGrant, SessionError,
};

use crate::app::dto::ActionResult;
use crate::app::{credential_store, errors, respond_with_cookies, AppState};

/// Login view stub. The gate already bounced credentialed sessions to the
/// dashboard before this renders.
pub async fn login_view() -> impl IntoResponse {
    Html("<!doctype html><title>Entrar</title><h1>Entrar</h1>")
}

/// `POST /login`: validate, call the backend, persist the grant.
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<LoginCredentials>,
) -> Response {
    let credentials = match payload.validated() {
        Ok(credentials) => credentials,
        Err(err) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ActionResult::fail_field(err.field(), err.to_string())),
            )
                .into_response();
        }
    };

    let cookies = credential_store(&headers, &state.config);
    match state
        .backend
        .login(&credentials.email, &credentials.password)
        .await
    {
        Ok(grant) => {
            if let Err(err) = store_grant(&cookies, &grant) {
                return errors::session_error_response(&err);
            }
            // A fresh login must not inherit derived state from whoever used
            // this browser session before.
            if let Err(err) = state.sessions.discard(&headers) {
                return errors::session_error_response(&err);
            }
            info!(user = %grant.user.id, tenant = %grant.client_id, "login succeeded");
            respond_with_cookies(Json(ActionResult::ok()), &cookies, None)
        }
        Err(SessionError::Unauthenticated) => (
            StatusCode::UNAUTHORIZED,
            Json(ActionResult::fail(errors::MSG_INVALID_CREDENTIALS)),
        )
            .into_response(),
        Err(err) => errors::session_error_response(&err),
    }
}

/// A grant always carries both the token and the tenant id (the decoder
/// rejects anything else), so the cookies are written together.
fn store_grant(cookies: &CookieCredentialStore, grant: &LoginGrant) -> Result<(), SessionError> {
    cookies.set_tokens(&grant.token, grant.refresh_token.as_deref())?;
    cookies.set(CredentialKind::TenantId, grant.client_id.as_str())
}

/// `POST /logout`: best-effort backend call, then clear everything locally.
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cookies = credential_store(&headers, &state.config);

    let token = match cookies.get(CredentialKind::AuthToken) {
        Ok(token) => token,
        Err(err) => return errors::session_error_response(&err),
    };
    if let Some(token) = token {
        // Failures here never block the local clearing below.
        if let Err(err) = state.backend.logout(&token).await {
            warn!(error = %err, "backend logout failed");
        }
    }

    if let Err(err) = cookies.clear_all() {
        return errors::session_error_response(&err);
    }
    if let Err(err) = state.sessions.discard(&headers) {
        return errors::session_error_response(&err);
    }

    info!("session logged out");
    respond_with_cookies(Json(ActionResult::ok()), &cookies, None)
}
