//! Protected views: the tenant dashboard and the administrative root.
//!
//! The gate only checked cookie presence; these handlers own the real
//! identity verification through the session resolver.

use std::sync::Arc;

use axum::extract::{OriginalUri, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Extension, Json};
use serde_json::json;
use tracing::warn;

use balcao_session::SessionResolver;

use crate::app::dto::ActionResult;
use crate::app::{credential_store, errors, respond_with_cookies, AppState};
use crate::gate::{GateContext, LOGIN_PATH};

/// `GET /dashboard` and everything under it.
pub async fn dashboard_view(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    Extension(gate): Extension<GateContext>,
) -> Response {
    if let Some(principal) = gate.dev_principal {
        return Json(json!({ "principal": principal, "tenant": null })).into_response();
    }

    let cookies = credential_store(&headers, &state.config);
    let (session, sid_cookie) = match state.sessions.attach(&headers, state.config.secure_cookies)
    {
        Ok(attached) => attached,
        Err(err) => return errors::session_error_response(&err),
    };

    let resolver = SessionResolver::new(&cookies, state.backend.as_ref(), &session.refresh);
    match resolver.resolve_current_principal().await {
        Ok(principal) => {
            // A failed restore degrades to a dashboard without tenant data;
            // the next navigation retries it.
            let tenant = match session
                .tenant
                .restore(state.backend.as_ref(), &cookies, Some(uri.path()))
                .await
            {
                Ok(active) => active,
                Err(err) => {
                    warn!(error = %err, "tenant context restore failed");
                    None
                }
            };

            let body = Json(json!({
                "principal": principal,
                "tenant": tenant.as_ref().map(|t| json!({
                    "kind": t.kind,
                    "client": t.client,
                })),
            }));
            respond_with_cookies(body, &cookies, sid_cookie)
        }
        Err(err) if err.ends_session() => {
            // The resolver already performed any credential cleanup; the
            // expired cookies travel with the redirect.
            respond_with_cookies(Redirect::to(LOGIN_PATH), &cookies, sid_cookie)
        }
        Err(err) => respond_with_cookies(errors::session_error_response(&err), &cookies, sid_cookie),
    }
}

/// `GET /admin`: administrative root view, for administrative roles only.
pub async fn admin_root(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let cookies = credential_store(&headers, &state.config);
    let (session, sid_cookie) = match state.sessions.attach(&headers, state.config.secure_cookies)
    {
        Ok(attached) => attached,
        Err(err) => return errors::session_error_response(&err),
    };

    let resolver = SessionResolver::new(&cookies, state.backend.as_ref(), &session.refresh);
    match resolver.resolve_current_principal().await {
        Ok(principal) if principal.role.is_administrative() => respond_with_cookies(
            Json(json!({ "view": "admin", "principal": principal })),
            &cookies,
            sid_cookie,
        ),
        Ok(_) => (
            StatusCode::FORBIDDEN,
            Json(ActionResult::fail(errors::MSG_RESTRICTED)),
        )
            .into_response(),
        Err(err) if err.ends_session() => {
            respond_with_cookies(Redirect::to(LOGIN_PATH), &cookies, sid_cookie)
        }
        Err(err) => respond_with_cookies(errors::session_error_response(&err), &cookies, sid_cookie),
    }
}
