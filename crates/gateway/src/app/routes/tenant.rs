//! Tenant switch / exit actions.

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use tracing::info;

use balcao_core::{TenantId, TenantKind};

use crate::app::dto::{ActionResult, SwitchTenantRequest};
use crate::app::{credential_store, errors, respond_with_cookies, AppState};
use crate::gate::ADMIN_ROOT;

/// `POST /dashboard/switch-tenant`.
pub async fn switch_tenant(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SwitchTenantRequest>,
) -> Response {
    let Ok(kind) = TenantKind::from_str(&req.tenant_type) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ActionResult::fail_field("tenant_type", "Tipo de negócio inválido")),
        )
            .into_response();
    };
    let Ok(client_id) = TenantId::from_str(&req.client_id) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ActionResult::fail_field("client_id", "Cliente inválido")),
        )
            .into_response();
    };

    let cookies = credential_store(&headers, &state.config);
    let (session, sid_cookie) = match state.sessions.attach(&headers, state.config.secure_cookies)
    {
        Ok(attached) => attached,
        Err(err) => return errors::session_error_response(&err),
    };

    match session
        .tenant
        .switch_tenant(state.backend.as_ref(), &cookies, kind, &client_id)
        .await
    {
        Ok(active) => respond_with_cookies(
            Json(json!({
                "success": true,
                "tenant": { "kind": active.kind, "client": active.client },
            })),
            &cookies,
            sid_cookie,
        ),
        Err(err) => respond_with_cookies(errors::session_error_response(&err), &cookies, sid_cookie),
    }
}

/// `POST /dashboard/exit-tenant`: clear the context and land on the
/// administrative root.
pub async fn exit_tenant(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let cookies = credential_store(&headers, &state.config);
    let (session, sid_cookie) = match state.sessions.attach(&headers, state.config.secure_cookies)
    {
        Ok(attached) => attached,
        Err(err) => return errors::session_error_response(&err),
    };

    match session.tenant.exit_tenant_mode().await {
        Ok(()) => {
            info!("tenant mode exited");
            respond_with_cookies(Redirect::to(ADMIN_ROOT), &cookies, sid_cookie)
        }
        Err(err) => respond_with_cookies(errors::session_error_response(&err), &cookies, sid_cookie),
    }
}
