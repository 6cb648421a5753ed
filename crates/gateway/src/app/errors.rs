//! The action boundary: session errors → structured user-facing results.
//!
//! Every message below is what the browser sees. Internal detail stays in the
//! logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use balcao_session::SessionError;

use super::dto::ActionResult;

pub const MSG_INTERNAL: &str = "Erro interno do servidor. Tente novamente.";
pub const MSG_SESSION_EXPIRED: &str = "Sessão expirada. Faça login novamente.";
pub const MSG_BACKEND_UNAVAILABLE: &str =
    "Serviço temporariamente indisponível. Tente novamente.";
pub const MSG_INVALID_CREDENTIALS: &str = "E-mail ou senha inválidos";
pub const MSG_RESTRICTED: &str = "Acesso restrito";

/// Convert a session error into the structured failure response.
pub fn session_error_response(err: &SessionError) -> Response {
    let (status, message) = match err {
        SessionError::Unauthenticated
        | SessionError::RefreshFailed
        | SessionError::NoRefreshToken => {
            (StatusCode::UNAUTHORIZED, MSG_SESSION_EXPIRED.to_string())
        }
        SessionError::Transient(reason) => {
            tracing::warn!(%reason, "backend unavailable");
            (StatusCode::BAD_GATEWAY, MSG_BACKEND_UNAVAILABLE.to_string())
        }
        SessionError::Malformed(detail) => {
            tracing::error!(%detail, "backend contract violation");
            (StatusCode::BAD_GATEWAY, MSG_BACKEND_UNAVAILABLE.to_string())
        }
        SessionError::StorageUnavailable(reason) => {
            tracing::error!(%reason, "credential storage unavailable");
            (StatusCode::INTERNAL_SERVER_ERROR, MSG_INTERNAL.to_string())
        }
        // Already user-facing (e.g. backend login rejections).
        SessionError::Rejected(message) => (StatusCode::BAD_REQUEST, message.clone()),
    };

    (status, Json(ActionResult::fail(message))).into_response()
}

pub fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ActionResult::fail(MSG_INTERNAL)),
    )
        .into_response()
}
