//! Outbound client for the identity/tenant endpoints.
//!
//! The backend is a boundary collaborator: every response shape is validated
//! exactly once, here. A payload that does not match the contract fails fast
//! as `Malformed` instead of being probed for alternate shapes.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use balcao_auth::{Principal, PrincipalStatus, Role};
use balcao_core::{PrincipalId, Tenant, TenantId, TenantKind, TenantStatus};

use crate::error::SessionError;

/// Login rejection when the backend omits the token.
pub const MSG_MISSING_TOKEN: &str = "Token não recebido do servidor";
/// Login rejection when the backend omits the client id.
pub const MSG_MISSING_CLIENT_ID: &str = "Client ID não recebido do servidor";

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub user: Principal,
    pub token: String,
    pub refresh_token: Option<String>,
    pub client_id: TenantId,
}

/// A freshly issued token pair. `refresh_token` is `None` when the endpoint
/// rotates only the auth token (tenant switch).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub token: String,
    pub refresh_token: Option<String>,
}

/// Contract with the external identity/tenant backend.
#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// `GET /auth/me` with a bearer token.
    async fn me(&self, auth_token: &str) -> Result<Principal, SessionError>;

    /// `POST /auth/login`.
    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, SessionError>;

    /// `POST /auth/refresh`.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError>;

    /// `POST /auth/switch-tenant` with a bearer token.
    async fn switch_tenant(
        &self,
        auth_token: &str,
        client_id: &TenantId,
    ) -> Result<TokenPair, SessionError>;

    /// `GET /clients/{id}` with a bearer token.
    async fn fetch_client(
        &self,
        auth_token: &str,
        client_id: &TenantId,
    ) -> Result<Tenant, SessionError>;

    /// `POST /auth/logout` with a bearer token. Best-effort: callers clear
    /// local credentials regardless of the outcome.
    async fn logout(&self, auth_token: &str) -> Result<(), SessionError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Identity payload as the backend spells it (camelCase keys).
#[derive(Debug, Deserialize)]
struct PrincipalPayload {
    id: PrincipalId,
    #[serde(rename = "tenantId")]
    tenant_id: TenantId,
    email: String,
    name: String,
    role: Role,
    status: PrincipalStatus,
    #[serde(rename = "emailVerified")]
    email_verified: bool,
}

impl From<PrincipalPayload> for Principal {
    fn from(p: PrincipalPayload) -> Self {
        Principal {
            id: p.id,
            tenant_id: p.tenant_id,
            email: p.email,
            name: p.name,
            role: p.role,
            status: p.status,
            email_verified: p.email_verified,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    user: PrincipalPayload,
    token: Option<String>,
    refresh_token: Option<String>,
    client_id: Option<TenantId>,
}

impl LoginPayload {
    /// Enforce the login invariant: a grant without a token or without a
    /// tenant id is rejected with its caller-visible message.
    fn into_grant(self) -> Result<LoginGrant, SessionError> {
        let token = match self.token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(SessionError::rejected(MSG_MISSING_TOKEN)),
        };
        let client_id = match self.client_id {
            Some(client_id) if !client_id.as_str().is_empty() => client_id,
            _ => return Err(SessionError::rejected(MSG_MISSING_CLIENT_ID)),
        };
        Ok(LoginGrant {
            user: self.user.into(),
            token,
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            client_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RefreshPayload {
    token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct SwitchTenantPayload {
    token: String,
    refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TenantPayload {
    id: TenantId,
    name: String,
    slug: String,
    status: TenantStatus,
    #[serde(rename = "type")]
    kind: TenantKind,
    plan: String,
}

impl From<TenantPayload> for Tenant {
    fn from(t: TenantPayload) -> Self {
        Tenant {
            id: t.id,
            name: t.name,
            slug: t.slug,
            status: t.status,
            kind: t.kind,
            plan: t.plan,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Reqwest-backed implementation of [`IdentityBackend`].
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client with a bounded per-request timeout. Timeouts surface
    /// as `Transient` like any other network failure.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SessionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SessionError::transient(format!("failed to build http client: {e}")))?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl IdentityBackend for HttpBackend {
    async fn me(&self, auth_token: &str) -> Result<Principal, SessionError> {
        let resp = self
            .http
            .get(self.url("/auth/me"))
            .bearer_auth(auth_token)
            .send()
            .await
            .map_err(send_error)?;
        let payload: PrincipalPayload = read_json(resp, "/auth/me").await?;
        Ok(payload.into())
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginGrant, SessionError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(send_error)?;
        let payload: LoginPayload = read_json(resp, "/auth/login").await?;
        payload.into_grant()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, SessionError> {
        let resp = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(send_error)?;
        let payload: RefreshPayload = read_json(resp, "/auth/refresh").await?;
        Ok(TokenPair {
            token: payload.token,
            refresh_token: Some(payload.refresh_token),
        })
    }

    async fn switch_tenant(
        &self,
        auth_token: &str,
        client_id: &TenantId,
    ) -> Result<TokenPair, SessionError> {
        let resp = self
            .http
            .post(self.url("/auth/switch-tenant"))
            .bearer_auth(auth_token)
            .json(&serde_json::json!({ "client_id": client_id }))
            .send()
            .await
            .map_err(send_error)?;
        let payload: SwitchTenantPayload = read_json(resp, "/auth/switch-tenant").await?;
        Ok(TokenPair {
            token: payload.token,
            refresh_token: payload.refresh_token,
        })
    }

    async fn fetch_client(
        &self,
        auth_token: &str,
        client_id: &TenantId,
    ) -> Result<Tenant, SessionError> {
        let resp = self
            .http
            .get(self.url(&format!("/clients/{client_id}")))
            .bearer_auth(auth_token)
            .send()
            .await
            .map_err(send_error)?;
        let payload: TenantPayload = read_json(resp, "/clients/{id}").await?;
        Ok(payload.into())
    }

    async fn logout(&self, auth_token: &str) -> Result<(), SessionError> {
        let resp = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(auth_token)
            .send()
            .await
            .map_err(send_error)?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "backend logout failed");
        }
        Ok(())
    }
}

fn send_error(err: reqwest::Error) -> SessionError {
    SessionError::transient(err.to_string())
}

/// Map status codes to the error taxonomy and decode the success body.
async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
    what: &'static str,
) -> Result<T, SessionError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(SessionError::Unauthenticated);
    }
    if status.is_server_error() {
        return Err(SessionError::transient(format!(
            "{what}: backend returned {status}"
        )));
    }
    if !status.is_success() {
        warn!(%status, endpoint = what, "unexpected backend status");
        return Err(SessionError::rejected("Resposta inesperada do servidor"));
    }

    resp.json::<T>()
        .await
        .map_err(|e| SessionError::malformed(format!("{what}: {e}")))
}
