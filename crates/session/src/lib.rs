//! `balcao-session` — session, credential, and tenant-context core.
//!
//! Everything here is the thin-but-load-bearing layer between the HTTP edge
//! and the external backend: which credentials a browser session holds, who
//! the authenticated principal is, and which tenant's data a request sees.
//!
//! - `credentials`: the credential store contract plus the in-memory
//!   implementation.
//! - `cookie`: the cookie-backed credential store used by the gateway.
//! - `backend`: the outbound client for the identity/tenant endpoints.
//! - `resolver`: credentials → principal, with the single refresh-and-retry.
//! - `refresh`: the single-flight token refresh coordinator.
//! - `tenant`: the per-session tenant context (switch / exit / restore).

pub mod backend;
pub mod cookie;
pub mod credentials;
pub mod error;
pub mod refresh;
pub mod resolver;
pub mod tenant;

pub use backend::{HttpBackend, IdentityBackend, LoginGrant, TokenPair};
pub use cookie::CookieCredentialStore;
pub use credentials::{CredentialKind, CredentialStore, Credentials, MemoryCredentialStore};
pub use error::SessionError;
pub use refresh::RefreshCoordinator;
pub use resolver::SessionResolver;
pub use tenant::{ActiveTenant, MemoryTenantStore, TenantContext, TenantStore};
