//! `balcao-auth` — authentication boundary types.
//!
//! This crate is intentionally decoupled from HTTP and storage: it carries the
//! resolved identity (`Principal`), role/status vocabulary, and login payload
//! validation. Token handling lives in `balcao-session`.

pub mod login;
pub mod principal;
pub mod roles;

pub use login::{LoginCredentials, LoginValidationError};
pub use principal::{dev_principal, Principal, PrincipalStatus};
pub use roles::Role;
