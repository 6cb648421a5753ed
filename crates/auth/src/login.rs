//! Login payload validation.
//!
//! Validation is local and recoverable: the caller re-prompts with the field
//! error instead of hitting the backend with a payload it would reject.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PASSWORD_MIN_LEN: usize = 6;

/// Raw login form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Per-field validation failure. Messages are user-facing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    #[error("E-mail é obrigatório")]
    EmailRequired,

    #[error("E-mail inválido")]
    EmailInvalid,

    #[error("Senha é obrigatória")]
    PasswordRequired,

    #[error("Senha deve ter pelo menos {PASSWORD_MIN_LEN} caracteres")]
    PasswordTooShort,
}

impl LoginValidationError {
    /// Form field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            LoginValidationError::EmailRequired | LoginValidationError::EmailInvalid => "email",
            LoginValidationError::PasswordRequired | LoginValidationError::PasswordTooShort => {
                "password"
            }
        }
    }
}

impl LoginCredentials {
    /// Validate and normalize the payload (email trimmed + lowercased).
    pub fn validated(self) -> Result<Self, LoginValidationError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(LoginValidationError::EmailRequired);
        }
        // Basic shape check; the backend owns real address verification.
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(LoginValidationError::EmailInvalid);
        }

        if self.password.is_empty() {
            return Err(LoginValidationError::PasswordRequired);
        }
        if self.password.len() < PASSWORD_MIN_LEN {
            return Err(LoginValidationError::PasswordTooShort);
        }

        Ok(Self {
            email,
            password: self.password,
        })
    }
}
