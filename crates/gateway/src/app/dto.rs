//! Request/response DTOs and JSON mapping helpers.

use serde::{Deserialize, Serialize};

/// Structured action outcome. Failures carry a user-facing message and,
/// for validation failures, the offending field.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl ActionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
            field: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            field: None,
        }
    }

    pub fn fail_field(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field),
            ..Self::fail(message)
        }
    }
}

/// Payload of `POST /dashboard/switch-tenant`.
#[derive(Debug, Clone, Deserialize)]
pub struct SwitchTenantRequest {
    pub tenant_type: String,
    pub client_id: String,
}
