//! Role vocabulary shared with the backend.

use serde::{Deserialize, Serialize};

/// Role of a principal within its tenant.
///
/// The set is closed: the backend only ever issues these five values, and an
/// unknown role in a response is a decode failure rather than a silent
/// downgrade to `Guest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Employee,
    Client,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::Employee => "employee",
            Role::Client => "client",
            Role::Guest => "guest",
        }
    }

    /// Whether this role may administer tenants (switch into any tenant,
    /// reach the administrative root view).
    pub fn is_administrative(&self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
