//! The authenticated identity making a request.

use serde::{Deserialize, Serialize};

use balcao_core::{PrincipalId, TenantId};

use crate::Role;

/// Account status of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrincipalStatus {
    Active,
    Inactive,
    Suspended,
    PendingVerification,
}

impl PrincipalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalStatus::Active => "active",
            PrincipalStatus::Inactive => "inactive",
            PrincipalStatus::Suspended => "suspended",
            PrincipalStatus::PendingVerification => "pending_verification",
        }
    }
}

impl core::fmt::Display for PrincipalStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved principal, as returned by the identity endpoint.
///
/// Created on successful login and refreshed from the identity endpoint on
/// each resolution; immutable within a request. Destroyed (together with the
/// stored credentials) on logout or token expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub status: PrincipalStatus,
    pub email_verified: bool,
}

impl Principal {
    /// Whether this principal may reach protected views at all.
    pub fn is_active(&self) -> bool {
        self.status == PrincipalStatus::Active
    }
}

/// Fixed principal used by the route-gate development bypass.
///
/// Only reachable in non-production builds; the gate refuses to mint it when
/// the build-time production flag is set.
pub fn dev_principal() -> Principal {
    Principal {
        id: PrincipalId::new("dev-user"),
        tenant_id: TenantId::new("dev-tenant"),
        email: "dev@balcao.local".to_string(),
        name: "Usuário de Desenvolvimento".to_string(),
        role: Role::SuperAdmin,
        status: PrincipalStatus::Active,
        email_verified: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_principals_pass() {
        let mut principal = dev_principal();
        assert!(principal.is_active());

        principal.status = PrincipalStatus::Suspended;
        assert!(!principal.is_active());

        principal.status = PrincipalStatus::PendingVerification;
        assert!(!principal.is_active());
    }

    #[test]
    fn principal_decodes_from_identity_payload() {
        let json = serde_json::json!({
            "id": "u-1",
            "tenant_id": "client-42",
            "email": "ana@clinica.com.br",
            "name": "Ana Souza",
            "role": "admin",
            "status": "active",
            "email_verified": true,
        });

        let principal: Principal = serde_json::from_value(json).unwrap();
        assert_eq!(principal.role, Role::Admin);
        assert_eq!(principal.tenant_id, TenantId::new("client-42"));
    }
}
