//! Tenant entity: an isolated customer/business unit.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::id::TenantId;

/// Tenant lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
    Trial,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Trial => "trial",
        }
    }
}

impl core::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Business vertical of a tenant.
///
/// The platform ships one vertical per tenant; the active vertical selects
/// which dashboard modules the tenant sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantKind {
    Clinica,
    Autopecas,
    Petshop,
    Salao,
    Oficina,
}

impl TenantKind {
    /// URL/slug spelling, as used in dashboard path segments.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantKind::Clinica => "clinica",
            TenantKind::Autopecas => "autopecas",
            TenantKind::Petshop => "petshop",
            TenantKind::Salao => "salao",
            TenantKind::Oficina => "oficina",
        }
    }
}

impl core::fmt::Display for TenantKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TenantKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clinica" => Ok(TenantKind::Clinica),
            "autopecas" => Ok(TenantKind::Autopecas),
            "petshop" => Ok(TenantKind::Petshop),
            "salao" => Ok(TenantKind::Salao),
            "oficina" => Ok(TenantKind::Oficina),
            other => Err(DomainError::validation(format!(
                "unknown tenant kind: {other}"
            ))),
        }
    }
}

/// A tenant record as served by the backend.
///
/// # Invariants
/// - `id` is the unit of data isolation; downstream reads/writes carry it.
/// - `plan` is backend-defined and opaque here; nothing in the gateway
///   branches on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: String,
    pub status: TenantStatus,
    pub kind: TenantKind,
    pub plan: String,
}

impl Tenant {
    /// Whether the tenant may currently use the platform.
    pub fn is_operational(&self) -> bool {
        matches!(self.status, TenantStatus::Active | TenantStatus::Trial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_slug() {
        for kind in [
            TenantKind::Clinica,
            TenantKind::Autopecas,
            TenantKind::Petshop,
            TenantKind::Salao,
            TenantKind::Oficina,
        ] {
            assert_eq!(TenantKind::from_str(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn kind_rejects_unknown_slug() {
        assert!(TenantKind::from_str("padaria").is_err());
        assert!(TenantKind::from_str("").is_err());
    }

    #[test]
    fn status_wire_spelling_is_lowercase() {
        let json = serde_json::to_string(&TenantStatus::Trial).unwrap();
        assert_eq!(json, "\"trial\"");
    }

    #[test]
    fn suspended_tenant_is_not_operational() {
        let tenant = Tenant {
            id: TenantId::new("client-42"),
            name: "Clínica Boa Vista".to_string(),
            slug: "clinica-boa-vista".to_string(),
            status: TenantStatus::Suspended,
            kind: TenantKind::Clinica,
            plan: "profissional".to_string(),
        };
        assert!(!tenant.is_operational());
    }
}
