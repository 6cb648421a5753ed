//! Per-session tenant context.
//!
//! The context is the single answer to "which tenant's data does this session
//! see". It is derived state: never persisted server-side, mirrored into the
//! session's local store and the `client_id` credential for continuity.
//!
//! Switches are serialized per session and commit by whole-struct
//! replacement, so a reader concurrent with two switches observes one call's
//! complete result, never a mix of fields from both.

use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info};

use balcao_core::{Tenant, TenantId, TenantKind};

use crate::backend::IdentityBackend;
use crate::credentials::{CredentialKind, CredentialStore};
use crate::error::SessionError;

/// The committed tenant pair. Both halves always travel together, which is
/// what keeps the "client set iff tenant set" invariant structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveTenant {
    pub kind: TenantKind,
    pub client: Tenant,
}

/// Session-local persistence of the active tenant pair (the browser-side
/// continuity store).
pub trait TenantStore: Send + Sync {
    fn save(&self, active: &ActiveTenant) -> Result<(), SessionError>;
    fn load(&self) -> Result<Option<ActiveTenant>, SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

/// In-memory [`TenantStore`].
#[derive(Debug, Default)]
pub struct MemoryTenantStore {
    slot: Mutex<Option<ActiveTenant>>,
}

impl MemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TenantStore for MemoryTenantStore {
    fn save(&self, active: &ActiveTenant) -> Result<(), SessionError> {
        *self
            .slot
            .lock()
            .map_err(|_| SessionError::storage("tenant store lock poisoned"))? =
            Some(active.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<ActiveTenant>, SessionError> {
        Ok(self
            .slot
            .lock()
            .map_err(|_| SessionError::storage("tenant store lock poisoned"))?
            .clone())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self
            .slot
            .lock()
            .map_err(|_| SessionError::storage("tenant store lock poisoned"))? = None;
        Ok(())
    }
}

/// Per-session tenant context with serialized switch/exit/restore.
pub struct TenantContext {
    current: RwLock<Option<Arc<ActiveTenant>>>,
    switch_lock: tokio::sync::Mutex<()>,
    local: Arc<dyn TenantStore>,
}

impl TenantContext {
    pub fn new(local: Arc<dyn TenantStore>) -> Self {
        Self {
            current: RwLock::new(None),
            switch_lock: tokio::sync::Mutex::new(()),
            local,
        }
    }

    /// Atomic snapshot of the committed pair.
    pub fn active(&self) -> Result<Option<Arc<ActiveTenant>>, SessionError> {
        Ok(self
            .current
            .read()
            .map_err(|_| SessionError::storage("tenant context lock poisoned"))?
            .clone())
    }

    /// Switch the session into a tenant.
    ///
    /// Rotates the auth token into the target tenant, fetches the client
    /// record with the rotated token, and only then commits: local
    /// persistence, credential mirror, and the in-memory pair are written
    /// after every fallible step has succeeded. A failed fetch or failed
    /// persistence leaves the previous context fully in place.
    pub async fn switch_tenant(
        &self,
        backend: &dyn IdentityBackend,
        credentials: &dyn CredentialStore,
        kind: TenantKind,
        client_id: &TenantId,
    ) -> Result<Arc<ActiveTenant>, SessionError> {
        let _guard = self.switch_lock.lock().await;

        let snapshot = credentials.snapshot()?;
        let Some(token) = snapshot.auth_token else {
            return Err(SessionError::Unauthenticated);
        };

        let pair = backend.switch_tenant(&token, client_id).await?;
        let client = backend.fetch_client(&pair.token, client_id).await?;
        let active = ActiveTenant { kind, client };

        self.local.save(&active)?;
        credentials.set_tokens(&pair.token, pair.refresh_token.as_deref())?;
        credentials.set(CredentialKind::TenantId, client_id.as_str())?;

        let active = Arc::new(active);
        self.commit(Some(active.clone()))?;
        info!(tenant = %client_id, kind = %kind, "tenant context switched");
        Ok(active)
    }

    /// Leave tenant mode: both fields and the local persistence are cleared;
    /// the caller navigates to the administrative root afterwards.
    pub async fn exit_tenant_mode(&self) -> Result<(), SessionError> {
        let _guard = self.switch_lock.lock().await;
        self.local.clear()?;
        self.commit(None)?;
        debug!("tenant context cleared");
        Ok(())
    }

    /// Restore a previously persisted pair, falling back to path-derived
    /// inference.
    ///
    /// The persisted pair is the source of truth; the URL segment is only a
    /// secondary signal and still needs the stored `client_id` credential
    /// plus a client fetch to produce a complete pair.
    pub async fn restore(
        &self,
        backend: &dyn IdentityBackend,
        credentials: &dyn CredentialStore,
        path: Option<&str>,
    ) -> Result<Option<Arc<ActiveTenant>>, SessionError> {
        let _guard = self.switch_lock.lock().await;

        if let Some(current) = self.active()? {
            return Ok(Some(current));
        }

        if let Some(saved) = self.local.load()? {
            let saved = Arc::new(saved);
            self.commit(Some(saved.clone()))?;
            return Ok(Some(saved));
        }

        let Some(kind) = path.and_then(infer_kind_from_path) else {
            return Ok(None);
        };
        let snapshot = credentials.snapshot()?;
        let (Some(token), Some(client_id)) = (snapshot.auth_token, snapshot.tenant_id) else {
            return Ok(None);
        };

        let client = backend.fetch_client(&token, &client_id).await?;
        let active = ActiveTenant { kind, client };
        self.local.save(&active)?;
        let active = Arc::new(active);
        self.commit(Some(active.clone()))?;
        debug!(tenant = %client_id, "tenant context restored from path inference");
        Ok(Some(active))
    }

    fn commit(&self, value: Option<Arc<ActiveTenant>>) -> Result<(), SessionError> {
        *self
            .current
            .write()
            .map_err(|_| SessionError::storage("tenant context lock poisoned"))? = value;
        Ok(())
    }
}

/// Derive a tenant kind from a dashboard path segment.
fn infer_kind_from_path(path: &str) -> Option<TenantKind> {
    let rest = path.strip_prefix("/dashboard/")?;
    let segment = rest.split('/').next()?;
    TenantKind::from_str(segment).ok()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use balcao_auth::Principal;
    use balcao_core::{Tenant, TenantStatus};

    use super::*;
    use crate::backend::{LoginGrant, TokenPair};
    use crate::credentials::MemoryCredentialStore;

    fn tenant(id: &str, kind: TenantKind) -> Tenant {
        Tenant {
            id: TenantId::new(id),
            name: format!("Cliente {id}"),
            slug: id.to_string(),
            status: TenantStatus::Active,
            kind,
            plan: "essencial".to_string(),
        }
    }

    /// Backend fake serving tenant records, with per-client fetch delays to
    /// shape interleavings.
    struct TenantFake {
        clients: HashMap<String, Tenant>,
        delays: HashMap<String, Duration>,
        fetch_calls: AtomicUsize,
        fail_fetch: bool,
    }

    impl TenantFake {
        fn with(records: Vec<Tenant>) -> Self {
            Self {
                clients: records
                    .into_iter()
                    .map(|t| (t.id.as_str().to_string(), t))
                    .collect(),
                delays: HashMap::new(),
                fetch_calls: AtomicUsize::new(0),
                fail_fetch: false,
            }
        }

        fn delayed(mut self, id: &str, delay: Duration) -> Self {
            self.delays.insert(id.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl IdentityBackend for TenantFake {
        async fn me(&self, _auth_token: &str) -> Result<Principal, SessionError> {
            unimplemented!("not exercised")
        }

        async fn login(&self, _email: &str, _password: &str) -> Result<LoginGrant, SessionError> {
            unimplemented!("not exercised")
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<TokenPair, SessionError> {
            unimplemented!("not exercised")
        }

        async fn switch_tenant(
            &self,
            _auth_token: &str,
            client_id: &TenantId,
        ) -> Result<TokenPair, SessionError> {
            Ok(TokenPair {
                token: format!("T-{client_id}"),
                refresh_token: None,
            })
        }

        async fn fetch_client(
            &self,
            _auth_token: &str,
            client_id: &TenantId,
        ) -> Result<Tenant, SessionError> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(client_id.as_str()) {
                tokio::time::sleep(*delay).await;
            }
            if self.fail_fetch {
                return Err(SessionError::transient("backend 503"));
            }
            self.clients
                .get(client_id.as_str())
                .cloned()
                .ok_or_else(|| SessionError::rejected("Resposta inesperada do servidor"))
        }

        async fn logout(&self, _auth_token: &str) -> Result<(), SessionError> {
            unimplemented!("not exercised")
        }
    }

    /// Tenant store that refuses writes.
    struct BrokenTenantStore;

    impl TenantStore for BrokenTenantStore {
        fn save(&self, _active: &ActiveTenant) -> Result<(), SessionError> {
            Err(SessionError::storage("disk full"))
        }

        fn load(&self) -> Result<Option<ActiveTenant>, SessionError> {
            Ok(None)
        }

        fn clear(&self) -> Result<(), SessionError> {
            Ok(())
        }
    }

    fn seeded_credentials(auth: &str, tenant: &str) -> MemoryCredentialStore {
        let store = MemoryCredentialStore::new();
        store.set(CredentialKind::AuthToken, auth).unwrap();
        store.set(CredentialKind::TenantId, tenant).unwrap();
        store
    }

    #[tokio::test]
    async fn switch_commits_pair_mirror_and_persistence() {
        let backend = TenantFake::with(vec![tenant("client-42", TenantKind::Clinica)]);
        let credentials = seeded_credentials("T1", "C0");
        let local = Arc::new(MemoryTenantStore::new());
        let context = TenantContext::new(local.clone());

        let active = context
            .switch_tenant(
                &backend,
                &credentials,
                TenantKind::Clinica,
                &TenantId::new("client-42"),
            )
            .await
            .unwrap();

        assert_eq!(active.client.id, TenantId::new("client-42"));
        // Token rotated into the tenant, mirror updated.
        let snapshot = credentials.snapshot().unwrap();
        assert_eq!(snapshot.auth_token.as_deref(), Some("T-client-42"));
        assert_eq!(snapshot.tenant_id, Some(TenantId::new("client-42")));
        // Local persistence holds the same pair.
        assert_eq!(local.load().unwrap().as_ref(), Some(active.as_ref()));
    }

    #[tokio::test]
    async fn switch_without_credentials_is_unauthenticated() {
        let backend = TenantFake::with(vec![]);
        let credentials = MemoryCredentialStore::new();
        let context = TenantContext::new(Arc::new(MemoryTenantStore::new()));

        let err = context
            .switch_tenant(
                &backend,
                &credentials,
                TenantKind::Clinica,
                &TenantId::new("client-42"),
            )
            .await
            .unwrap_err();

        assert_eq!(err, SessionError::Unauthenticated);
        assert!(context.active().unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_fetch_commits_nothing() {
        let backend = TenantFake {
            fail_fetch: true,
            ..TenantFake::with(vec![tenant("client-42", TenantKind::Clinica)])
        };
        let credentials = seeded_credentials("T1", "C0");
        let local = Arc::new(MemoryTenantStore::new());
        let context = TenantContext::new(local.clone());

        let err = context
            .switch_tenant(
                &backend,
                &credentials,
                TenantKind::Clinica,
                &TenantId::new("client-42"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::Transient(_)));
        assert!(context.active().unwrap().is_none());
        assert!(local.load().unwrap().is_none());
        // The pre-switch credentials survive.
        let snapshot = credentials.snapshot().unwrap();
        assert_eq!(snapshot.auth_token.as_deref(), Some("T1"));
        assert_eq!(snapshot.tenant_id, Some(TenantId::new("C0")));
    }

    #[tokio::test]
    async fn failed_persistence_commits_nothing() {
        let backend = TenantFake::with(vec![tenant("client-42", TenantKind::Clinica)]);
        let credentials = seeded_credentials("T1", "C0");
        let context = TenantContext::new(Arc::new(BrokenTenantStore));

        let err = context
            .switch_tenant(
                &backend,
                &credentials,
                TenantKind::Clinica,
                &TenantId::new("client-42"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SessionError::StorageUnavailable(_)));
        assert!(context.active().unwrap().is_none());
        // Credentials were not touched either: the commit never started.
        assert_eq!(
            credentials.snapshot().unwrap().auth_token.as_deref(),
            Some("T1")
        );
    }

    #[tokio::test]
    async fn racing_switches_end_on_one_complete_result() {
        let backend = Arc::new(
            TenantFake::with(vec![
                tenant("client-42", TenantKind::Clinica),
                tenant("client-99", TenantKind::Autopecas),
            ])
            // The first switch is slow, the second fast; serialization makes
            // the second commit last.
            .delayed("client-42", Duration::from_millis(30)),
        );
        let credentials = Arc::new(seeded_credentials("T1", "C0"));
        let context = Arc::new(TenantContext::new(Arc::new(MemoryTenantStore::new())));

        let first = {
            let (context, backend, credentials) =
                (context.clone(), backend.clone(), credentials.clone());
            tokio::spawn(async move {
                context
                    .switch_tenant(
                        backend.as_ref(),
                        credentials.as_ref(),
                        TenantKind::Clinica,
                        &TenantId::new("client-42"),
                    )
                    .await
            })
        };
        // Let the first call take the switch lock before queueing the second.
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let (context, backend, credentials) =
                (context.clone(), backend.clone(), credentials.clone());
            tokio::spawn(async move {
                context
                    .switch_tenant(
                        backend.as_ref(),
                        credentials.as_ref(),
                        TenantKind::Autopecas,
                        &TenantId::new("client-99"),
                    )
                    .await
            })
        };

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let active = context.active().unwrap().unwrap();
        // Exactly the second call's result; no field mixing.
        assert_eq!(active.kind, TenantKind::Autopecas);
        assert_eq!(active.client.id, TenantId::new("client-99"));
        assert_eq!(active.client.kind, TenantKind::Autopecas);
        assert_eq!(
            credentials.snapshot().unwrap().tenant_id,
            Some(TenantId::new("client-99"))
        );
    }

    #[tokio::test]
    async fn exit_clears_fields_and_persistence() {
        let backend = TenantFake::with(vec![tenant("client-42", TenantKind::Clinica)]);
        let credentials = seeded_credentials("T1", "C0");
        let local = Arc::new(MemoryTenantStore::new());
        let context = TenantContext::new(local.clone());

        context
            .switch_tenant(
                &backend,
                &credentials,
                TenantKind::Clinica,
                &TenantId::new("client-42"),
            )
            .await
            .unwrap();
        context.exit_tenant_mode().await.unwrap();

        assert!(context.active().unwrap().is_none());
        assert!(local.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn restore_prefers_persisted_pair_over_path() {
        let backend = TenantFake::with(vec![tenant("client-99", TenantKind::Autopecas)]);
        let credentials = seeded_credentials("T1", "client-99");
        let local = Arc::new(MemoryTenantStore::new());
        let saved = ActiveTenant {
            kind: TenantKind::Clinica,
            client: tenant("client-42", TenantKind::Clinica),
        };
        local.save(&saved).unwrap();
        let context = TenantContext::new(local);

        let restored = context
            .restore(&backend, &credentials, Some("/dashboard/autopecas/pedidos"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(restored.as_ref(), &saved);
        // The path signal was not consulted.
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_falls_back_to_path_inference() {
        let backend = TenantFake::with(vec![tenant("client-42", TenantKind::Clinica)]);
        let credentials = seeded_credentials("T1", "client-42");
        let context = TenantContext::new(Arc::new(MemoryTenantStore::new()));

        let restored = context
            .restore(&backend, &credentials, Some("/dashboard/clinica/agenda"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(restored.kind, TenantKind::Clinica);
        assert_eq!(restored.client.id, TenantId::new("client-42"));
        assert_eq!(backend.fetch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn restore_without_signals_stays_empty() {
        let backend = TenantFake::with(vec![]);
        let credentials = seeded_credentials("T1", "client-42");
        let context = TenantContext::new(Arc::new(MemoryTenantStore::new()));

        let restored = context
            .restore(&backend, &credentials, Some("/dashboard"))
            .await
            .unwrap();

        assert!(restored.is_none());
        assert!(context.active().unwrap().is_none());
    }

    #[test]
    fn path_inference_reads_first_segment_only() {
        assert_eq!(
            infer_kind_from_path("/dashboard/clinica/agenda"),
            Some(TenantKind::Clinica)
        );
        assert_eq!(infer_kind_from_path("/dashboard/petshop"), Some(TenantKind::Petshop));
        assert_eq!(infer_kind_from_path("/dashboard"), None);
        assert_eq!(infer_kind_from_path("/dashboard/banco"), None);
        assert_eq!(infer_kind_from_path("/login"), None);
    }
}
