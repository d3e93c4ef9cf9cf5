//! Registrar cache: memoized role/permission graph
//!
//! The registrar holds an immutable [`Snapshot`] of the full authorization
//! graph, rebuilt lazily from the [`EntityStore`] on first access after an
//! invalidation. Readers clone an `Arc` to the published snapshot and
//! resolve against it without further locking; writers replace the whole
//! reference rather than mutating shared structures in place, so a torn or
//! partial read is never observable.
//!
//! Every store mutation invalidates the registrar synchronously before the
//! mutating call returns. An epoch counter keeps a rebuild that raced such
//! a mutation from publishing its pre-mutation snapshot afterwards; the
//! racing resolution still gets its (then-current) result, and the next
//! resolution rebuilds fresh. Duplicate concurrent rebuilds are tolerated:
//! they are idempotent and produce the same snapshot.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;
use uuid::Uuid;
use warden_model::{EdgeKind, Permission, Role};

use crate::error::{AccessError, AccessResult};
use crate::store::EntityStore;

/// Immutable view of the authorization graph at one point in time.
#[derive(Debug, Default)]
pub struct Snapshot {
    permissions: HashMap<Uuid, Permission>,
    roles: HashMap<Uuid, Role>,
    /// Role id → names of its granted permissions
    role_grants: HashMap<Uuid, BTreeSet<String>>,
    /// Principal id → ids of its roles
    principal_roles: HashMap<Uuid, Vec<Uuid>>,
    /// Principal id → ids of its directly granted permissions
    principal_grants: HashMap<Uuid, Vec<Uuid>>,
}

impl Snapshot {
    /// Build a complete snapshot from the store.
    fn load(store: &dyn EntityStore) -> AccessResult<Self> {
        let permissions: HashMap<Uuid, Permission> = store
            .permissions()?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let roles: HashMap<Uuid, Role> =
            store.roles()?.into_iter().map(|r| (r.id, r)).collect();

        let mut role_grants: HashMap<Uuid, BTreeSet<String>> = HashMap::new();
        for (role_id, permission_id) in store.edges(EdgeKind::RolePermission)? {
            if let Some(permission) = permissions.get(&permission_id) {
                role_grants
                    .entry(role_id)
                    .or_default()
                    .insert(permission.name.clone());
            }
        }

        let mut principal_roles: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (principal_id, role_id) in store.edges(EdgeKind::PrincipalRole)? {
            principal_roles.entry(principal_id).or_default().push(role_id);
        }

        let mut principal_grants: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (principal_id, permission_id) in store.edges(EdgeKind::PrincipalPermission)? {
            principal_grants
                .entry(principal_id)
                .or_default()
                .push(permission_id);
        }

        Ok(Self {
            permissions,
            roles,
            role_grants,
            principal_roles,
            principal_grants,
        })
    }

    /// Names of the principal's directly granted permissions in `guard`.
    pub fn direct_permissions(&self, principal: Uuid, guard: &str) -> BTreeSet<String> {
        self.principal_grants
            .get(&principal)
            .into_iter()
            .flatten()
            .filter_map(|id| self.permissions.get(id))
            .filter(|p| p.guard == guard)
            .map(|p| p.name.clone())
            .collect()
    }

    /// Names of the permissions the principal holds through roles in `guard`.
    pub fn permissions_via_roles(&self, principal: Uuid, guard: &str) -> BTreeSet<String> {
        self.guard_roles(principal, guard)
            .flat_map(|role| {
                self.role_grants
                    .get(&role.id)
                    .into_iter()
                    .flatten()
                    .cloned()
            })
            .collect()
    }

    /// Names of the principal's roles in `guard`.
    pub fn role_names(&self, principal: Uuid, guard: &str) -> BTreeSet<String> {
        self.guard_roles(principal, guard)
            .map(|role| role.name.clone())
            .collect()
    }

    /// Direct role membership test, guard-scoped.
    pub fn has_role(&self, principal: Uuid, role_name: &str, guard: &str) -> bool {
        self.guard_roles(principal, guard)
            .any(|role| role.name == role_name)
    }

    fn guard_roles<'a>(
        &'a self,
        principal: Uuid,
        guard: &'a str,
    ) -> impl Iterator<Item = &'a Role> + 'a {
        self.principal_roles
            .get(&principal)
            .into_iter()
            .flatten()
            .filter_map(|id| self.roles.get(id))
            .filter(move |role| role.guard == guard)
    }
}

/// Process-wide cache of the authorization graph.
///
/// Explicit, injectable object with a defined lifecycle: created alongside
/// the resolver, invalidated on every mutation, rebuilt lazily on the next
/// resolution. There is no hidden process singleton; tests create their
/// own.
#[derive(Debug, Default)]
pub struct Registrar {
    snapshot: RwLock<Option<Arc<Snapshot>>>,
    /// Bumped by every invalidation; a rebuild only publishes if the epoch
    /// it started under is still current.
    epoch: AtomicU64,
}

impl Registrar {
    /// Create an empty registrar; the first resolution triggers a rebuild.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the cached snapshot immediately.
    ///
    /// Called synchronously by every mutation before it returns, so any
    /// resolution issued after a completed mutation observes the new state.
    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let mut slot = match self.snapshot.write() {
            Ok(slot) => slot,
            // Invalidation must still clear a poisoned slot, otherwise a
            // stale snapshot could outlive the mutation.
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
        debug!("registrar cache invalidated");
    }

    /// Return the published snapshot, rebuilding from the store on a miss.
    ///
    /// The rebuild blocks the calling resolution until the snapshot is
    /// complete; it is published only if no invalidation happened since the
    /// rebuild began.
    pub fn current(&self, store: &dyn EntityStore) -> AccessResult<Arc<Snapshot>> {
        if let Some(snapshot) = self.read_slot()?.clone() {
            return Ok(snapshot);
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        let built = Arc::new(Snapshot::load(store)?);

        let mut slot = self.write_slot()?;
        if self.epoch.load(Ordering::SeqCst) == epoch {
            *slot = Some(built.clone());
            debug!(
                roles = built.roles.len(),
                permissions = built.permissions.len(),
                "registrar cache rebuilt"
            );
        }
        // On an epoch change the build is stale for the cache but still a
        // valid answer for the resolution that requested it.
        Ok(built)
    }

    fn read_slot(&self) -> AccessResult<std::sync::RwLockReadGuard<'_, Option<Arc<Snapshot>>>> {
        self.snapshot
            .read()
            .map_err(|_| AccessError::StorageUnavailable("registrar lock poisoned".into()))
    }

    fn write_slot(&self) -> AccessResult<std::sync::RwLockWriteGuard<'_, Option<Arc<Snapshot>>>> {
        self.snapshot
            .write()
            .map_err(|_| AccessError::StorageUnavailable("registrar lock poisoned".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::atomic::AtomicBool;

    fn seeded_store() -> (InMemoryStore, Uuid, Uuid) {
        let store = InMemoryStore::new();
        let role = store.create_role("Editor", "web").unwrap();
        let perm = store.create_permission("edit-posts", "web").unwrap();
        store
            .grant(EdgeKind::RolePermission, role.id, perm.id)
            .unwrap();
        let principal = Uuid::now_v7();
        store
            .grant(EdgeKind::PrincipalRole, principal, role.id)
            .unwrap();
        (store, principal, role.id)
    }

    #[test]
    fn test_rebuild_on_first_access() {
        let (store, principal, _) = seeded_store();
        let registrar = Registrar::new();
        let snapshot = registrar.current(&store).unwrap();
        assert!(snapshot.has_role(principal, "Editor", "web"));
        assert!(snapshot
            .permissions_via_roles(principal, "web")
            .contains("edit-posts"));
    }

    #[test]
    fn test_cached_snapshot_is_reused() {
        let (store, _, _) = seeded_store();
        let registrar = Registrar::new();
        let first = registrar.current(&store).unwrap();
        let second = registrar.current(&store).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalidate_forces_fresh_snapshot() {
        let (store, principal, role_id) = seeded_store();
        let registrar = Registrar::new();
        let stale = registrar.current(&store).unwrap();

        store
            .revoke(EdgeKind::PrincipalRole, principal, role_id)
            .unwrap();
        registrar.invalidate();

        let fresh = registrar.current(&store).unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(stale.has_role(principal, "Editor", "web"));
        assert!(!fresh.has_role(principal, "Editor", "web"));
    }

    #[test]
    fn test_snapshot_partitions_guards() {
        let store = InMemoryStore::new();
        let web_role = store.create_role("Admin", "web").unwrap();
        let api_role = store.create_role("Admin", "api").unwrap();
        let principal = Uuid::now_v7();
        store
            .grant(EdgeKind::PrincipalRole, principal, web_role.id)
            .unwrap();
        // api role exists but is never assigned
        let _ = api_role;

        let registrar = Registrar::new();
        let snapshot = registrar.current(&store).unwrap();
        assert!(snapshot.has_role(principal, "Admin", "web"));
        assert!(!snapshot.has_role(principal, "Admin", "api"));
    }

    #[test]
    fn test_direct_permissions_filtered_by_guard() {
        let store = InMemoryStore::new();
        let web = store.create_permission("view-users", "web").unwrap();
        let api = store.create_permission("view-users", "api").unwrap();
        let principal = Uuid::now_v7();
        store
            .grant(EdgeKind::PrincipalPermission, principal, web.id)
            .unwrap();
        store
            .grant(EdgeKind::PrincipalPermission, principal, api.id)
            .unwrap();

        let registrar = Registrar::new();
        let snapshot = registrar.current(&store).unwrap();
        assert_eq!(snapshot.direct_permissions(principal, "web").len(), 1);
        assert_eq!(snapshot.direct_permissions(principal, "api").len(), 1);
        assert!(snapshot.direct_permissions(principal, "other").is_empty());
    }

    /// Store wrapper that mutates the graph and invalidates the registrar
    /// partway through a snapshot load, once the principal-role adjacency
    /// has already been read.
    struct MidLoadMutator {
        inner: Arc<InMemoryStore>,
        registrar: Arc<Registrar>,
        principal: Uuid,
        role: Uuid,
        armed: AtomicBool,
    }

    impl EntityStore for MidLoadMutator {
        fn create_permission(&self, name: &str, guard: &str) -> AccessResult<Permission> {
            self.inner.create_permission(name, guard)
        }

        fn create_role(&self, name: &str, guard: &str) -> AccessResult<Role> {
            self.inner.create_role(name, guard)
        }

        fn permission(&self, id: Uuid) -> AccessResult<Permission> {
            self.inner.permission(id)
        }

        fn role(&self, id: Uuid) -> AccessResult<Role> {
            self.inner.role(id)
        }

        fn permissions(&self) -> AccessResult<Vec<Permission>> {
            self.inner.permissions()
        }

        fn roles(&self) -> AccessResult<Vec<Role>> {
            self.inner.roles()
        }

        fn rename_permission(&self, id: Uuid, new_name: &str) -> AccessResult<Permission> {
            self.inner.rename_permission(id, new_name)
        }

        fn rename_role(&self, id: Uuid, new_name: &str) -> AccessResult<Role> {
            self.inner.rename_role(id, new_name)
        }

        fn delete_permission(&self, id: Uuid) -> AccessResult<()> {
            self.inner.delete_permission(id)
        }

        fn delete_role(&self, id: Uuid) -> AccessResult<()> {
            self.inner.delete_role(id)
        }

        fn grant(&self, kind: EdgeKind, from: Uuid, to: Uuid) -> AccessResult<()> {
            self.inner.grant(kind, from, to)
        }

        fn revoke(&self, kind: EdgeKind, from: Uuid, to: Uuid) -> AccessResult<()> {
            self.inner.revoke(kind, from, to)
        }

        fn sync(&self, kind: EdgeKind, from: Uuid, to: &[Uuid]) -> AccessResult<()> {
            self.inner.sync(kind, from, to)
        }

        fn edges(&self, kind: EdgeKind) -> AccessResult<Vec<(Uuid, Uuid)>> {
            let edges = self.inner.edges(kind)?;
            // Principal-permission edges are loaded last, after the
            // principal-role adjacency; a grant landing here makes the
            // in-flight snapshot stale before it can be published.
            if kind == EdgeKind::PrincipalPermission
                && self.armed.swap(false, Ordering::SeqCst)
            {
                self.inner
                    .grant(EdgeKind::PrincipalRole, self.principal, self.role)?;
                self.registrar.invalidate();
            }
            Ok(edges)
        }
    }

    #[test]
    fn test_rebuild_overlapped_by_invalidation_is_not_published() {
        let inner = Arc::new(InMemoryStore::new());
        let role = inner.create_role("Editor", "web").unwrap();
        let principal = Uuid::now_v7();
        let registrar = Arc::new(Registrar::new());
        let store = MidLoadMutator {
            inner: inner.clone(),
            registrar: registrar.clone(),
            principal,
            role: role.id,
            armed: AtomicBool::new(true),
        };

        // This rebuild reads the principal-role edges before the wrapper
        // grants one, so its snapshot is stale by the time it completes.
        // The caller still gets its then-current answer.
        let stale = registrar.current(&store).unwrap();
        assert!(!stale.has_role(principal, "Editor", "web"));

        // The overlapping invalidation kept the stale snapshot out of the
        // cache: the next resolution rebuilds and observes the grant.
        let fresh = registrar.current(&store).unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert!(fresh.has_role(principal, "Editor", "web"));

        // And the fresh snapshot is the one that got published.
        let again = registrar.current(&store).unwrap();
        assert!(Arc::ptr_eq(&fresh, &again));
    }
}
