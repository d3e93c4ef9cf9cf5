//! Entity store: durable home of the authorization graph
//!
//! This module defines the storage contract the engine resolves against
//! ([`EntityStore`]) and an in-memory reference implementation
//! ([`InMemoryStore`]) used by tests and single-process deployments.
//!
//! All mutations are atomic with respect to the edge set they change, and
//! the reference-count check guarding deletes runs inside the same
//! critical section as the delete itself.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};
use uuid::Uuid;
use warden_model::{EdgeKind, Permission, Role};

use crate::error::{AccessError, AccessResult};

/// Storage contract for the authorization graph.
///
/// Implemented by the durable-storage collaborator of the surrounding
/// application. All operations are synchronous; callers inherit whatever
/// timeout the storage backend imposes, surfaced as
/// [`AccessError::StorageUnavailable`].
///
/// Duplicate edge grants are idempotent no-ops, never errors. `sync`
/// replaces the entire edge set for `from` in one atomic step; syncing to
/// an empty slice removes every edge for `from`.
pub trait EntityStore: Send + Sync {
    /// Create a permission, enforcing (name, guard) uniqueness.
    fn create_permission(&self, name: &str, guard: &str) -> AccessResult<Permission>;

    /// Create a role, enforcing (name, guard) uniqueness.
    fn create_role(&self, name: &str, guard: &str) -> AccessResult<Role>;

    /// Look up a permission by id.
    fn permission(&self, id: Uuid) -> AccessResult<Permission>;

    /// Look up a role by id.
    fn role(&self, id: Uuid) -> AccessResult<Role>;

    /// List all permissions.
    fn permissions(&self) -> AccessResult<Vec<Permission>>;

    /// List all roles.
    fn roles(&self) -> AccessResult<Vec<Role>>;

    /// Rename a permission, enforcing (name, guard) uniqueness.
    fn rename_permission(&self, id: Uuid, new_name: &str) -> AccessResult<Permission>;

    /// Rename a role, enforcing (name, guard) uniqueness.
    fn rename_role(&self, id: Uuid, new_name: &str) -> AccessResult<Role>;

    /// Delete a permission. Refused while any edge references it.
    fn delete_permission(&self, id: Uuid) -> AccessResult<()>;

    /// Delete a role. Refused while any edge references it.
    fn delete_role(&self, id: Uuid) -> AccessResult<()>;

    /// Add one edge. Idempotent on duplicates.
    fn grant(&self, kind: EdgeKind, from: Uuid, to: Uuid) -> AccessResult<()>;

    /// Remove one edge. Removing an absent edge is a no-op.
    fn revoke(&self, kind: EdgeKind, from: Uuid, to: Uuid) -> AccessResult<()>;

    /// Replace the entire edge set for `from` with `to`, atomically.
    fn sync(&self, kind: EdgeKind, from: Uuid, to: &[Uuid]) -> AccessResult<()>;

    /// Dump all edges of one kind, for cache rebuild.
    fn edges(&self, kind: EdgeKind) -> AccessResult<Vec<(Uuid, Uuid)>>;
}

/// All tables of the graph, guarded by a single lock so every mutation is
/// one all-or-nothing critical section.
#[derive(Default)]
struct Tables {
    permissions: HashMap<Uuid, Permission>,
    roles: HashMap<Uuid, Role>,
    role_permissions: BTreeSet<(Uuid, Uuid)>,
    principal_roles: BTreeSet<(Uuid, Uuid)>,
    principal_permissions: BTreeSet<(Uuid, Uuid)>,
}

impl Tables {
    fn edge_set(&self, kind: EdgeKind) -> &BTreeSet<(Uuid, Uuid)> {
        match kind {
            EdgeKind::RolePermission => &self.role_permissions,
            EdgeKind::PrincipalRole => &self.principal_roles,
            EdgeKind::PrincipalPermission => &self.principal_permissions,
        }
    }

    fn edge_set_mut(&mut self, kind: EdgeKind) -> &mut BTreeSet<(Uuid, Uuid)> {
        match kind {
            EdgeKind::RolePermission => &mut self.role_permissions,
            EdgeKind::PrincipalRole => &mut self.principal_roles,
            EdgeKind::PrincipalPermission => &mut self.principal_permissions,
        }
    }

    /// Validate the endpoints of an edge before it is written.
    ///
    /// Principals are owned by the surrounding application and carry no
    /// record here, so only the role/permission side is resolved. Pairing
    /// a role with a permission from another guard is refused.
    fn validate_edge(&self, kind: EdgeKind, from: Uuid, to: Uuid) -> AccessResult<()> {
        match kind {
            EdgeKind::RolePermission => {
                let role = self
                    .roles
                    .get(&from)
                    .ok_or(AccessError::RoleNotFound(from))?;
                let permission = self
                    .permissions
                    .get(&to)
                    .ok_or(AccessError::PermissionNotFound(to))?;
                if role.guard != permission.guard {
                    return Err(AccessError::GuardMismatch {
                        role_guard: role.guard.clone(),
                        permission_guard: permission.guard.clone(),
                    });
                }
                Ok(())
            }
            EdgeKind::PrincipalRole => {
                self.roles.get(&to).ok_or(AccessError::RoleNotFound(to))?;
                Ok(())
            }
            EdgeKind::PrincipalPermission => {
                self.permissions
                    .get(&to)
                    .ok_or(AccessError::PermissionNotFound(to))?;
                Ok(())
            }
        }
    }

    fn permission_name_taken(&self, name: &str, guard: &str, ignore: Option<Uuid>) -> bool {
        self.permissions
            .values()
            .any(|p| p.name == name && p.guard == guard && Some(p.id) != ignore)
    }

    fn role_name_taken(&self, name: &str, guard: &str, ignore: Option<Uuid>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && r.guard == guard && Some(r.id) != ignore)
    }
}

/// In-memory [`EntityStore`] implementation.
///
/// Suitable for tests and single-process deployments; durable backends
/// implement the same trait against their database.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AccessResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AccessError::StorageUnavailable("store lock poisoned".into()))
    }

    fn write(&self) -> AccessResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AccessError::StorageUnavailable("store lock poisoned".into()))
    }
}

impl EntityStore for InMemoryStore {
    fn create_permission(&self, name: &str, guard: &str) -> AccessResult<Permission> {
        let mut tables = self.write()?;
        if tables.permission_name_taken(name, guard, None) {
            return Err(AccessError::DuplicateName {
                name: name.into(),
                guard: guard.into(),
            });
        }
        let permission = Permission::new(name, guard);
        tables.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    fn create_role(&self, name: &str, guard: &str) -> AccessResult<Role> {
        let mut tables = self.write()?;
        if tables.role_name_taken(name, guard, None) {
            return Err(AccessError::DuplicateName {
                name: name.into(),
                guard: guard.into(),
            });
        }
        let role = Role::new(name, guard);
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    fn permission(&self, id: Uuid) -> AccessResult<Permission> {
        self.read()?
            .permissions
            .get(&id)
            .cloned()
            .ok_or(AccessError::PermissionNotFound(id))
    }

    fn role(&self, id: Uuid) -> AccessResult<Role> {
        self.read()?
            .roles
            .get(&id)
            .cloned()
            .ok_or(AccessError::RoleNotFound(id))
    }

    fn permissions(&self) -> AccessResult<Vec<Permission>> {
        let tables = self.read()?;
        let mut all: Vec<Permission> = tables.permissions.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn roles(&self) -> AccessResult<Vec<Role>> {
        let tables = self.read()?;
        let mut all: Vec<Role> = tables.roles.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    fn rename_permission(&self, id: Uuid, new_name: &str) -> AccessResult<Permission> {
        let mut tables = self.write()?;
        let guard = tables
            .permissions
            .get(&id)
            .ok_or(AccessError::PermissionNotFound(id))?
            .guard
            .clone();
        if tables.permission_name_taken(new_name, &guard, Some(id)) {
            return Err(AccessError::DuplicateName {
                name: new_name.into(),
                guard,
            });
        }
        let permission = tables
            .permissions
            .get_mut(&id)
            .ok_or(AccessError::PermissionNotFound(id))?;
        permission.rename(new_name);
        Ok(permission.clone())
    }

    fn rename_role(&self, id: Uuid, new_name: &str) -> AccessResult<Role> {
        let mut tables = self.write()?;
        let guard = tables
            .roles
            .get(&id)
            .ok_or(AccessError::RoleNotFound(id))?
            .guard
            .clone();
        if tables.role_name_taken(new_name, &guard, Some(id)) {
            return Err(AccessError::DuplicateName {
                name: new_name.into(),
                guard,
            });
        }
        let role = tables
            .roles
            .get_mut(&id)
            .ok_or(AccessError::RoleNotFound(id))?;
        role.rename(new_name);
        Ok(role.clone())
    }

    fn delete_permission(&self, id: Uuid) -> AccessResult<()> {
        let mut tables = self.write()?;
        if !tables.permissions.contains_key(&id) {
            return Err(AccessError::PermissionNotFound(id));
        }
        // Reference count inside the same critical section as the delete.
        let count = tables
            .role_permissions
            .iter()
            .filter(|(_, p)| *p == id)
            .count()
            + tables
                .principal_permissions
                .iter()
                .filter(|(_, p)| *p == id)
                .count();
        if count > 0 {
            warn!(permission = %id, count, "refusing to delete referenced permission");
            return Err(AccessError::ReferencedDeleteRejected { count });
        }
        tables.permissions.remove(&id);
        Ok(())
    }

    fn delete_role(&self, id: Uuid) -> AccessResult<()> {
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&id) {
            return Err(AccessError::RoleNotFound(id));
        }
        let count = tables
            .principal_roles
            .iter()
            .filter(|(_, r)| *r == id)
            .count()
            + tables
                .role_permissions
                .iter()
                .filter(|(r, _)| *r == id)
                .count();
        if count > 0 {
            warn!(role = %id, count, "refusing to delete referenced role");
            return Err(AccessError::ReferencedDeleteRejected { count });
        }
        tables.roles.remove(&id);
        Ok(())
    }

    fn grant(&self, kind: EdgeKind, from: Uuid, to: Uuid) -> AccessResult<()> {
        let mut tables = self.write()?;
        tables.validate_edge(kind, from, to)?;
        if tables.edge_set_mut(kind).insert((from, to)) {
            debug!(edge = kind.as_str(), %from, %to, "edge granted");
        }
        Ok(())
    }

    fn revoke(&self, kind: EdgeKind, from: Uuid, to: Uuid) -> AccessResult<()> {
        let mut tables = self.write()?;
        tables.validate_edge(kind, from, to)?;
        if tables.edge_set_mut(kind).remove(&(from, to)) {
            debug!(edge = kind.as_str(), %from, %to, "edge revoked");
        }
        Ok(())
    }

    fn sync(&self, kind: EdgeKind, from: Uuid, to: &[Uuid]) -> AccessResult<()> {
        let mut tables = self.write()?;
        // Validate every target before touching the edge set, so a bad id
        // leaves the previous assignment intact.
        for target in to {
            tables.validate_edge(kind, from, *target)?;
        }
        let edges = tables.edge_set_mut(kind);
        edges.retain(|(f, _)| *f != from);
        edges.extend(to.iter().map(|target| (from, *target)));
        debug!(edge = kind.as_str(), %from, count = to.len(), "edge set replaced");
        Ok(())
    }

    fn edges(&self, kind: EdgeKind) -> AccessResult<Vec<(Uuid, Uuid)>> {
        Ok(self.read()?.edge_set(kind).iter().copied().collect())
    }
}
