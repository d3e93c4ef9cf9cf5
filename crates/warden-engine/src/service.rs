//! Warden facade
//!
//! [`Warden`] wires the store, registrar cache, resolver, and gate into
//! the single surface the surrounding application talks to. Every
//! mutation writes the store and then synchronously invalidates the
//! registrar before returning, so a check issued after a completed
//! mutation always observes the new state.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::error;
use uuid::Uuid;
use warden_model::{group_by_module, EdgeKind, Permission, PermissionGroup, Role};

use crate::error::AccessResult;
use crate::gate::{Decision, Gate, PrincipalSource, Requirement};
use crate::registrar::Registrar;
use crate::resolver::{EffectivePermissions, Resolver};
use crate::store::{EntityStore, InMemoryStore};

/// The authorization core's external interface.
///
/// Cheap to clone; clones share the same store and cache.
#[derive(Clone)]
pub struct Warden {
    store: Arc<dyn EntityStore>,
    registrar: Arc<Registrar>,
    resolver: Resolver,
    gate: Gate,
}

impl Warden {
    /// Wire the engine over a storage collaborator.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let registrar = Arc::new(Registrar::new());
        let resolver = Resolver::new(store.clone(), registrar.clone());
        let gate = Gate::new(resolver.clone());
        Self {
            store,
            registrar,
            resolver,
            gate,
        }
    }

    /// Engine over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    /// Run a store mutation, then invalidate the cache before returning.
    fn mutate<T>(&self, op: impl FnOnce(&dyn EntityStore) -> AccessResult<T>) -> AccessResult<T> {
        match op(self.store.as_ref()) {
            Ok(value) => {
                self.registrar.invalidate();
                Ok(value)
            }
            Err(err) => {
                if err.is_server_error() {
                    error!(code = err.error_code(), %err, "store mutation failed");
                }
                Err(err)
            }
        }
    }

    // --- entity administration ---

    /// Create a permission under a guard.
    pub fn create_permission(&self, name: &str, guard: &str) -> AccessResult<Permission> {
        self.mutate(|store| store.create_permission(name, guard))
    }

    /// Create a role under a guard.
    pub fn create_role(&self, name: &str, guard: &str) -> AccessResult<Role> {
        self.mutate(|store| store.create_role(name, guard))
    }

    /// Rename a permission.
    pub fn rename_permission(&self, id: Uuid, new_name: &str) -> AccessResult<Permission> {
        self.mutate(|store| store.rename_permission(id, new_name))
    }

    /// Rename a role.
    pub fn rename_role(&self, id: Uuid, new_name: &str) -> AccessResult<Role> {
        self.mutate(|store| store.rename_role(id, new_name))
    }

    /// Delete a permission; refused while any edge references it.
    pub fn delete_permission(&self, id: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.delete_permission(id))
    }

    /// Delete a role; refused while any edge references it.
    pub fn delete_role(&self, id: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.delete_role(id))
    }

    /// Look up a permission by id.
    pub fn permission(&self, id: Uuid) -> AccessResult<Permission> {
        self.store.permission(id)
    }

    /// Look up a role by id.
    pub fn role(&self, id: Uuid) -> AccessResult<Role> {
        self.store.role(id)
    }

    /// List all permissions, name-sorted.
    pub fn permissions(&self) -> AccessResult<Vec<Permission>> {
        self.store.permissions()
    }

    /// List all roles, name-sorted.
    pub fn roles(&self) -> AccessResult<Vec<Role>> {
        self.store.roles()
    }

    // --- role ↔ permission grants ---

    /// Grant a permission to a role. Guards must match.
    pub fn give_permission_to_role(&self, role: Uuid, permission: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.grant(EdgeKind::RolePermission, role, permission))
    }

    /// Revoke a permission from a role.
    pub fn revoke_permission_from_role(&self, role: Uuid, permission: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.revoke(EdgeKind::RolePermission, role, permission))
    }

    /// Replace a role's permission set wholesale.
    pub fn sync_role_permissions(&self, role: Uuid, permissions: &[Uuid]) -> AccessResult<()> {
        self.mutate(|store| store.sync(EdgeKind::RolePermission, role, permissions))
    }

    // --- principal grants ---

    /// Assign a role to a principal.
    pub fn grant_role(&self, principal: Uuid, role: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.grant(EdgeKind::PrincipalRole, principal, role))
    }

    /// Remove a role from a principal.
    pub fn revoke_role(&self, principal: Uuid, role: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.revoke(EdgeKind::PrincipalRole, principal, role))
    }

    /// Replace a principal's role set wholesale.
    pub fn sync_roles(&self, principal: Uuid, roles: &[Uuid]) -> AccessResult<()> {
        self.mutate(|store| store.sync(EdgeKind::PrincipalRole, principal, roles))
    }

    /// Grant a permission directly to a principal.
    pub fn grant_permission(&self, principal: Uuid, permission: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.grant(EdgeKind::PrincipalPermission, principal, permission))
    }

    /// Remove a direct permission from a principal.
    pub fn revoke_permission(&self, principal: Uuid, permission: Uuid) -> AccessResult<()> {
        self.mutate(|store| store.revoke(EdgeKind::PrincipalPermission, principal, permission))
    }

    /// Replace a principal's direct permission set wholesale.
    pub fn sync_permissions(&self, principal: Uuid, permissions: &[Uuid]) -> AccessResult<()> {
        self.mutate(|store| store.sync(EdgeKind::PrincipalPermission, principal, permissions))
    }

    // --- checks ---

    /// Evaluate one requirement for an optionally-bound principal.
    pub fn check(
        &self,
        principal: Option<Uuid>,
        requirement: &Requirement,
        guard: &str,
    ) -> AccessResult<Decision> {
        self.gate.check(principal, requirement, guard)
    }

    /// Evaluate stacked requirements with AND semantics.
    pub fn check_all(
        &self,
        principal: Option<Uuid>,
        requirements: &[Requirement],
        guard: &str,
    ) -> AccessResult<Decision> {
        self.gate.check_all(principal, requirements, guard)
    }

    /// Evaluate a requirement for the collaborator-bound principal.
    pub fn check_source(
        &self,
        source: &dyn PrincipalSource,
        requirement: &Requirement,
    ) -> AccessResult<Decision> {
        self.gate.check_source(source, requirement)
    }

    /// The resolver, for direct permission/role queries.
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Both split permission views and their union.
    pub fn list_effective(&self, principal: Uuid, guard: &str) -> AccessResult<EffectivePermissions> {
        self.resolver.list_effective(principal, guard)
    }

    // --- reporting ---

    /// All permissions grouped by module, for audit listings.
    ///
    /// Read-model only; enforcement never consults this.
    pub fn grouped_report(&self) -> AccessResult<BTreeMap<String, PermissionGroup>> {
        Ok(group_by_module(&self.store.permissions()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;

    fn seeded() -> (Warden, Uuid, Role) {
        let warden = Warden::in_memory();
        let role = warden.create_role("Editor", "web").unwrap();
        let edit = warden.create_permission("edit-posts", "web").unwrap();
        let view = warden.create_permission("view-posts", "web").unwrap();
        warden
            .sync_role_permissions(role.id, &[edit.id, view.id])
            .unwrap();
        let principal = Uuid::now_v7();
        warden.grant_role(principal, role.id).unwrap();
        (warden, principal, role)
    }

    #[test]
    fn test_grant_then_check_reads_own_write() {
        let (warden, principal, _) = seeded();
        // Warm the cache with a resolution first.
        assert!(warden
            .check(Some(principal), &Requirement::role("Editor"), "web")
            .unwrap()
            .is_allowed());

        let publish = warden.create_permission("publish-posts", "web").unwrap();
        warden.grant_permission(principal, publish.id).unwrap();

        // No stale read: the grant completed, so the check must see it.
        assert!(warden
            .check(
                Some(principal),
                &Requirement::permission("publish-posts"),
                "web"
            )
            .unwrap()
            .is_allowed());
    }

    #[test]
    fn test_revoke_then_check_reads_own_write() {
        let (warden, principal, role) = seeded();
        assert!(warden
            .check(Some(principal), &Requirement::role("Editor"), "web")
            .unwrap()
            .is_allowed());

        warden.revoke_role(principal, role.id).unwrap();
        let decision = warden
            .check(Some(principal), &Requirement::role("Editor"), "web")
            .unwrap();
        assert_eq!(
            decision,
            Decision::Forbidden {
                requirement: Requirement::role("Editor")
            }
        );
    }

    #[test]
    fn test_rename_invalidates_cached_decisions() {
        let (warden, principal, role) = seeded();
        assert!(warden
            .check(Some(principal), &Requirement::role("Editor"), "web")
            .unwrap()
            .is_allowed());

        warden.rename_role(role.id, "Author").unwrap();
        assert!(!warden
            .check(Some(principal), &Requirement::role("Editor"), "web")
            .unwrap()
            .is_allowed());
        assert!(warden
            .check(Some(principal), &Requirement::role("Author"), "web")
            .unwrap()
            .is_allowed());
    }

    #[test]
    fn test_duplicate_grants_leave_effective_set_unchanged() {
        let (warden, principal, role) = seeded();
        let before = warden.list_effective(principal, "web").unwrap();
        warden.grant_role(principal, role.id).unwrap();
        warden.grant_role(principal, role.id).unwrap();
        let after = warden.list_effective(principal, "web").unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_delete_role_guarded_until_unreferenced() {
        let (warden, principal, role) = seeded();
        let err = warden.delete_role(role.id).unwrap_err();
        assert!(matches!(err, AccessError::ReferencedDeleteRejected { .. }));

        warden.revoke_role(principal, role.id).unwrap();
        warden.sync_role_permissions(role.id, &[]).unwrap();
        warden.delete_role(role.id).unwrap();
        assert!(warden.roles().unwrap().is_empty());
    }

    #[test]
    fn test_sync_roles_diff_applies_atomically() {
        let (warden, principal, role) = seeded();
        let sales = warden.create_role("Sales", "web").unwrap();
        warden.sync_roles(principal, &[sales.id]).unwrap();

        let names = warden.resolver().role_names(principal, "web").unwrap();
        assert!(names.contains("Sales"));
        assert!(!names.contains("Editor"));
        let _ = role;
    }

    #[test]
    fn test_grouped_report_reflects_live_permissions() {
        let (warden, _, _) = seeded();
        warden.create_permission("view-users", "web").unwrap();
        let report = warden.grouped_report().unwrap();
        let labels: Vec<&str> = report.keys().map(String::as_str).collect();
        assert_eq!(labels, ["Posts", "Users"]);
        assert_eq!(report["Posts"].count, 2);
    }

    #[test]
    fn test_check_without_principal_is_unauthenticated() {
        let (warden, _, _) = seeded();
        assert_eq!(
            warden
                .check(None, &Requirement::permission("edit-posts"), "web")
                .unwrap(),
            Decision::Unauthenticated
        );
    }
}
