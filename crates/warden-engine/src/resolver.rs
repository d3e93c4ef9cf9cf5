//! Permission resolver
//!
//! Computes the effective permission set of a principal within a guard:
//! the union of its directly granted permissions and the permissions of
//! its roles. All reads go through the [`Registrar`] cache; a miss
//! triggers a synchronous rebuild from the store before answering.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AccessResult;
use crate::registrar::{Registrar, Snapshot};
use crate::store::EntityStore;

/// The split view of a principal's permissions, for audit listings.
///
/// `all` is always the union of `direct` and `via_roles`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectivePermissions {
    /// Permissions granted directly to the principal
    pub direct: BTreeSet<String>,

    /// Permissions granted through the principal's roles
    pub via_roles: BTreeSet<String>,

    /// Union of the two
    pub all: BTreeSet<String>,
}

/// Resolves principals' permissions and roles against the cached graph.
#[derive(Clone)]
pub struct Resolver {
    store: Arc<dyn EntityStore>,
    registrar: Arc<Registrar>,
}

impl Resolver {
    /// Create a resolver over a store and its registrar cache.
    pub fn new(store: Arc<dyn EntityStore>, registrar: Arc<Registrar>) -> Self {
        Self { store, registrar }
    }

    fn snapshot(&self) -> AccessResult<Arc<Snapshot>> {
        self.registrar.current(self.store.as_ref())
    }

    /// The principal's effective permission set in `guard`:
    /// direct grants ∪ role-derived grants.
    pub fn resolve_effective(&self, principal: Uuid, guard: &str) -> AccessResult<BTreeSet<String>> {
        let snapshot = self.snapshot()?;
        let mut all = snapshot.direct_permissions(principal, guard);
        all.extend(snapshot.permissions_via_roles(principal, guard));
        Ok(all)
    }

    /// Permissions granted directly to the principal in `guard`.
    pub fn direct_permissions(&self, principal: Uuid, guard: &str) -> AccessResult<BTreeSet<String>> {
        Ok(self.snapshot()?.direct_permissions(principal, guard))
    }

    /// Permissions the principal holds through roles in `guard`.
    pub fn permissions_via_roles(
        &self,
        principal: Uuid,
        guard: &str,
    ) -> AccessResult<BTreeSet<String>> {
        Ok(self.snapshot()?.permissions_via_roles(principal, guard))
    }

    /// Both split views and their union, in one consistent snapshot read.
    pub fn list_effective(&self, principal: Uuid, guard: &str) -> AccessResult<EffectivePermissions> {
        let snapshot = self.snapshot()?;
        let direct = snapshot.direct_permissions(principal, guard);
        let via_roles = snapshot.permissions_via_roles(principal, guard);
        let all = direct.union(&via_roles).cloned().collect();
        Ok(EffectivePermissions {
            direct,
            via_roles,
            all,
        })
    }

    /// Membership test against the effective permission set.
    pub fn has_permission(
        &self,
        principal: Uuid,
        permission_name: &str,
        guard: &str,
    ) -> AccessResult<bool> {
        let snapshot = self.snapshot()?;
        Ok(snapshot
            .direct_permissions(principal, guard)
            .contains(permission_name)
            || snapshot
                .permissions_via_roles(principal, guard)
                .contains(permission_name))
    }

    /// Direct role membership test, guard-scoped.
    pub fn has_role(&self, principal: Uuid, role_name: &str, guard: &str) -> AccessResult<bool> {
        Ok(self.snapshot()?.has_role(principal, role_name, guard))
    }

    /// OR over a list of role names.
    pub fn has_any_role(
        &self,
        principal: Uuid,
        role_names: &[&str],
        guard: &str,
    ) -> AccessResult<bool> {
        let snapshot = self.snapshot()?;
        Ok(role_names
            .iter()
            .any(|name| snapshot.has_role(principal, name, guard)))
    }

    /// AND over a list of role names.
    pub fn has_all_roles(
        &self,
        principal: Uuid,
        role_names: &[&str],
        guard: &str,
    ) -> AccessResult<bool> {
        let snapshot = self.snapshot()?;
        Ok(role_names
            .iter()
            .all(|name| snapshot.has_role(principal, name, guard)))
    }

    /// Names of the principal's roles in `guard`.
    pub fn role_names(&self, principal: Uuid, guard: &str) -> AccessResult<BTreeSet<String>> {
        Ok(self.snapshot()?.role_names(principal, guard))
    }
}
