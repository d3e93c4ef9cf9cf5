//! RBAC entity records
//!
//! This module defines the durable entities of the authorization graph:
//! permissions, roles, and the kinds of many-to-many edges that connect
//! them to each other and to principals.
//!
//! Identity for both permissions and roles is the `(name, guard)` pair;
//! the same name may exist independently under different guards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Guard used when the surrounding application does not specify one.
///
/// Guards partition the authorization graph by authentication context
/// (e.g. `"web"` vs `"api"`); a role and a permission interoperate only
/// when their guards match.
pub const DEFAULT_GUARD: &str = "web";

/// A named permission scoped to a guard.
///
/// Permissions follow the `action-module` naming convention
/// (e.g. `"edit-posts"`, `"view-users"`), which the reporting view in
/// [`crate::grouping`] relies on. Enforcement only ever compares full names.
///
/// # Examples
///
/// ```
/// use warden_model::{Permission, DEFAULT_GUARD};
///
/// let perm = Permission::new("edit-posts", DEFAULT_GUARD);
/// assert_eq!(perm.name, "edit-posts");
/// assert_eq!(perm.guard, "web");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    /// Unique permission ID
    pub id: Uuid,

    /// Permission name, unique within its guard
    pub name: String,

    /// Guard this permission belongs to
    pub guard: String,

    /// When the permission was created
    pub created_at: DateTime<Utc>,

    /// When the permission was last renamed
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Creates a new permission with a generated UUID v7 id.
    ///
    /// # Arguments
    ///
    /// * `name` - The permission name
    /// * `guard` - The guard scope
    pub fn new(name: impl Into<String>, guard: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            guard: guard.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Renames the permission, touching `updated_at`.
    ///
    /// Uniqueness of the new name within the guard is the store's
    /// responsibility, not the record's.
    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
        self.updated_at = Utc::now();
    }
}

/// A named role scoped to a guard.
///
/// Roles own a set of permissions through role-permission edges; the
/// membership itself lives in the store, not on this record.
///
/// # Examples
///
/// ```
/// use warden_model::Role;
///
/// let role = Role::new("Editor", "web");
/// assert_eq!(role.name, "Editor");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    /// Unique role ID
    pub id: Uuid,

    /// Role name, unique within its guard
    pub name: String,

    /// Guard this role belongs to
    pub guard: String,

    /// When the role was created
    pub created_at: DateTime<Utc>,

    /// When the role was last renamed
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Creates a new role with a generated UUID v7 id.
    pub fn new(name: impl Into<String>, guard: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            guard: guard.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Renames the role, touching `updated_at`.
    pub fn rename(&mut self, new_name: impl Into<String>) {
        self.name = new_name.into();
        self.updated_at = Utc::now();
    }
}

/// The kinds of many-to-many edges in the authorization graph.
///
/// Every edge is unique on its `(from, to)` pair; assigning an edge that
/// already exists is an idempotent no-op.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Role → Permission grant (guards must match)
    RolePermission,

    /// Principal → Role membership
    PrincipalRole,

    /// Principal → Permission direct grant
    PrincipalPermission,
}

impl EdgeKind {
    /// Get string representation of the edge kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RolePermission => "role_permission",
            Self::PrincipalRole => "principal_role",
            Self::PrincipalPermission => "principal_permission",
        }
    }
}
