//! # Warden Model
//!
//! Shared RBAC vocabulary for the Warden authorization core.
//!
//! ## Overview
//!
//! This crate defines the durable entities of the authorization graph and
//! the reporting views derived from them:
//! - **Permissions**: named grants scoped to a guard
//! - **Roles**: named permission collections scoped to a guard
//! - **Edges**: the many-to-many associations connecting roles,
//!   permissions, and principals
//! - **Grouping**: the audit-facing module grouping of permissions
//!
//! ## Guards
//!
//! A guard is a named scope partitioning the whole graph by authentication
//! context. `"web"` and `"api"` may each have an `"edit-posts"` permission;
//! the two never satisfy each other's checks. Resolution and enforcement
//! always take the guard explicitly.
//!
//! ## Naming convention
//!
//! Permission names follow `action-module` (`"edit-posts"`, `"view-users"`,
//! `"approve-orders"`). Enforcement compares full names only; the grouping
//! view in [`grouping`] uses the convention to build audit listings.
//!
//! ## Usage
//!
//! ```rust
//! use warden_model::{group_by_module, Permission, Role, DEFAULT_GUARD};
//!
//! let role = Role::new("Editor", DEFAULT_GUARD);
//! let perm = Permission::new("edit-posts", DEFAULT_GUARD);
//! assert_eq!(role.guard, perm.guard);
//!
//! let groups = group_by_module(&[perm]);
//! assert!(groups.contains_key("Posts"));
//! ```
//!
//! The storage contract, cache, resolver, and enforcement gate live in
//! `warden-engine`.

pub mod entities;
pub mod grouping;

// Re-export main types for convenience
pub use entities::{EdgeKind, Permission, Role, DEFAULT_GUARD};
pub use grouping::{group_by_module, GroupedPermission, PermissionGroup};
