//! # Warden Engine
//!
//! The authorization engine of the Warden RBAC core: storage contract,
//! registrar cache, permission resolver, and enforcement gate.
//!
//! ## Architecture
//!
//! ```text
//! Gate → Resolver → Registrar (cached snapshot) → EntityStore (rebuild)
//!
//! mutations: Warden → EntityStore → Registrar::invalidate()
//! ```
//!
//! - [`store::EntityStore`] is the durable-storage contract (a synchronous
//!   trait; [`store::InMemoryStore`] is the reference implementation).
//! - [`registrar::Registrar`] caches an immutable snapshot of the whole
//!   role/permission graph and swaps it atomically; every mutation
//!   invalidates it before returning, so checks read their own writes.
//! - [`resolver::Resolver`] computes effective permission sets (direct ∪
//!   via-roles) within one guard.
//! - [`gate::Gate`] is the per-operation boundary check, yielding
//!   `Allowed`, `Forbidden`, or `Unauthenticated`.
//! - [`service::Warden`] is the facade the surrounding application wires
//!   in.
//!
//! ## Usage
//!
//! ```rust
//! use uuid::Uuid;
//! use warden_engine::{Requirement, Warden};
//!
//! let warden = Warden::in_memory();
//! let role = warden.create_role("Editor", "web").unwrap();
//! let perm = warden.create_permission("edit-posts", "web").unwrap();
//! warden.give_permission_to_role(role.id, perm.id).unwrap();
//!
//! let user = Uuid::now_v7();
//! warden.grant_role(user, role.id).unwrap();
//!
//! let decision = warden
//!     .check(Some(user), &Requirement::permission("edit-posts"), "web")
//!     .unwrap();
//! assert!(decision.is_allowed());
//! ```
//!
//! ## Guards
//!
//! Every resolution takes the guard explicitly; nothing is inferred from
//! ambient state. A role and a permission interoperate only when their
//! guards match, and a check under one guard never sees grants made under
//! another.

pub mod error;
pub mod gate;
pub mod registrar;
pub mod resolver;
pub mod service;
pub mod store;

// Re-export main types for convenience
pub use error::{AccessError, AccessResult};
pub use gate::{AuthenticatedPrincipal, Decision, Gate, PrincipalSource, Requirement};
pub use registrar::{Registrar, Snapshot};
pub use resolver::{EffectivePermissions, Resolver};
pub use service::Warden;
pub use store::{EntityStore, InMemoryStore};

pub use warden_model::{
    group_by_module, EdgeKind, GroupedPermission, Permission, PermissionGroup, Role, DEFAULT_GUARD,
};
