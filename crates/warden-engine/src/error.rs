//! Error types for authorization operations
//!
//! This module defines all recoverable errors the engine returns to the
//! administrative caller. Enforcement outcomes (`Allowed` / `Forbidden` /
//! `Unauthenticated`) are not errors; they are [`crate::gate::Decision`]
//! values.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;
use uuid::Uuid;

/// Authorization engine error types.
///
/// All variants are recoverable results returned to the caller; nothing
/// here is fatal to the process. Storage connectivity failures surface as
/// [`AccessError::StorageUnavailable`] and are never swallowed.
#[derive(Debug, Error)]
pub enum AccessError {
    /// A referenced permission id does not resolve
    #[error("Permission not found: {0}")]
    PermissionNotFound(Uuid),

    /// A referenced role id does not resolve
    #[error("Role not found: {0}")]
    RoleNotFound(Uuid),

    /// Name already taken within the guard
    #[error("Name '{name}' already exists for guard '{guard}'")]
    DuplicateName {
        /// The conflicting name
        name: String,
        /// The guard the conflict occurred in
        guard: String,
    },

    /// Delete refused because live edges still reference the entity
    #[error("Cannot delete: still referenced by {count} assignment(s)")]
    ReferencedDeleteRejected {
        /// Number of live edges referencing the entity
        count: usize,
    },

    /// A role and a permission from different guards were paired
    #[error("Guard mismatch: role guard '{role_guard}' vs permission guard '{permission_guard}'")]
    GuardMismatch {
        /// Guard of the role side
        role_guard: String,
        /// Guard of the permission side
        permission_guard: String,
    },

    /// The durable storage collaborator is unreachable or unusable
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

/// Result type for authorization operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::PermissionNotFound(_) | AccessError::RoleNotFound(_) => "NOT_FOUND",
            AccessError::DuplicateName { .. } => "DUPLICATE_NAME",
            AccessError::ReferencedDeleteRejected { .. } => "REFERENCED_DELETE_REJECTED",
            AccessError::GuardMismatch { .. } => "GUARD_MISMATCH",
            AccessError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    /// Check if this error should be logged at error level.
    ///
    /// Validation failures are expected and should not be logged as
    /// errors; storage outages should.
    pub fn is_server_error(&self) -> bool {
        matches!(self, AccessError::StorageUnavailable(_))
    }
}

/// Serializes as `{ "code": …, "message": … }` so the surrounding
/// application can ship engine errors over its API layer unchanged.
impl Serialize for AccessError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("AccessError", 2)?;
        state.serialize_field("code", self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}
