//! Permission grouping for audit listings
//!
//! Derives a human-oriented grouping of permissions from the
//! `action-module` naming convention. This is a pure read-model transform
//! for audit and admin listings; enforcement never consults it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::Permission;

/// Module key used when a permission name has no `-` separator.
pub const GENERAL_MODULE: &str = "general";

/// Action used when a permission name has no `-` separator.
pub const OTHER_ACTION: &str = "other";

/// A permission as it appears inside a [`PermissionGroup`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupedPermission {
    /// Permission ID
    pub id: Uuid,

    /// Full permission name (e.g. `"edit-posts"`)
    pub name: String,

    /// Action part of the name (e.g. `"edit"`)
    pub action: String,

    /// Module part of the name (e.g. `"posts"`)
    pub module: String,

    /// Guard the permission belongs to
    pub guard: String,
}

/// A group of permissions sharing a module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionGroup {
    /// Display label for the group (title-cased module)
    pub group_name: String,

    /// Member permissions, in input order
    pub permissions: Vec<GroupedPermission>,

    /// Number of member permissions
    pub count: usize,
}

/// Group permissions by the module part of their name.
///
/// Each name is split on its first `-` into `(action, module)`. A name
/// without a separator falls into the `"general"` module with action
/// `"other"`. The group label is the module title-cased with hyphens
/// replaced by spaces, and the returned map iterates labels in
/// lexicographic order.
///
/// # Examples
///
/// ```
/// use warden_model::{group_by_module, Permission};
///
/// let perms = vec![
///     Permission::new("edit-posts", "web"),
///     Permission::new("view-users", "web"),
/// ];
/// let groups = group_by_module(&perms);
/// let labels: Vec<&str> = groups.keys().map(String::as_str).collect();
/// assert_eq!(labels, ["Posts", "Users"]);
/// assert_eq!(groups["Posts"].permissions[0].action, "edit");
/// ```
pub fn group_by_module(permissions: &[Permission]) -> BTreeMap<String, PermissionGroup> {
    let mut grouped: BTreeMap<String, PermissionGroup> = BTreeMap::new();

    for permission in permissions {
        let (action, module) = split_name(&permission.name);
        let label = title_case(&module);

        let group = grouped
            .entry(label.clone())
            .or_insert_with(|| PermissionGroup {
                group_name: label,
                permissions: Vec::new(),
                count: 0,
            });

        group.permissions.push(GroupedPermission {
            id: permission.id,
            name: permission.name.clone(),
            action,
            module,
            guard: permission.guard.clone(),
        });
        group.count += 1;
    }

    grouped
}

/// Split a permission name on its first `-` into `(action, module)`.
fn split_name(name: &str) -> (String, String) {
    match name.split_once('-') {
        Some((action, module)) => (action.to_string(), module.to_string()),
        None => (OTHER_ACTION.to_string(), GENERAL_MODULE.to_string()),
    }
}

/// Title-case a module key for display: hyphens become spaces and each
/// word's first letter is uppercased (`"user-settings"` → `"User Settings"`).
fn title_case(module: &str) -> String {
    module
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
