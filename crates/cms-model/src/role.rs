//! Role domain model
//!
//! Roles are permission-bearing groups. They may nest through `sub_roles`,
//! and stored data is allowed to contain cycles, which consumers must
//! tolerate.

use serde::{Deserialize, Serialize};

/// Role identifier.
pub type RoleId = i64;

/// A stored role record.
///
/// Every list field is a contribution merged into the principal's effective
/// data when the role is part of the expanded role set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    /// Role ID
    pub id: RoleId,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Hidden roles are ignored as if absent
    #[serde(default)]
    pub hidden: bool,

    /// Nested role IDs (may be cyclic in malformed data)
    #[serde(default)]
    pub sub_roles: Vec<RoleId>,

    /// Tables whose records may be listed
    #[serde(default)]
    pub tables_select: Vec<String>,

    /// Tables whose records may be modified
    #[serde(default)]
    pub tables_modify: Vec<String>,

    /// Page types that may be used
    #[serde(default)]
    pub page_types: Vec<String>,

    /// `table:field` entries exempt from field exclusion
    #[serde(default)]
    pub non_exclude_fields: Vec<String>,

    /// Explicit `table:field:value:ALLOW|DENY` entries
    #[serde(default)]
    pub explicit_allow_deny: Vec<String>,

    /// Language IDs that may be edited
    #[serde(default)]
    pub allowed_languages: Vec<i64>,

    /// Custom option keys
    #[serde(default)]
    pub custom_options: Vec<String>,

    /// Backend module keys
    #[serde(default)]
    pub modules: Vec<String>,

    /// Web-mount roots
    #[serde(default)]
    pub db_mountpoints: Vec<i64>,

    /// File-mount IDs
    #[serde(default)]
    pub file_mountpoints: Vec<i64>,

    /// File permission keys
    #[serde(default)]
    pub file_permissions: Vec<String>,

    /// Workspace permission bits, OR-ed across expanded roles
    #[serde(default)]
    pub workspace_perms: u8,

    /// Opaque layered configuration contributed by the role
    #[serde(default)]
    pub config: String,
}

impl Role {
    /// Creates an empty, visible role.
    ///
    /// # Examples
    ///
    /// ```
    /// use cms_model::Role;
    ///
    /// let editors = Role::new(4, "Editors").with_sub_roles([5, 6]);
    /// assert_eq!(editors.sub_roles, vec![5, 6]);
    /// assert!(!editors.hidden);
    /// ```
    pub fn new(id: RoleId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            ..Self::default()
        }
    }

    /// Set the nested roles.
    pub fn with_sub_roles(mut self, sub_roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.sub_roles = sub_roles.into_iter().collect();
        self
    }

    /// Set the web-mount roots.
    pub fn with_db_mountpoints(mut self, mounts: impl IntoIterator<Item = i64>) -> Self {
        self.db_mountpoints = mounts.into_iter().collect();
        self
    }

    /// Set the workspace permission bits.
    pub fn with_workspace_perms(mut self, bits: u8) -> Self {
        self.workspace_perms = bits;
        self
    }
}
