//! Role expansion
//!
//! Resolves a principal's directly assigned roles into the full transitive
//! role set and merges every included role's contributions.
//!
//! Sub-roles are expanded depth-first *before* the including role's own
//! contributions are taken, so a role always lands after everything it
//! includes. The final role order keeps the last occurrence of each ID, which
//! lets configuration layered in that order be overridden by the roles that
//! include it.

use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::pin::Pin;

use cms_model::{AccessResult, MountOptions, Principal, RecordStore, Role, RoleId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::permissions::WorkspacePermission;

/// String lists that [`ExpandedRoles::check`] can be asked about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataList {
    /// Tables whose records may be listed
    TablesSelect,
    /// Tables whose records may be modified
    TablesModify,
    /// Usable page types
    PageTypes,
    /// Fields exempt from exclusion
    NonExcludeFields,
    /// Explicit allow/deny entries
    ExplicitAllowDeny,
    /// Custom option keys
    CustomOptions,
    /// Backend modules
    Modules,
    /// File permission keys
    FilePermissions,
}

/// Contributions merged from the principal and every expanded role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleDataLists {
    /// Tables whose records may be listed
    pub tables_select: BTreeSet<String>,
    /// Tables whose records may be modified
    pub tables_modify: BTreeSet<String>,
    /// Usable page types
    pub page_types: BTreeSet<String>,
    /// Fields exempt from exclusion
    pub non_exclude_fields: BTreeSet<String>,
    /// Explicit allow/deny entries
    pub explicit_allow_deny: BTreeSet<String>,
    /// Allowed language IDs
    pub allowed_languages: BTreeSet<i64>,
    /// Custom option keys
    pub custom_options: BTreeSet<String>,
    /// Backend modules
    pub modules: BTreeSet<String>,
    /// File permission keys
    pub file_permissions: BTreeSet<String>,
    /// Web-mount roots, first occurrence order
    pub webmounts: Vec<i64>,
    /// File mounts, first occurrence order
    pub file_mounts: Vec<i64>,
    /// Workspace permissions
    pub workspace_perms: WorkspacePermission,
}

impl RoleDataLists {
    /// Seed the lists with the principal's own values.
    pub fn for_principal(principal: &Principal) -> Self {
        let mut lists = Self {
            allowed_languages: principal.allowed_languages.iter().copied().collect(),
            file_permissions: principal.file_permissions.iter().cloned().collect(),
            workspace_perms: WorkspacePermission::from_stored(principal.workspace_perms),
            ..Self::default()
        };
        extend_unique(&mut lists.webmounts, &principal.webmounts);
        extend_unique(&mut lists.file_mounts, &principal.file_mounts);
        lists
    }

    /// Merge one role's contributions.
    fn absorb(&mut self, role: &Role, options: MountOptions) {
        self.tables_select.extend(role.tables_select.iter().cloned());
        self.tables_modify.extend(role.tables_modify.iter().cloned());
        self.page_types.extend(role.page_types.iter().cloned());
        self.non_exclude_fields
            .extend(role.non_exclude_fields.iter().cloned());
        self.explicit_allow_deny
            .extend(role.explicit_allow_deny.iter().cloned());
        self.allowed_languages
            .extend(role.allowed_languages.iter().copied());
        self.custom_options.extend(role.custom_options.iter().cloned());
        self.modules.extend(role.modules.iter().cloned());
        self.file_permissions
            .extend(role.file_permissions.iter().cloned());
        if options.role_webmounts {
            extend_unique(&mut self.webmounts, &role.db_mountpoints);
        }
        if options.role_file_mounts {
            extend_unique(&mut self.file_mounts, &role.file_mountpoints);
        }
        self.workspace_perms |= WorkspacePermission::from_stored(role.workspace_perms);
    }

    /// Get one of the string lists.
    pub fn list(&self, list: DataList) -> &BTreeSet<String> {
        match list {
            DataList::TablesSelect => &self.tables_select,
            DataList::TablesModify => &self.tables_modify,
            DataList::PageTypes => &self.page_types,
            DataList::NonExcludeFields => &self.non_exclude_fields,
            DataList::ExplicitAllowDeny => &self.explicit_allow_deny,
            DataList::CustomOptions => &self.custom_options,
            DataList::Modules => &self.modules,
            DataList::FilePermissions => &self.file_permissions,
        }
    }
}

fn extend_unique(target: &mut Vec<i64>, values: &[i64]) {
    for value in values {
        if !target.contains(value) {
            target.push(*value);
        }
    }
}

/// Opaque configuration contributed by one included role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfigLayer {
    /// Contributing role
    pub role_id: RoleId,
    /// Raw configuration text
    pub config: String,
}

/// Result of expanding a principal's roles.
///
/// # Examples
///
/// ```
/// use cms_rbac::ExpandedRoles;
///
/// let roles = ExpandedRoles::default();
/// assert!(!roles.contains(3));
/// assert!(roles.check_language_access(-1));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpandedRoles {
    /// Whether the principal is an administrator
    pub admin: bool,
    /// Effective role IDs, last occurrence order
    pub role_ids: Vec<RoleId>,
    /// Every inclusion, in the order it happened
    pub inclusion_order: Vec<RoleId>,
    /// Recursion path each inclusion happened under
    pub include_hierarchy: Vec<Vec<RoleId>>,
    /// First directly assigned role that was included
    pub first_main_role: Option<RoleId>,
    /// Per-role configuration, in inclusion order
    pub config_layers: Vec<ConfigLayer>,
    /// Merged contributions
    pub data: RoleDataLists,
}

impl ExpandedRoles {
    /// Check membership of a role (directly or through nesting).
    pub fn contains(&self, role_id: RoleId) -> bool {
        role_id != 0 && self.role_ids.contains(&role_id)
    }

    /// Check a value against one of the merged lists.
    ///
    /// Administrators pass every check.
    pub fn check(&self, list: DataList, value: &str) -> bool {
        self.admin || self.data.list(list).contains(value)
    }

    /// Check access to a language.
    ///
    /// `-1` stands for "all languages" and is always allowed, as is every
    /// language when no restriction was configured.
    pub fn check_language_access(&self, language: i64) -> bool {
        if self.admin || language == -1 || self.data.allowed_languages.is_empty() {
            return true;
        }
        self.data.allowed_languages.contains(&language)
    }
}

/// Mutable state threaded through one expansion.
struct ExpansionState {
    options: MountOptions,
    inclusion_order: Vec<RoleId>,
    include_hierarchy: Vec<Vec<RoleId>>,
    first_main_role: Option<RoleId>,
    config_layers: Vec<ConfigLayer>,
    data: RoleDataLists,
}

impl ExpansionState {
    fn include(&mut self, role: &Role, path: &[RoleId]) {
        self.data.absorb(role, self.options);
        self.inclusion_order.push(role.id);
        self.include_hierarchy.push(path.to_vec());
        if !role.config.trim().is_empty() {
            self.config_layers.push(ConfigLayer {
                role_id: role.id,
                config: role.config.clone(),
            });
        }
        if path.is_empty() && self.first_main_role.is_none() {
            self.first_main_role = Some(role.id);
        }
    }

    fn finish(self, admin: bool) -> ExpandedRoles {
        ExpandedRoles {
            admin,
            role_ids: last_occurrence_order(&self.inclusion_order),
            inclusion_order: self.inclusion_order,
            include_hierarchy: self.include_hierarchy,
            first_main_role: self.first_main_role,
            config_layers: self.config_layers,
            data: self.data,
        }
    }
}

/// De-duplicate keeping the last occurrence of every ID.
fn last_occurrence_order(ids: &[RoleId]) -> Vec<RoleId> {
    let mut seen = HashSet::new();
    let mut ordered: Vec<RoleId> = ids
        .iter()
        .rev()
        .filter(|id| seen.insert(**id))
        .copied()
        .collect();
    ordered.reverse();
    ordered
}

type LevelFuture<'a> = Pin<Box<dyn Future<Output = AccessResult<()>> + Send + 'a>>;

/// Expands role memberships against the store.
pub struct RoleExpander<'s> {
    store: &'s dyn RecordStore,
}

impl<'s> RoleExpander<'s> {
    /// Creates an expander reading from `store`.
    pub fn new(store: &'s dyn RecordStore) -> Self {
        Self { store }
    }

    /// Expand a bare list of role IDs.
    ///
    /// Mounts of every role are included and no principal data is seeded.
    pub async fn expand(&self, direct: &[RoleId]) -> AccessResult<ExpandedRoles> {
        let mut state = ExpansionState {
            options: MountOptions::default(),
            inclusion_order: Vec::new(),
            include_hierarchy: Vec::new(),
            first_main_role: None,
            config_layers: Vec::new(),
            data: RoleDataLists::default(),
        };
        self.expand_level(direct, Vec::new(), &mut state).await?;
        Ok(state.finish(false))
    }

    /// Expand the principal's roles, seeding the lists with its own values.
    pub async fn expand_for(&self, principal: &Principal) -> AccessResult<ExpandedRoles> {
        let mut state = ExpansionState {
            options: principal.options,
            inclusion_order: Vec::new(),
            include_hierarchy: Vec::new(),
            first_main_role: None,
            config_layers: Vec::new(),
            data: RoleDataLists::for_principal(principal),
        };
        self.expand_level(&principal.role_ids, Vec::new(), &mut state)
            .await?;
        let expanded = state.finish(principal.is_admin);
        debug!(
            principal_id = principal.id,
            roles = ?expanded.role_ids,
            "expanded principal roles"
        );
        Ok(expanded)
    }

    /// Expand one level of role IDs under the given recursion path.
    ///
    /// A role already on the path is skipped, which is what terminates
    /// cyclic sub-role graphs.
    fn expand_level<'a>(
        &'a self,
        ids: &'a [RoleId],
        path: Vec<RoleId>,
        state: &'a mut ExpansionState,
    ) -> LevelFuture<'a> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(());
            }
            let roles = self.store.fetch_roles(ids).await?;

            for id in ids {
                let Some(role) = roles.iter().find(|role| role.id == *id) else {
                    debug!(role_id = *id, "skipping unknown role");
                    continue;
                };
                if role.hidden {
                    debug!(role_id = *id, "skipping hidden role");
                    continue;
                }
                if path.contains(id) {
                    debug!(role_id = *id, path = ?path, "skipping role already on inclusion path");
                    continue;
                }

                if !role.sub_roles.is_empty() {
                    let mut nested = path.clone();
                    nested.push(*id);
                    self.expand_level(&role.sub_roles, nested, state).await?;
                }

                state.include(role, &path);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cms_model::MemoryStore;

    async fn store_with(roles: Vec<Role>) -> MemoryStore {
        let store = MemoryStore::new();
        for role in roles {
            store.insert_role(role).await;
        }
        store
    }

    #[test]
    fn test_last_occurrence_order() {
        assert_eq!(last_occurrence_order(&[3, 2, 3, 1]), vec![2, 3, 1]);
        assert_eq!(last_occurrence_order(&[]), Vec::<RoleId>::new());
    }

    #[tokio::test]
    async fn test_sub_roles_precede_including_role() {
        let store = store_with(vec![
            Role::new(1, "Editors").with_sub_roles([2]),
            Role::new(2, "Writers").with_sub_roles([3]),
            Role::new(3, "Readers"),
        ])
        .await;

        let expanded = RoleExpander::new(&store).expand(&[1]).await.unwrap();
        assert_eq!(expanded.role_ids, vec![3, 2, 1]);
        assert_eq!(
            expanded.include_hierarchy,
            vec![vec![1, 2], vec![1], Vec::<RoleId>::new()]
        );
        assert_eq!(expanded.first_main_role, Some(1));
    }

    #[tokio::test]
    async fn test_mutual_cycle_terminates() {
        let store = store_with(vec![
            Role::new(1, "A").with_sub_roles([2]),
            Role::new(2, "B").with_sub_roles([1]),
        ])
        .await;

        let expanded = RoleExpander::new(&store).expand(&[1]).await.unwrap();
        assert_eq!(expanded.role_ids, vec![2, 1]);
        assert_eq!(expanded.inclusion_order, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_self_reference_is_tolerated() {
        let store = store_with(vec![Role::new(4, "Loop").with_sub_roles([4])]).await;

        let expanded = RoleExpander::new(&store).expand(&[4]).await.unwrap();
        assert_eq!(expanded.role_ids, vec![4]);
    }

    #[tokio::test]
    async fn test_shared_sub_role_keeps_last_occurrence() {
        let store = store_with(vec![
            Role::new(1, "A").with_sub_roles([3]),
            Role::new(2, "B").with_sub_roles([3]),
            Role::new(3, "Shared"),
        ])
        .await;

        let expanded = RoleExpander::new(&store).expand(&[1, 2]).await.unwrap();
        assert_eq!(expanded.inclusion_order, vec![3, 1, 3, 2]);
        assert_eq!(expanded.role_ids, vec![1, 3, 2]);
    }

    #[tokio::test]
    async fn test_missing_and_hidden_roles_are_skipped() {
        let mut hidden = Role::new(2, "Hidden");
        hidden.hidden = true;
        let store = store_with(vec![Role::new(1, "Visible"), hidden]).await;

        let expanded = RoleExpander::new(&store).expand(&[9, 2, 1]).await.unwrap();
        assert_eq!(expanded.role_ids, vec![1]);
        assert_eq!(expanded.first_main_role, Some(1));
    }

    #[tokio::test]
    async fn test_contributions_are_merged() {
        let mut editors = Role::new(1, "Editors")
            .with_sub_roles([2])
            .with_db_mountpoints([10, 20])
            .with_workspace_perms(1);
        editors.tables_modify = vec!["pages".to_string(), "tt_content".to_string()];
        editors.allowed_languages = vec![0];
        editors.config = "options.clearCache = 1".to_string();

        let mut translators = Role::new(2, "Translators")
            .with_db_mountpoints([20, 30])
            .with_workspace_perms(4);
        translators.tables_modify = vec!["tt_content".to_string()];
        translators.allowed_languages = vec![1, 2];

        let store = store_with(vec![editors, translators]).await;
        let principal = Principal::new(5).with_roles([1]).with_webmounts([5]);

        let expanded = RoleExpander::new(&store)
            .expand_for(&principal)
            .await
            .unwrap();
        assert_eq!(expanded.data.webmounts, vec![5, 20, 30, 10]);
        assert_eq!(expanded.data.tables_modify.len(), 2);
        assert_eq!(
            expanded.data.allowed_languages.iter().copied().collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(
            expanded.data.workspace_perms,
            WorkspacePermission::LIVE | WorkspacePermission::CREATE
        );
        assert_eq!(expanded.config_layers.len(), 1);
        assert!(expanded.check(DataList::TablesModify, "tt_content"));
        assert!(!expanded.check(DataList::TablesSelect, "tt_content"));
        assert!(expanded.check_language_access(2));
        assert!(!expanded.check_language_access(3));
    }

    #[tokio::test]
    async fn test_role_mounts_respect_options() {
        let store = store_with(vec![Role::new(1, "Editors").with_db_mountpoints([10])]).await;
        let principal = Principal::new(5)
            .with_roles([1])
            .with_webmounts([5])
            .with_options(MountOptions::from_bits(0));

        let expanded = RoleExpander::new(&store)
            .expand_for(&principal)
            .await
            .unwrap();
        assert_eq!(expanded.data.webmounts, vec![5]);
    }

    #[tokio::test]
    async fn test_admin_passes_list_checks() {
        let store = MemoryStore::new();
        let expanded = RoleExpander::new(&store)
            .expand_for(&Principal::admin(1))
            .await
            .unwrap();
        assert!(expanded.check(DataList::Modules, "web_layout"));
        assert!(expanded.check_language_access(7));
        assert!(!expanded.contains(0));
    }
}
