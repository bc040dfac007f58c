//! Workspace access checks.

use cms_model::{
    Principal, Workspace, WorkspaceAccess, WorkspaceId, WorkspaceMember, LIVE_WORKSPACE,
};

use crate::permissions::WorkspacePermission;
use crate::roles::ExpandedRoles;

/// Determine how `principal` may access workspace `id`.
///
/// `workspace` is the stored record for custom workspaces and is ignored for
/// the live workspace. Owners are checked before reviewers, and reviewers
/// before members.
///
/// # Example
///
/// ```
/// use cms_model::{Principal, Workspace, WorkspaceAccess, WorkspaceMember};
/// use cms_rbac::{check_workspace, ExpandedRoles};
///
/// let principal = Principal::new(3);
/// let roles = ExpandedRoles::default();
/// let ws = Workspace::new(7, "Campaign").with_reviewer(WorkspaceMember::Principal(3));
///
/// assert_eq!(check_workspace(&principal, &roles, 7, Some(&ws)), Some(WorkspaceAccess::Reviewer));
/// assert_eq!(check_workspace(&principal, &roles, -1, None), None);
/// ```
pub fn check_workspace(
    principal: &Principal,
    roles: &ExpandedRoles,
    id: WorkspaceId,
    workspace: Option<&Workspace>,
) -> Option<WorkspaceAccess> {
    if id < LIVE_WORKSPACE {
        return None;
    }
    if principal.is_admin {
        return Some(WorkspaceAccess::Admin);
    }
    if id == LIVE_WORKSPACE {
        return roles
            .data
            .workspace_perms
            .contains(WorkspacePermission::LIVE)
            .then_some(WorkspaceAccess::Online);
    }

    let workspace = workspace.filter(|ws| ws.id == id)?;
    let listed = |entries: &[WorkspaceMember]| {
        entries.iter().any(|entry| match entry {
            WorkspaceMember::Principal(pid) => *pid == principal.id,
            WorkspaceMember::Role(rid) => roles.contains(*rid),
        })
    };

    if listed(&workspace.owners) {
        Some(WorkspaceAccess::Owner)
    } else if listed(&workspace.reviewers) {
        Some(WorkspaceAccess::Reviewer)
    } else if listed(&workspace.members) {
        Some(WorkspaceAccess::Member)
    } else {
        None
    }
}
