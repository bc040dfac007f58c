//! Workspace domain model
//!
//! A workspace is an isolated draft context. ID 0 is the live workspace,
//! positive IDs are custom draft workspaces with their own membership, and
//! negative IDs are invalid.

use serde::{Deserialize, Serialize};

use crate::principal::PrincipalId;
use crate::role::RoleId;

/// Workspace identifier.
pub type WorkspaceId = i64;

/// The live (published) workspace.
pub const LIVE_WORKSPACE: WorkspaceId = 0;

/// Check if a workspace ID denotes a custom draft workspace.
pub fn is_custom_workspace(id: WorkspaceId) -> bool {
    id > LIVE_WORKSPACE
}

/// A member entry of a workspace list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum WorkspaceMember {
    /// A single principal
    Principal(PrincipalId),
    /// Every principal holding the role
    Role(RoleId),
}

/// A custom workspace record.
///
/// # Examples
///
/// ```
/// use cms_model::{Workspace, WorkspaceMember};
///
/// let ws = Workspace::new(7, "Spring campaign")
///     .with_owner(WorkspaceMember::Principal(3))
///     .with_member(WorkspaceMember::Role(12));
/// assert_eq!(ws.owners.len(), 1);
/// assert_eq!(ws.members.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace ID
    pub id: WorkspaceId,

    /// Title
    #[serde(default)]
    pub title: String,

    /// Owners may manage and publish
    #[serde(default)]
    pub owners: Vec<WorkspaceMember>,

    /// Reviewers may approve stages
    #[serde(default)]
    pub reviewers: Vec<WorkspaceMember>,

    /// Members may edit drafts
    #[serde(default)]
    pub members: Vec<WorkspaceMember>,

    /// Frozen workspaces accept no further edits
    #[serde(default)]
    pub freeze: bool,

    /// Whether live records may be edited while in this workspace
    #[serde(default)]
    pub live_edit: bool,
}

impl Workspace {
    /// Creates a workspace without members.
    pub fn new(id: WorkspaceId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            owners: Vec::new(),
            reviewers: Vec::new(),
            members: Vec::new(),
            freeze: false,
            live_edit: false,
        }
    }

    /// Add an owner.
    pub fn with_owner(mut self, owner: WorkspaceMember) -> Self {
        self.owners.push(owner);
        self
    }

    /// Add a reviewer.
    pub fn with_reviewer(mut self, reviewer: WorkspaceMember) -> Self {
        self.reviewers.push(reviewer);
        self
    }

    /// Add a member.
    pub fn with_member(mut self, member: WorkspaceMember) -> Self {
        self.members.push(member);
        self
    }
}

/// How a principal may access a workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceAccess {
    /// Administrator, unrestricted
    Admin,
    /// Access to the live workspace
    Online,
    /// Workspace owner
    Owner,
    /// Workspace reviewer
    Reviewer,
    /// Workspace member
    Member,
}

impl WorkspaceAccess {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceAccess::Admin => "admin",
            WorkspaceAccess::Online => "online",
            WorkspaceAccess::Owner => "owner",
            WorkspaceAccess::Reviewer => "reviewer",
            WorkspaceAccess::Member => "member",
        }
    }
}
