//! # Content Backend Model
//!
//! This crate provides the domain model and collaborator contracts shared by
//! the access crates of the content backend.
//!
//! ## Overview
//!
//! The cms-model crate handles:
//! - **Principals**: Authenticated actors with direct roles and mounts
//! - **Roles**: Nested permission-bearing groups
//! - **Records**: Hierarchical, ownable, versioned resource rows
//! - **Workspaces**: Draft contexts and their membership
//! - **Predicates**: Abstract filters handed to storage
//! - **Store**: The read-only storage collaborator contract
//! - **Context**: Per-request principal, workspace and time
//!
//! ## Architecture
//!
//! ```text
//! RequestContext
//!   ├─ Principal ─→ Role ─→ Role (sub-roles, possibly cyclic)
//!   └─ WorkspaceId
//!
//! Record (live, pid >= 0)
//!   └─ Record (draft, pid = -1, t3ver_oid = live uid, t3ver_wsid = workspace)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cms_model::{MemoryStore, Principal, Record, RecordStore, Predicate, RequestContext};
//!
//! # async fn example() -> cms_model::StoreResult<()> {
//! let store = MemoryStore::new();
//! store.insert_record("pages", Record::new(1, 0).with_title("Home")).await;
//!
//! let home = store.fetch_record("pages", 1, &Predicate::True).await?;
//! assert!(home.is_some());
//!
//! let ctx = RequestContext::new(Some(Principal::new(3))).in_workspace(7);
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;
pub mod predicate;
pub mod principal;
pub mod record;
pub mod role;
pub mod settings;
pub mod store;
pub mod workspace;

// Re-export main types for convenience
pub use context::RequestContext;
pub use error::{AccessError, AccessResult, StoreError, StoreResult};
pub use predicate::{Field, Predicate};
pub use principal::{MountOptions, Principal, PrincipalId};
pub use record::{
    MovePlaceholderOrigin, OverlayMarkers, Ownership, Record, UnknownVersionState, VersionFields,
    VersionState, DRAFT_PID,
};
pub use role::{Role, RoleId};
pub use settings::{ConfigError, EngineSettings};
pub use store::{MemoryStore, RecordStore, StoreStats};
pub use workspace::{
    is_custom_workspace, Workspace, WorkspaceAccess, WorkspaceId, WorkspaceMember, LIVE_WORKSPACE,
};
