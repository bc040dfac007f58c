//! # Content Backend RBAC
//!
//! This crate provides the permission algebra of the content backend:
//! role expansion, page permission masks and workspace access.
//!
//! ## Overview
//!
//! The cms-rbac crate handles:
//! - **Permissions**: The five page permission bits and the workspace bits
//! - **Actions**: Editing actions checked against a computed mask
//! - **Roles**: Transitive expansion of nested roles with cycle tolerance
//! - **Calculator**: Ownership algebra and the equivalent storage predicate
//! - **Hooks**: Ordered extensions adjusting masks and predicates
//! - **Workspaces**: Owner/reviewer/member access to draft workspaces
//!
//! ## Architecture
//!
//! ```text
//! Principal ─→ RoleExpander ─→ ExpandedRoles
//!                                   │
//! Record.ownership ─────────────────┼─→ PermissionCalculator ─→ PagePermission
//!                                   │         └─ PermissionHooks
//!                                   └─→ check_workspace ─→ WorkspaceAccess
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cms_model::{MemoryStore, Principal, Record};
//! use cms_rbac::{
//!     is_action_allowed, Action, PermissionCalculator, PermissionHooks, ResourceKind,
//!     RoleExpander,
//! };
//!
//! # async fn example(store: MemoryStore, page: Record) -> cms_model::AccessResult<()> {
//! let principal = Principal::new(3).with_roles([2]);
//! let roles = RoleExpander::new(&store).expand_for(&principal).await?;
//!
//! let hooks = PermissionHooks::new();
//! let calc = PermissionCalculator::new(&principal, &roles, &hooks);
//! let mask = calc.calc_perms("pages", &page, true)?;
//!
//! if is_action_allowed(mask, &ResourceKind::Page, Action::Edit) {
//!     // ...
//! }
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod calculator;
pub mod hooks;
pub mod permissions;
pub mod roles;
pub mod workspace;

// Re-export main types for convenience
pub use actions::{is_action_allowed, Action, ResourceKind};
pub use calculator::{page_permissions_clause, PermissionCalculator};
pub use hooks::{PermissionHook, PermissionHooks};
pub use permissions::{PagePermission, WorkspacePermission};
pub use roles::{ConfigLayer, DataList, ExpandedRoles, RoleDataLists, RoleExpander};
pub use workspace::check_workspace;
