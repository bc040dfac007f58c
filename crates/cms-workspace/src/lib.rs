//! # Content Backend Workspaces
//!
//! This crate resolves draft and live versions of records and answers
//! access questions that depend on the page tree.
//!
//! ## Overview
//!
//! The cms-workspace crate handles:
//! - **Overlay**: Addressing a workspace draft through its live uid
//! - **Rootline**: Memoized, hop-bounded ancestor paths
//! - **Web mounts**: Subtree containment for non-admin principals
//! - **Engine**: The per-request facade over all of the above
//!
//! ## Architecture
//!
//! ```text
//! AccessEngine (one per request)
//!   ├─ ExpandedRoles ── PermissionCalculator
//!   ├─ WebMountGuard ──→ RootlineResolver ──→ VersionOverlay ──→ RecordStore
//!   └─ request-scoped caches
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cms_model::{EngineSettings, MemoryStore, Principal, RecordStore, RequestContext};
//! use cms_rbac::PermissionHooks;
//! use cms_workspace::AccessEngine;
//!
//! # async fn example() -> cms_model::AccessResult<()> {
//! let store = Arc::new(MemoryStore::new());
//! let ctx = RequestContext::new(Some(Principal::new(3).with_roles([2]))).in_workspace(7);
//! let engine = AccessEngine::begin(
//!     store.clone(),
//!     Arc::new(EngineSettings::default()),
//!     Arc::new(PermissionHooks::new()),
//!     ctx,
//! )
//! .await?;
//!
//! if let Some(page) = store.fetch_record("pages", 17, &engine.read_clause()).await? {
//!     let page = engine.workspace_overlay("pages", page, false).await?;
//!     # let _ = page;
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod engine;
pub mod overlay;
pub mod rootline;
pub mod webmount;

// Re-export main types for convenience
pub use cache::{Cache, CacheStats};
pub use engine::AccessEngine;
pub use overlay::{VersionOverlay, VERSION_CSS_CLASS};
pub use rootline::{RootlineEntry, RootlineResolver, MAX_ROOTLINE_HOPS};
pub use webmount::WebMountGuard;
