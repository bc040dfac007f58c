//! # Rootline resolution
//!
//! Walks a page up to the tree root and returns the ancestor path, root
//! first. With overlay applied, parent pointers are read after workspace
//! resolution, so a page moved inside a draft workspace shows up under its
//! new parent. Without overlay only drafts are re-parented onto their live
//! origin.
//!
//! Stored data may contain parent cycles. The walk stops after
//! [`MAX_ROOTLINE_HOPS`] rows whatever the data looks like.

use cms_model::{is_custom_workspace, AccessResult, Ownership, Predicate, Record, VersionState};
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::cache::{Cache, CacheStats};
use crate::overlay::VersionOverlay;

/// Upper bound on rows visited by one rootline walk.
pub const MAX_ROOTLINE_HOPS: usize = 100;

/// Cache key: start uid, row filter, overlay flag.
type RootlineKey = (i64, Predicate, bool);

/// Summary of one ancestor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootlineEntry {
    /// Logical uid
    pub uid: i64,
    /// Resolved parent uid
    pub pid: i64,
    /// Title
    pub title: String,
    /// Ownership columns, if the page carries them
    pub ownership: Option<Ownership>,
    /// Version state after resolution
    pub version_state: VersionState,
    /// Physical uid of an overlaid draft
    pub orig_uid: Option<i64>,
    /// Pid before resolution
    pub orig_pid: Option<i64>,
}

impl RootlineEntry {
    /// The synthetic entry standing for the tree root.
    pub fn root() -> Self {
        Self {
            uid: 0,
            pid: 0,
            title: String::new(),
            ownership: None,
            version_state: VersionState::Default,
            orig_uid: None,
            orig_pid: None,
        }
    }

    /// Check if this is the synthetic root.
    pub fn is_root(&self) -> bool {
        self.uid == 0
    }

    fn from_record(record: &Record) -> Self {
        Self {
            uid: record.uid,
            pid: record.pid,
            title: record.title.clone(),
            ownership: record.ownership,
            version_state: record.version_state(),
            orig_uid: record.overlay.orig_uid,
            orig_pid: record.overlay.orig_pid,
        }
    }
}

enum WalkEnd {
    Root,
    Missing,
    Exhausted,
}

/// Memoized rootline walks for one request.
#[derive(Debug)]
pub struct RootlineResolver {
    overlay: VersionOverlay,
    paths: Cache<RootlineKey, Vec<RootlineEntry>>,
    ancestors: Cache<RootlineKey, Option<RootlineEntry>>,
}

impl RootlineResolver {
    /// Creates a resolver with empty caches.
    pub fn new(overlay: VersionOverlay) -> Self {
        Self {
            overlay,
            paths: Cache::new("rootline"),
            ancestors: Cache::new("rootline_ancestor"),
        }
    }

    /// The overlay used for ancestor rows.
    pub fn overlay(&self) -> &VersionOverlay {
        &self.overlay
    }

    /// Resolve the path from the root down to `uid`.
    ///
    /// Rows not matching `filter` end the walk. The synthetic root is
    /// appended when the walk reached uid 0 or ran out of hops, but not when
    /// an ancestor was missing.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use cms_model::{EngineSettings, MemoryStore, Predicate, Record};
    /// use cms_workspace::{RootlineResolver, VersionOverlay};
    ///
    /// # async fn example() -> cms_model::AccessResult<()> {
    /// let store = Arc::new(MemoryStore::new());
    /// store.insert_record("pages", Record::new(1, 0)).await;
    /// store.insert_record("pages", Record::new(5, 1)).await;
    ///
    /// let overlay = VersionOverlay::new(store, Arc::new(EngineSettings::default()), 0);
    /// let resolver = RootlineResolver::new(overlay);
    ///
    /// let path = resolver.rootline(5, &Predicate::True, false).await?;
    /// let uids: Vec<i64> = path.iter().map(|e| e.uid).collect();
    /// assert_eq!(uids, vec![0, 1, 5]);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn rootline(
        &self,
        uid: i64,
        filter: &Predicate,
        apply_overlay: bool,
    ) -> AccessResult<Vec<RootlineEntry>> {
        let key = (uid, filter.clone(), apply_overlay);
        if let Some(path) = self.paths.get(&key).await {
            return Ok(path);
        }

        let mut path = Vec::new();
        let mut current = uid;
        let mut end = WalkEnd::Exhausted;
        for _ in 0..MAX_ROOTLINE_HOPS {
            if current == 0 {
                end = WalkEnd::Root;
                break;
            }
            match self.ancestor(current, filter, apply_overlay).await? {
                Some(entry) => {
                    current = entry.pid;
                    path.push(entry);
                }
                None => {
                    end = WalkEnd::Missing;
                    break;
                }
            }
        }
        if matches!(end, WalkEnd::Exhausted) && current == 0 {
            end = WalkEnd::Root;
        }

        match end {
            WalkEnd::Root => path.push(RootlineEntry::root()),
            WalkEnd::Exhausted => {
                warn!(
                    uid,
                    hops = MAX_ROOTLINE_HOPS,
                    "rootline hop budget exhausted; parent chain is cyclic"
                );
                path.push(RootlineEntry::root());
            }
            WalkEnd::Missing => {
                trace!(uid, missing = current, "rootline ended at missing ancestor")
            }
        }
        path.reverse();

        self.paths.insert(key, path.clone()).await;
        Ok(path)
    }

    /// Fetch and resolve one ancestor row.
    async fn ancestor(
        &self,
        uid: i64,
        filter: &Predicate,
        apply_overlay: bool,
    ) -> AccessResult<Option<RootlineEntry>> {
        let key = (uid, filter.clone(), apply_overlay);
        if let Some(entry) = self.ancestors.get(&key).await {
            return Ok(entry);
        }

        let page_table = self.overlay.settings().page_table.clone();
        let entry = match self.overlay.store().fetch_record(&page_table, uid, filter).await? {
            Some(row) => self.resolve_position(&page_table, row, apply_overlay).await?,
            None => None,
        };

        self.ancestors.insert(key, entry.clone()).await;
        Ok(entry)
    }

    async fn resolve_position(
        &self,
        page_table: &str,
        row: Record,
        apply_overlay: bool,
    ) -> AccessResult<Option<RootlineEntry>> {
        if !apply_overlay {
            let row = self.overlay.fix_versioning_pid(page_table, row, false).await?;
            return Ok(Some(RootlineEntry::from_record(&row)));
        }

        let mut row = match self.overlay.workspace_ol(page_table, row, false).await? {
            Some(row) => row,
            None => return Ok(None),
        };

        // With preview on, the overlay has already moved the row.
        let workspace = self.overlay.workspace();
        if is_custom_workspace(workspace) && !self.overlay.settings().preview_move_placeholders {
            let placeholder = self
                .overlay
                .get_move_placeholder(page_table, row.uid, workspace)
                .await?;
            if let Some(placeholder) = placeholder {
                row.pid = placeholder.pid;
            }
        }
        let row = self.overlay.fix_versioning_pid(page_table, row, false).await?;

        Ok(Some(RootlineEntry::from_record(&row)))
    }

    /// Path cache statistics.
    pub async fn stats(&self) -> CacheStats {
        self.paths.stats().await
    }

    /// Ancestor cache statistics.
    pub async fn ancestor_stats(&self) -> CacheStats {
        self.ancestors.stats().await
    }
}
