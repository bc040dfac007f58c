//! # Version overlay
//!
//! Resolves the draft of a live row in the request's workspace and
//! addresses it through the live row's uid.
//!
//! ## Row shapes
//!
//! ```text
//! live row         uid=10  pid=1   t3ver_oid=0
//! draft            uid=42  pid=-1  t3ver_oid=10  t3ver_wsid=7
//! move placeholder uid=50  pid=3   t3ver_state=3 t3ver_move_id=10 t3ver_wsid=7
//! move pointer     uid=43  pid=-1  t3ver_state=4 t3ver_oid=10     t3ver_wsid=7
//! ```
//!
//! Overlaying live row 10 in workspace 7 yields the draft's content with
//! `uid=10`, `_ORIG_uid=42`, `pid=1` and `_ORIG_pid=-1`. A move placeholder
//! relocates the row and leaves the previous position under `_MOVE_PLH`.
//!
//! Overlay never writes and never surfaces a draft of another workspace.

use std::sync::Arc;

use cms_model::{
    is_custom_workspace, AccessResult, EngineSettings, Field, MovePlaceholderOrigin, Predicate,
    Record, RecordStore, VersionState, WorkspaceId, DRAFT_PID,
};
use tracing::debug;

/// Presentation class attached to overlaid rows.
pub const VERSION_CSS_CLASS: &str = "ver-element";

/// Draft/live resolution for one workspace.
#[derive(Clone)]
pub struct VersionOverlay {
    store: Arc<dyn RecordStore>,
    settings: Arc<EngineSettings>,
    workspace: WorkspaceId,
}

impl std::fmt::Debug for VersionOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionOverlay")
            .field("workspace", &self.workspace)
            .finish()
    }
}

impl VersionOverlay {
    /// Creates an overlay resolving drafts of `workspace`.
    pub fn new(
        store: Arc<dyn RecordStore>,
        settings: Arc<EngineSettings>,
        workspace: WorkspaceId,
    ) -> Self {
        Self {
            store,
            settings,
            workspace,
        }
    }

    /// The workspace drafts are resolved in.
    pub fn workspace(&self) -> WorkspaceId {
        self.workspace
    }

    /// Engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub(crate) fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Find the draft of live `uid` in `workspace`.
    pub async fn get_workspace_version(
        &self,
        workspace: WorkspaceId,
        table: &str,
        uid: i64,
    ) -> AccessResult<Option<Record>> {
        if !is_custom_workspace(workspace) || !self.settings.is_table_versioned(table) {
            return Ok(None);
        }
        let filter = Predicate::eq(Field::Pid, DRAFT_PID)
            .and(Predicate::eq(Field::VersionOid, uid))
            .and(Predicate::eq(Field::VersionWorkspace, workspace));
        Ok(self.store.fetch_records(table, &filter).await?.into_iter().next())
    }

    /// Find the move placeholder pointing at live `uid` in `workspace`.
    pub async fn get_move_placeholder(
        &self,
        table: &str,
        uid: i64,
        workspace: WorkspaceId,
    ) -> AccessResult<Option<Record>> {
        if !is_custom_workspace(workspace) || !self.settings.is_table_versioned(table) {
            return Ok(None);
        }
        let state = i64::from(VersionState::MovePlaceholder.as_i32());
        let filter = Predicate::eq(Field::VersionState, state)
            .and(Predicate::eq(Field::VersionMoveId, uid))
            .and(Predicate::eq(Field::VersionWorkspace, workspace));
        Ok(self.store.fetch_records(table, &filter).await?.into_iter().next())
    }

    /// Get the live uid a stored draft shadows.
    ///
    /// Returns `None` for live rows and unknown uids.
    pub async fn get_live_version_id(&self, table: &str, uid: i64) -> AccessResult<Option<i64>> {
        let row = self.store.fetch_record(table, uid, &Predicate::True).await?;
        Ok(row
            .filter(Record::is_draft)
            .and_then(|row| row.version)
            .map(|version| version.oid)
            .filter(|oid| *oid > 0))
    }

    /// Overlay a live row with its draft in the current workspace.
    ///
    /// Returns `Ok(None)` only when `unset_move_pointers` is set and the
    /// draft marks the row as moved away from this position; callers drop
    /// such rows from their result set.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use cms_model::{EngineSettings, MemoryStore, Record};
    /// use cms_workspace::VersionOverlay;
    ///
    /// # async fn example() -> cms_model::AccessResult<()> {
    /// let store = Arc::new(MemoryStore::new());
    /// let overlay = VersionOverlay::new(store, Arc::new(EngineSettings::default()), 7);
    ///
    /// let row = overlay.workspace_ol("pages", Record::new(10, 1), false).await?;
    /// assert_eq!(row.map(|r| r.uid), Some(10));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn workspace_ol(
        &self,
        table: &str,
        row: Record,
        unset_move_pointers: bool,
    ) -> AccessResult<Option<Record>> {
        if !is_custom_workspace(self.workspace) {
            return Ok(Some(row));
        }
        let versioned = self.settings.is_table_versioned(table);
        let mut row = row;
        let mut moved_from: Option<MovePlaceholderOrigin> = None;
        let mut placeholder_input = false;

        // The row is itself a placeholder: resolve to the record it stands for.
        if versioned {
            let target = row
                .version
                .filter(|v| v.state == VersionState::MovePlaceholder && v.move_id > 0);
            if let Some(version) = target {
                let live = self
                    .store
                    .fetch_record(table, version.move_id, &Predicate::True)
                    .await?;
                if let Some(live) = live {
                    moved_from = Some(MovePlaceholderOrigin {
                        uid: row.uid,
                        pid: row.pid,
                    });
                    row = live;
                    placeholder_input = true;
                }
            }
        }

        if moved_from.is_none() && versioned && self.settings.preview_move_placeholders {
            let placeholder = self
                .get_move_placeholder(table, row.uid, self.workspace)
                .await?;
            if let Some(placeholder) = placeholder {
                moved_from = Some(MovePlaceholderOrigin {
                    uid: row.uid,
                    pid: row.pid,
                });
                row.pid = placeholder.pid;
                if let Some(sorting) = placeholder.fields.get("sorting") {
                    row.fields.insert("sorting".to_string(), sorting.clone());
                }
            }
        }

        if let Some(mut draft) = self.get_workspace_version(self.workspace, table, row.uid).await? {
            let moved_away = draft.version_state() == VersionState::MovePointer;
            if unset_move_pointers && moved_away && !placeholder_input {
                debug!(table, uid = row.uid, draft_uid = draft.uid, "dropping moved-away row");
                return Ok(None);
            }
            draft.overlay.orig_pid = Some(draft.pid);
            draft.pid = row.pid;
            draft.overlay.orig_uid = Some(draft.uid);
            draft.uid = row.uid;
            draft.overlay.css_class = Some(VERSION_CSS_CLASS.to_string());
            draft.overlay.move_placeholder = row.overlay.move_placeholder;
            row = draft;
        }

        if let Some(origin) = moved_from {
            row.overlay.move_placeholder = Some(origin);
            let mut version = row.version.unwrap_or_default();
            version.state = VersionState::MovePlaceholder;
            row.version = Some(version);
        }

        Ok(Some(row))
    }

    /// Overlay every row, dropping those reported as moved away.
    pub async fn overlay_rows(
        &self,
        table: &str,
        rows: Vec<Record>,
        unset_move_pointers: bool,
    ) -> AccessResult<Vec<Record>> {
        let mut visible = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(row) = self.workspace_ol(table, row, unset_move_pointers).await? {
                visible.push(row);
            }
        }
        Ok(visible)
    }

    /// Replace a draft's `-1` pid with the pid of its live origin.
    ///
    /// Only drafts of the current workspace are resolved unless
    /// `ignore_workspace_match` is set. A moved draft takes the pid of its
    /// move placeholder. Rows without a live origin come back unchanged.
    pub async fn fix_versioning_pid(
        &self,
        table: &str,
        row: Record,
        ignore_workspace_match: bool,
    ) -> AccessResult<Record> {
        if !row.is_draft() || !self.settings.is_table_versioned(table) {
            return Ok(row);
        }

        let state_loaded = row.version.is_some();
        let version = match row.version {
            Some(version) => Some(version),
            None => self
                .store
                .fetch_record(table, row.uid, &Predicate::True)
                .await?
                .and_then(|stored| stored.version),
        };
        let Some(version) = version else {
            return Ok(row);
        };
        if version.oid <= 0 || !(ignore_workspace_match || version.wsid == self.workspace) {
            return Ok(row);
        }
        let Some(live) = self.store.fetch_record(table, version.oid, &Predicate::True).await? else {
            debug!(table, uid = row.uid, oid = version.oid, "draft without live origin");
            return Ok(row);
        };

        let mut row = row;
        row.overlay.orig_pid = Some(row.pid);
        row.pid = live.pid;
        if !state_loaded || version.state == VersionState::MovePointer {
            let placeholder = self
                .get_move_placeholder(table, version.oid, version.wsid)
                .await?;
            if let Some(placeholder) = placeholder {
                row.pid = placeholder.pid;
            }
        }
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cms_model::{MemoryStore, VersionFields};

    async fn fixture() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert_record("pages", Record::new(1, 0).with_title("Home")).await;
        store.insert_record("pages", Record::new(3, 0).with_title("News")).await;
        store
            .insert_record("pages", Record::new(10, 1).with_title("About"))
            .await;
        store
            .insert_record(
                "pages",
                Record::new(42, DRAFT_PID)
                    .with_title("About (draft)")
                    .with_version(VersionFields::draft(10, 7, VersionState::Default)),
            )
            .await;
        store
    }

    fn overlay(store: Arc<MemoryStore>, workspace: WorkspaceId) -> VersionOverlay {
        VersionOverlay::new(store, Arc::new(EngineSettings::default()), workspace)
    }

    #[tokio::test]
    async fn test_live_workspace_is_untouched() {
        let store = fixture().await;
        let before = store.query_count();
        let row = overlay(store.clone(), 0)
            .workspace_ol("pages", Record::new(10, 1).with_title("About"), true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.title, "About");
        assert_eq!(store.query_count(), before);
    }

    #[tokio::test]
    async fn test_draft_is_addressed_through_live_uid() {
        let store = fixture().await;
        let row = overlay(store, 7)
            .workspace_ol("pages", Record::new(10, 1).with_title("About"), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.uid, 10);
        assert_eq!(row.pid, 1);
        assert_eq!(row.title, "About (draft)");
        assert_eq!(row.overlay.orig_uid, Some(42));
        assert_eq!(row.overlay.orig_pid, Some(DRAFT_PID));
        assert_eq!(row.overlay.css_class.as_deref(), Some(VERSION_CSS_CLASS));
        assert_eq!(row.physical_uid(), 42);
    }

    #[tokio::test]
    async fn test_other_workspace_drafts_stay_hidden() {
        let store = fixture().await;
        let row = overlay(store, 3)
            .workspace_ol("pages", Record::new(10, 1).with_title("About"), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.title, "About");
        assert_eq!(row.overlay.orig_uid, None);
    }

    #[tokio::test]
    async fn test_unversioned_table_is_untouched() {
        let store = fixture().await;
        store
            .insert_record(
                "sys_note",
                Record::new(5, DRAFT_PID)
                    .with_version(VersionFields::draft(4, 7, VersionState::Default)),
            )
            .await;
        let row = overlay(store, 7)
            .workspace_ol("sys_note", Record::new(4, 1), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row, Record::new(4, 1));
    }

    #[tokio::test]
    async fn test_move_placeholder_preview_relocates_live_row() {
        let store = fixture().await;
        store
            .insert_record(
                "pages",
                Record::new(50, 3).with_version(VersionFields::move_placeholder(10, 7)),
            )
            .await;

        let row = overlay(store, 7)
            .workspace_ol("pages", Record::new(10, 1), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.uid, 10);
        assert_eq!(row.pid, 3);
        assert_eq!(
            row.overlay.move_placeholder,
            Some(MovePlaceholderOrigin { uid: 10, pid: 1 })
        );
        assert_eq!(row.version_state(), VersionState::MovePlaceholder);
    }

    #[tokio::test]
    async fn test_preview_can_be_disabled() {
        let store = fixture().await;
        store
            .insert_record(
                "pages",
                Record::new(50, 3).with_version(VersionFields::move_placeholder(10, 7)),
            )
            .await;
        let settings = EngineSettings {
            preview_move_placeholders: false,
            ..EngineSettings::default()
        };

        let row = VersionOverlay::new(store, Arc::new(settings), 7)
            .workspace_ol("pages", Record::new(10, 1), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.pid, 1);
        assert_eq!(row.overlay.move_placeholder, None);
    }

    #[tokio::test]
    async fn test_placeholder_row_resolves_to_moved_record() {
        let store = fixture().await;
        let placeholder = Record::new(50, 3).with_version(VersionFields::move_placeholder(10, 7));

        let row = overlay(store, 7)
            .workspace_ol("pages", placeholder, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.uid, 10);
        assert_eq!(row.title, "About (draft)");
        assert_eq!(
            row.overlay.move_placeholder,
            Some(MovePlaceholderOrigin { uid: 50, pid: 3 })
        );
        assert_eq!(row.version_state(), VersionState::MovePlaceholder);
    }

    #[tokio::test]
    async fn test_move_pointer_is_dropped_on_request() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record("pages", Record::new(10, 1)).await;
        store
            .insert_record(
                "pages",
                Record::new(43, DRAFT_PID)
                    .with_version(VersionFields::draft(10, 7, VersionState::MovePointer)),
            )
            .await;
        let overlay = overlay(store, 7);

        let kept = overlay.workspace_ol("pages", Record::new(10, 1), false).await.unwrap();
        assert!(kept.is_some());
        let dropped = overlay.workspace_ol("pages", Record::new(10, 1), true).await.unwrap();
        assert!(dropped.is_none());

        let rows = overlay
            .overlay_rows("pages", vec![Record::new(10, 1), Record::new(11, 1)], true)
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|r| r.uid).collect::<Vec<_>>(), vec![11]);
    }

    #[tokio::test]
    async fn test_delete_placeholder_surfaces() {
        let store = Arc::new(MemoryStore::new());
        store.insert_record("pages", Record::new(10, 1)).await;
        let delete = VersionFields::draft(10, 7, VersionState::DeletePlaceholder);
        store
            .insert_record("pages", Record::new(60, DRAFT_PID).with_version(delete))
            .await;

        let row = overlay(store, 7)
            .workspace_ol("pages", Record::new(10, 1), true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.uid, 10);
        assert_eq!(row.pid, 1);
        assert_eq!(row.overlay.orig_uid, Some(60));
        assert_eq!(row.version_state(), VersionState::DeletePlaceholder);
    }

    #[tokio::test]
    async fn test_new_placeholder_takes_its_version() {
        let store = Arc::new(MemoryStore::new());
        let placeholder = VersionFields {
            wsid: 7,
            state: VersionState::NewPlaceholder,
            ..VersionFields::default()
        };
        let live = Record::new(20, 1).with_title("[PLACEHOLDER]").with_version(placeholder);
        store.insert_record("pages", live.clone()).await;
        let version = VersionFields::draft(20, 7, VersionState::NewPlaceholderVersion);
        store
            .insert_record(
                "pages",
                Record::new(21, DRAFT_PID).with_title("Campaign").with_version(version),
            )
            .await;

        let row = overlay(store, 7)
            .workspace_ol("pages", live, true)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.uid, 20);
        assert_eq!(row.pid, 1);
        assert_eq!(row.title, "Campaign");
        assert_eq!(row.overlay.orig_uid, Some(21));
        assert_eq!(row.version_state(), VersionState::NewPlaceholderVersion);
    }

    #[tokio::test]
    async fn test_foreign_move_placeholder_is_ignored() {
        let store = fixture().await;
        store
            .insert_record(
                "pages",
                Record::new(50, 3).with_version(VersionFields::move_placeholder(10, 3)),
            )
            .await;

        let row = overlay(store, 7)
            .workspace_ol("pages", Record::new(10, 1), false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.pid, 1);
        assert_eq!(row.overlay.move_placeholder, None);
        assert_eq!(row.overlay.orig_uid, Some(42));
        assert_eq!(row.version_state(), VersionState::Default);
    }

    #[tokio::test]
    async fn test_fix_versioning_pid() {
        let store = fixture().await;
        let draft = Record::new(42, DRAFT_PID)
            .with_version(VersionFields::draft(10, 7, VersionState::Default));

        let fixed = overlay(store.clone(), 7)
            .fix_versioning_pid("pages", draft.clone(), false)
            .await
            .unwrap();
        assert_eq!(fixed.pid, 1);
        assert_eq!(fixed.overlay.orig_pid, Some(DRAFT_PID));

        let foreign = overlay(store.clone(), 3)
            .fix_versioning_pid("pages", draft.clone(), false)
            .await
            .unwrap();
        assert_eq!(foreign.pid, DRAFT_PID);

        let forced = overlay(store, 3)
            .fix_versioning_pid("pages", draft, true)
            .await
            .unwrap();
        assert_eq!(forced.pid, 1);
    }

    #[tokio::test]
    async fn test_fix_versioning_pid_loads_missing_columns() {
        let store = fixture().await;
        let fixed = overlay(store, 7)
            .fix_versioning_pid("pages", Record::new(42, DRAFT_PID), false)
            .await
            .unwrap();
        assert_eq!(fixed.pid, 1);
    }

    #[tokio::test]
    async fn test_fix_versioning_pid_follows_move_placeholder() {
        let store = fixture().await;
        store
            .insert_record(
                "pages",
                Record::new(50, 3).with_version(VersionFields::move_placeholder(10, 7)),
            )
            .await;
        let pointer = Record::new(43, DRAFT_PID)
            .with_version(VersionFields::draft(10, 7, VersionState::MovePointer));

        let fixed = overlay(store, 7)
            .fix_versioning_pid("pages", pointer, false)
            .await
            .unwrap();
        assert_eq!(fixed.pid, 3);
    }

    #[tokio::test]
    async fn test_orphaned_draft_is_left_alone() {
        let store = fixture().await;
        let orphan = Record::new(60, DRAFT_PID)
            .with_version(VersionFields::draft(99, 7, VersionState::Default));
        let fixed = overlay(store, 7)
            .fix_versioning_pid("pages", orphan.clone(), false)
            .await
            .unwrap();
        assert_eq!(fixed, orphan);
    }

    #[tokio::test]
    async fn test_live_version_id() {
        let store = fixture().await;
        let overlay = overlay(store, 7);
        assert_eq!(overlay.get_live_version_id("pages", 42).await.unwrap(), Some(10));
        assert_eq!(overlay.get_live_version_id("pages", 10).await.unwrap(), None);
        assert_eq!(
            overlay.get_live_version_id("pages", 999).await.unwrap(),
            None
        );
    }
}
