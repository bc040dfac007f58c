//! # Access engine
//!
//! Request facade wiring role expansion, permission calculation, web-mount
//! containment, rootline resolution and version overlay to one
//! [`RequestContext`].
//!
//! An engine is created per request and dropped with it. Its caches are
//! therefore never shared across principals or workspaces.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cms_model::{EngineSettings, MemoryStore, Principal, RequestContext};
//! use cms_rbac::PermissionHooks;
//! use cms_workspace::AccessEngine;
//!
//! # async fn example(store: Arc<MemoryStore>) -> cms_model::AccessResult<()> {
//! let settings = Arc::new(EngineSettings::from_env()?);
//! let hooks = Arc::new(PermissionHooks::new());
//! let ctx = RequestContext::new(Some(Principal::new(3).with_roles([2]))).in_workspace(7);
//!
//! let engine = AccessEngine::begin(store.clone(), settings, hooks, ctx).await?;
//! let path = engine.rootline(17, &engine.read_clause(), true).await?;
//! # let _ = path;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use cms_model::{
    is_custom_workspace, AccessError, AccessResult, EngineSettings, Predicate, Principal, Record,
    RecordStore, RequestContext, WorkspaceAccess,
};
use cms_rbac::{
    check_workspace, is_action_allowed, page_permissions_clause, Action, DataList, ExpandedRoles,
    PagePermission, PermissionCalculator, PermissionHooks, ResourceKind, RoleExpander,
};
use tracing::{debug, instrument};

use crate::cache::{Cache, CacheStats};
use crate::overlay::VersionOverlay;
use crate::rootline::{RootlineEntry, RootlineResolver};
use crate::webmount::WebMountGuard;

/// Access decisions for one request.
pub struct AccessEngine {
    context: RequestContext,
    store: Arc<dyn RecordStore>,
    settings: Arc<EngineSettings>,
    hooks: Arc<PermissionHooks>,
    principal: Option<Principal>,
    roles: ExpandedRoles,
    overlay: VersionOverlay,
    rootline: RootlineResolver,
    mounts: WebMountGuard,
    masks: Cache<(String, i64), PagePermission>,
}

impl std::fmt::Debug for AccessEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessEngine")
            .field("request_id", &self.context.request_id)
            .field("workspace", &self.context.workspace)
            .field("principal", &self.principal.as_ref().map(|p| p.id))
            .field("roles", &self.roles.role_ids)
            .field("hooks", &self.hooks)
            .finish()
    }
}

impl AccessEngine {
    /// Start a request.
    ///
    /// Expands the principal's roles and drops web mounts the principal
    /// cannot read. A principal outside its activity window is treated as
    /// absent.
    #[instrument(skip_all, fields(request_id = %context.request_id, workspace = context.workspace))]
    pub async fn begin(
        store: Arc<dyn RecordStore>,
        settings: Arc<EngineSettings>,
        hooks: Arc<PermissionHooks>,
        context: RequestContext,
    ) -> AccessResult<Self> {
        let principal = context.active_principal().cloned();
        let roles = match &principal {
            Some(principal) => {
                RoleExpander::new(store.as_ref())
                    .expand_for(principal)
                    .await?
            }
            None => ExpandedRoles::default(),
        };

        let overlay = VersionOverlay::new(store.clone(), settings.clone(), context.workspace);
        let mounts = match &principal {
            Some(p) if !p.is_admin && settings.lock_to_web_mounts => {
                let read = page_permissions_clause(PagePermission::SHOW, Some(p), &roles, &hooks);
                let mut readable = Vec::with_capacity(roles.data.webmounts.len());
                for mount in &roles.data.webmounts {
                    let row = store.fetch_record(&settings.page_table, *mount, &read).await?;
                    if row.is_some() {
                        readable.push(*mount);
                    } else {
                        debug!(mount = *mount, "dropping unreadable web mount");
                    }
                }
                WebMountGuard::new(readable)
            }
            Some(_) => WebMountGuard::unrestricted(),
            None => WebMountGuard::new(Vec::new()),
        };

        Ok(Self {
            rootline: RootlineResolver::new(overlay.clone()),
            overlay,
            mounts,
            masks: Cache::new("calc_perms"),
            roles,
            principal,
            hooks,
            settings,
            store,
            context,
        })
    }

    /// The request context.
    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    /// Engine settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The active principal, if any.
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The principal's expanded roles.
    pub fn expanded_roles(&self) -> &ExpandedRoles {
        &self.roles
    }

    /// Web mounts left after pruning unreadable ones.
    pub fn web_mounts(&self) -> &[i64] {
        self.mounts.mounts()
    }

    /// The version overlay of the request workspace.
    pub fn overlay(&self) -> &VersionOverlay {
        &self.overlay
    }

    fn require_principal(&self) -> AccessResult<&Principal> {
        self.principal.as_ref().ok_or(AccessError::Unauthenticated)
    }

    /// Build the predicate selecting rows on which `action` is granted.
    pub fn page_permissions_clause(&self, action: PagePermission) -> Predicate {
        page_permissions_clause(action, self.principal.as_ref(), &self.roles, &self.hooks)
    }

    /// The predicate selecting pages the principal may see.
    pub fn read_clause(&self) -> Predicate {
        self.page_permissions_clause(PagePermission::SHOW)
    }

    /// Compute the effective permission mask of `record` from `table`.
    ///
    /// # Errors
    ///
    /// [`AccessError::Unauthenticated`] without an active principal and
    /// [`AccessError::MissingOwnership`] for records without ownership
    /// columns.
    ///
    /// Masks are memoized per table and physical uid for the lifetime of the
    /// engine.
    #[instrument(
        skip(self, record),
        fields(request_id = %self.context.request_id, uid = record.uid)
    )]
    pub async fn calc_perms(&self, table: &str, record: &Record) -> AccessResult<PagePermission> {
        let principal = self.require_principal()?;
        let key = (table.to_string(), record.physical_uid());
        if record.ownership.is_some() {
            if let Some(mask) = self.masks.get(&key).await {
                return Ok(mask);
            }
        }
        let calculator = PermissionCalculator::new(principal, &self.roles, &self.hooks);

        let in_web_mount = if principal.is_admin || record.ownership.is_none() {
            true
        } else {
            let page = self.mount_anchor(table, record).await?;
            self.mounts
                .is_in_web_mount(&self.rootline, page, &self.read_clause())
                .await?
                .is_some()
        };
        let mask = calculator.calc_perms(table, record, in_web_mount)?;
        self.masks.insert(key, mask).await;
        Ok(mask)
    }

    /// Permission mask cache statistics.
    pub async fn mask_stats(&self) -> CacheStats {
        self.masks.stats().await
    }

    /// The page whose mount membership governs `record`.
    async fn mount_anchor(&self, table: &str, record: &Record) -> AccessResult<i64> {
        if self.settings.is_page_table(table) {
            return Ok(match record.version {
                Some(version) if version.oid > 0 => version.oid,
                _ => record.uid,
            });
        }
        let fixed = self
            .overlay
            .fix_versioning_pid(table, record.clone(), true)
            .await?;
        Ok(fixed.pid)
    }

    /// Check that every bit of `mask` is granted on `record`.
    pub async fn does_user_have_access(
        &self,
        table: &str,
        record: &Record,
        mask: PagePermission,
    ) -> AccessResult<bool> {
        Ok(self.calc_perms(table, record).await?.grants(mask))
    }

    /// Check an editing action on `record`.
    pub async fn is_allowed(
        &self,
        table: &str,
        record: &Record,
        action: Action,
    ) -> AccessResult<bool> {
        let mask = self.calc_perms(table, record).await?;
        let kind = ResourceKind::for_table(table, &self.settings.page_table);
        Ok(is_action_allowed(mask, &kind, action))
    }

    /// Find the web mount containing page `uid`, reading the rootline
    /// through the principal's read clause.
    pub async fn is_in_web_mount(&self, uid: i64) -> AccessResult<Option<i64>> {
        self.is_in_web_mount_with(uid, &self.read_clause()).await
    }

    /// Find the web mount containing page `uid` under an explicit read
    /// predicate.
    #[instrument(skip(self, read), fields(request_id = %self.context.request_id))]
    pub async fn is_in_web_mount_with(
        &self,
        uid: i64,
        read: &Predicate,
    ) -> AccessResult<Option<i64>> {
        self.require_principal()?;
        self.mounts.is_in_web_mount(&self.rootline, uid, read).await
    }

    /// Resolve the path from the root down to page `uid`.
    #[instrument(skip(self, filter), fields(request_id = %self.context.request_id))]
    pub async fn rootline(
        &self,
        uid: i64,
        filter: &Predicate,
        apply_overlay: bool,
    ) -> AccessResult<Vec<RootlineEntry>> {
        self.rootline.rootline(uid, filter, apply_overlay).await
    }

    /// Overlay a live row with its draft in the request workspace.
    #[instrument(skip(self, row), fields(request_id = %self.context.request_id, uid = row.uid))]
    pub async fn workspace_overlay(
        &self,
        table: &str,
        row: Record,
        unset_move_pointers: bool,
    ) -> AccessResult<Option<Record>> {
        self.overlay.workspace_ol(table, row, unset_move_pointers).await
    }

    /// Overlay a list of rows, dropping moved-away ones.
    pub async fn overlay_rows(
        &self,
        table: &str,
        rows: Vec<Record>,
        unset_move_pointers: bool,
    ) -> AccessResult<Vec<Record>> {
        self.overlay
            .overlay_rows(table, rows, unset_move_pointers)
            .await
    }

    /// Replace a draft's pid with that of its live origin.
    pub async fn fix_versioning_pid(
        &self,
        table: &str,
        row: Record,
        ignore_workspace_match: bool,
    ) -> AccessResult<Record> {
        self.overlay
            .fix_versioning_pid(table, row, ignore_workspace_match)
            .await
    }

    /// Check a value against one of the merged role lists.
    pub fn check(&self, list: DataList, value: &str) -> bool {
        self.principal.is_some() && self.roles.check(list, value)
    }

    /// Check access to a language.
    pub fn check_language_access(&self, language: i64) -> bool {
        self.principal.is_some() && self.roles.check_language_access(language)
    }

    /// Determine how the principal may access the request workspace.
    #[instrument(
        skip(self),
        fields(request_id = %self.context.request_id, workspace = self.context.workspace)
    )]
    pub async fn workspace_access(&self) -> AccessResult<Option<WorkspaceAccess>> {
        let principal = self.require_principal()?;
        let id = self.context.workspace;
        let workspace = if is_custom_workspace(id) && !principal.is_admin {
            self.store.fetch_workspace(id).await?
        } else {
            None
        };
        Ok(check_workspace(principal, &self.roles, id, workspace.as_ref()))
    }
}
