//! Storage collaborator contract
//!
//! The engine only ever reads. Every query implicitly excludes soft-deleted
//! rows; callers compose any further restriction as a [`Predicate`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::predicate::{Field, Predicate};
use crate::record::Record;
use crate::role::{Role, RoleId};
use crate::workspace::{Workspace, WorkspaceId};

/// Read access to the relational store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one non-deleted row by uid, if it also satisfies `extra`.
    async fn fetch_record(
        &self,
        table: &str,
        uid: i64,
        extra: &Predicate,
    ) -> StoreResult<Option<Record>>;

    /// Fetch all non-deleted rows matching `filter`, ordered by uid.
    async fn fetch_records(&self, table: &str, filter: &Predicate) -> StoreResult<Vec<Record>>;

    /// Fetch the roles with the given IDs. Unknown IDs are omitted.
    async fn fetch_roles(&self, ids: &[RoleId]) -> StoreResult<Vec<Role>>;

    /// Fetch a workspace record.
    async fn fetch_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>>;

    /// Fetch the non-deleted children of a parent.
    async fn fetch_children(
        &self,
        table: &str,
        pid: i64,
        extra: &Predicate,
    ) -> StoreResult<Vec<Record>> {
        let filter = Predicate::eq(Field::Pid, pid).and(extra.clone());
        self.fetch_records(table, &filter).await
    }
}

/// Store statistics.
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    /// Round-trips served
    pub queries: usize,
    /// Rows held
    pub records: usize,
    /// Roles held
    pub roles: usize,
}

/// In-memory store implementation.
///
/// This is suitable for tests and embedding. It evaluates predicates in
/// memory and counts round-trips so callers can observe memoization.
#[derive(Default)]
pub struct MemoryStore {
    /// Rows by table, then uid
    tables: Arc<RwLock<HashMap<String, HashMap<i64, Record>>>>,
    /// Roles by ID
    roles: Arc<RwLock<HashMap<RoleId, Role>>>,
    /// Workspaces by ID
    workspaces: Arc<RwLock<HashMap<WorkspaceId, Workspace>>>,
    /// Query counter
    queries: AtomicUsize,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("queries", &self.queries.load(Ordering::Relaxed))
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row.
    pub async fn insert_record(&self, table: &str, record: Record) {
        let mut tables = self.tables.write().await;
        tables
            .entry(table.to_string())
            .or_default()
            .insert(record.uid, record);
    }

    /// Insert or replace a role.
    pub async fn insert_role(&self, role: Role) {
        self.roles.write().await.insert(role.id, role);
    }

    /// Insert or replace a workspace.
    pub async fn insert_workspace(&self, workspace: Workspace) {
        self.workspaces.write().await.insert(workspace.id, workspace);
    }

    /// Round-trips served so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    /// Snapshot statistics.
    pub async fn stats(&self) -> StoreStats {
        let records = self.tables.read().await.values().map(HashMap::len).sum();
        StoreStats {
            queries: self.query_count(),
            records,
            roles: self.roles.read().await.len(),
        }
    }

    fn count_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn fetch_record(
        &self,
        table: &str,
        uid: i64,
        extra: &Predicate,
    ) -> StoreResult<Option<Record>> {
        self.count_query();
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.get(&uid))
            .filter(|row| !row.deleted && extra.evaluate(row))
            .cloned())
    }

    async fn fetch_records(&self, table: &str, filter: &Predicate) -> StoreResult<Vec<Record>> {
        self.count_query();
        let tables = self.tables.read().await;
        let mut rows: Vec<Record> = tables
            .get(table)
            .map(|rows| {
                rows.values()
                    .filter(|row| !row.deleted && filter.evaluate(row))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        rows.sort_by_key(|row| row.uid);
        Ok(rows)
    }

    async fn fetch_roles(&self, ids: &[RoleId]) -> StoreResult<Vec<Role>> {
        self.count_query();
        let roles = self.roles.read().await;
        let mut found: Vec<Role> = Vec::new();
        for id in ids {
            if found.iter().any(|r| r.id == *id) {
                continue;
            }
            if let Some(role) = roles.get(id) {
                found.push(role.clone());
            }
        }
        Ok(found)
    }

    async fn fetch_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>> {
        self.count_query();
        Ok(self.workspaces.read().await.get(&id).cloned())
    }
}
