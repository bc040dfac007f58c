//! Web-mount containment
//!
//! A non-admin principal only reaches pages below one of its web mounts.

use cms_model::{AccessResult, Predicate};
use tracing::trace;

use crate::cache::Cache;
use crate::rootline::RootlineResolver;

/// Checks pages against a fixed set of mount roots.
#[derive(Debug)]
pub struct WebMountGuard {
    mounts: Vec<i64>,
    bypass: bool,
    memo: Cache<(i64, Predicate), Option<i64>>,
}

impl WebMountGuard {
    /// Creates a guard restricting access to `mounts`.
    pub fn new(mounts: Vec<i64>) -> Self {
        Self {
            mounts,
            bypass: false,
            memo: Cache::new("webmount"),
        }
    }

    /// Creates a guard that reaches everything.
    ///
    /// Used for administrators and when mount locking is switched off.
    pub fn unrestricted() -> Self {
        Self {
            bypass: true,
            ..Self::new(Vec::new())
        }
    }

    /// The mount roots checked against.
    pub fn mounts(&self) -> &[i64] {
        &self.mounts
    }

    /// Check whether every page is reachable.
    pub fn is_unrestricted(&self) -> bool {
        self.bypass
    }

    /// Find the mount containing page `uid`.
    ///
    /// The rootline is resolved under `read`, so pages the principal cannot
    /// see cut the path short. Returns the nearest mount on the path,
    /// counting the page itself, or `None` when the page is out of reach.
    /// An unrestricted guard answers with the tree root, `Some(0)`.
    pub async fn is_in_web_mount(
        &self,
        rootline: &RootlineResolver,
        uid: i64,
        read: &Predicate,
    ) -> AccessResult<Option<i64>> {
        if self.bypass {
            return Ok(Some(0));
        }
        let key = (uid, read.clone());
        if let Some(found) = self.memo.get(&key).await {
            return Ok(found);
        }

        let overlay = rootline.overlay();
        let start = overlay
            .get_live_version_id(&overlay.settings().page_table, uid)
            .await?
            .unwrap_or(uid);

        let mut found = None;
        if start > 0 {
            let path = rootline.rootline(start, read, false).await?;
            found = path
                .iter()
                .rev()
                .map(|entry| entry.uid)
                .find(|uid| *uid != 0 && self.mounts.contains(uid));
        }
        trace!(uid, start, mount = ?found, "web-mount check");

        self.memo.insert(key, found).await;
        Ok(found)
    }
}
