//! Request context
//!
//! Everything the engine would otherwise read from ambient session state
//! (current principal, current workspace, current time) is carried here and
//! passed explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::principal::Principal;
use crate::workspace::{WorkspaceId, LIVE_WORKSPACE};

/// Per-request inputs of the access engine.
///
/// # Examples
///
/// ```
/// use cms_model::{Principal, RequestContext};
///
/// let ctx = RequestContext::new(Some(Principal::new(3))).in_workspace(7);
/// assert_eq!(ctx.workspace, 7);
/// assert!(ctx.active_principal().is_some());
///
/// let anonymous = RequestContext::anonymous();
/// assert!(anonymous.active_principal().is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Correlation ID recorded on log spans
    pub request_id: Uuid,

    /// Authenticated principal, if any
    pub principal: Option<Principal>,

    /// Workspace the request operates in
    pub workspace: WorkspaceId,

    /// Request time
    pub now: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a live-workspace context stamped with the current time.
    pub fn new(principal: Option<Principal>) -> Self {
        Self {
            request_id: Uuid::now_v7(),
            principal,
            workspace: LIVE_WORKSPACE,
            now: Utc::now(),
        }
    }

    /// Creates a context without a principal.
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// Set the workspace.
    pub fn in_workspace(mut self, workspace: WorkspaceId) -> Self {
        self.workspace = workspace;
        self
    }

    /// Set the request time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// The principal, provided it is active at request time.
    pub fn active_principal(&self) -> Option<&Principal> {
        self.principal
            .as_ref()
            .filter(|principal| principal.is_active_at(self.now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_expired_principal_is_not_active() {
        let now = Utc::now();
        let mut principal = Principal::new(4);
        principal.ends_at = Some(now - Duration::days(1));

        let ctx = RequestContext::new(Some(principal)).at(now);
        assert!(ctx.principal.is_some());
        assert!(ctx.active_principal().is_none());
    }

    #[test]
    fn test_defaults_to_live_workspace() {
        let ctx = RequestContext::anonymous();
        assert_eq!(ctx.workspace, LIVE_WORKSPACE);
    }
}
