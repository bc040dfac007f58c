//! # Permissions
//!
//! Bitmask permission types. Page permissions are stored per record in three
//! masks (owner, owning role, everyone); workspace permissions are stored
//! per principal and role and OR-ed together.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Page permission bits.
    ///
    /// # Example
    ///
    /// ```
    /// use cms_rbac::PagePermission;
    ///
    /// let mask = PagePermission::SHOW | PagePermission::EDIT_CONTENT;
    /// assert_eq!(mask.bits(), 17);
    /// assert!(mask.grants(PagePermission::SHOW));
    /// assert!(!mask.grants(PagePermission::SHOW | PagePermission::DELETE));
    /// assert_eq!(PagePermission::ALL.bits(), 31);
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PagePermission: u8 {
        /// See the page in listings and trees
        const SHOW = 1;
        /// Edit the page's own properties
        const EDIT_PAGE = 2;
        /// Delete the page
        const DELETE = 4;
        /// Create pages beneath the page
        const NEW_SUBPAGE = 8;
        /// Edit content elements on the page
        const EDIT_CONTENT = 16;
    }
}

impl PagePermission {
    /// No permission at all.
    pub const NOTHING: Self = Self::empty();

    /// Every permission.
    pub const ALL: Self = Self::all();

    /// Decode a stored mask, ignoring unknown bits.
    pub fn from_stored(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// Check whether every bit of `required` is present.
    pub fn grants(&self, required: PagePermission) -> bool {
        self.contains(required)
    }
}

impl Default for PagePermission {
    fn default() -> Self {
        Self::NOTHING
    }
}

bitflags! {
    /// Workspace permission bits.
    ///
    /// # Example
    ///
    /// ```
    /// use cms_rbac::WorkspacePermission;
    ///
    /// let perms = WorkspacePermission::from_stored(1) | WorkspacePermission::from_stored(4);
    /// assert!(perms.contains(WorkspacePermission::LIVE));
    /// assert!(perms.contains(WorkspacePermission::CREATE));
    /// assert!(!perms.contains(WorkspacePermission::DRAFT));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct WorkspacePermission: u8 {
        /// Work in the live workspace
        const LIVE = 1;
        /// Work in the default draft workspace
        const DRAFT = 2;
        /// Create custom workspaces
        const CREATE = 4;
    }
}

impl WorkspacePermission {
    /// Decode stored bits, ignoring unknown ones.
    pub fn from_stored(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl Default for WorkspacePermission {
    fn default() -> Self {
        Self::empty()
    }
}
