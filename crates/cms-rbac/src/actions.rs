//! # Actions
//!
//! Defines the editing actions checked against a computed page permission
//! mask, and the resource kinds they apply to.

use serde::{Deserialize, Serialize};

use crate::permissions::PagePermission;

/// Editing actions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Edit the record itself
    Edit,
    /// Create a new record beneath it
    New,
    /// Delete the record
    Delete,
    /// Edit content placed on it
    EditContent,
}

impl Action {
    /// Get the string representation of the action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Edit => "edit",
            Action::New => "new",
            Action::Delete => "delete",
            Action::EditContent => "edit_content",
        }
    }

    /// Parse action from string representation.
    ///
    /// # Example
    ///
    /// ```
    /// use cms_rbac::Action;
    ///
    /// assert_eq!(Action::parse("edit"), Some(Action::Edit));
    /// assert_eq!(Action::parse("editContent"), Some(Action::EditContent));
    /// assert_eq!(Action::parse("create"), Some(Action::New));
    /// assert_eq!(Action::parse("publish"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "edit" | "update" => Some(Action::Edit),
            "new" | "create" => Some(Action::New),
            "delete" | "remove" => Some(Action::Delete),
            "editcontent" | "edit_content" => Some(Action::EditContent),
            _ => None,
        }
    }

    /// Get all actions.
    pub fn all() -> Vec<Self> {
        vec![Action::Edit, Action::New, Action::Delete, Action::EditContent]
    }

    /// The permission bit this action needs on a page.
    pub fn page_bit(&self) -> PagePermission {
        match self {
            Action::Edit => PagePermission::EDIT_PAGE,
            Action::New => PagePermission::NEW_SUBPAGE,
            Action::Delete => PagePermission::DELETE,
            Action::EditContent => PagePermission::EDIT_CONTENT,
        }
    }
}

/// What kind of resource a permission mask was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "table")]
pub enum ResourceKind {
    /// A node of the page tree
    Page,
    /// A record stored on a page
    Record(String),
}

impl ResourceKind {
    /// Classify a table, given the name of the page table.
    ///
    /// # Example
    ///
    /// ```
    /// use cms_rbac::ResourceKind;
    ///
    /// assert_eq!(ResourceKind::for_table("pages", "pages"), ResourceKind::Page);
    /// assert_eq!(
    ///     ResourceKind::for_table("tt_content", "pages"),
    ///     ResourceKind::Record("tt_content".to_string())
    /// );
    /// ```
    pub fn for_table(table: &str, page_table: &str) -> Self {
        if table == page_table {
            ResourceKind::Page
        } else {
            ResourceKind::Record(table.to_string())
        }
    }

    /// Check if this is the page kind.
    pub fn is_page(&self) -> bool {
        matches!(self, ResourceKind::Page)
    }
}

/// Check an action against a computed permission mask.
///
/// Pages use the bit of the requested action. Every other kind is gated by
/// [`PagePermission::EDIT_CONTENT`] alone, whatever the action.
///
/// # Example
///
/// ```
/// use cms_rbac::{is_action_allowed, Action, PagePermission, ResourceKind};
///
/// let mask = PagePermission::from_stored(17);
/// assert!(is_action_allowed(mask, &ResourceKind::Page, Action::EditContent));
/// assert!(!is_action_allowed(mask, &ResourceKind::Page, Action::Delete));
///
/// let content = ResourceKind::Record("tt_content".to_string());
/// assert!(is_action_allowed(mask, &content, Action::Delete));
/// ```
pub fn is_action_allowed(mask: PagePermission, kind: &ResourceKind, action: Action) -> bool {
    // TODO: confirm against the write pipeline whether non-page kinds should honour the action bit.
    let required = match kind {
        ResourceKind::Page => action.page_bit(),
        ResourceKind::Record(_) => PagePermission::EDIT_CONTENT,
    };
    mask.grants(required)
}
