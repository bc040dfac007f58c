//! Principal domain model
//!
//! A principal is the authenticated backend actor a request runs on behalf
//! of. It is an externally persisted, read-only input to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::role::RoleId;

/// Principal identifier.
pub type PrincipalId = i64;

/// An authenticated backend principal.
///
/// # Examples
///
/// ```
/// use cms_model::Principal;
///
/// let principal = Principal::new(7).with_roles([2, 3]).with_webmounts([1]);
/// assert!(!principal.is_admin);
/// assert_eq!(principal.role_ids, vec![2, 3]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Principal ID
    pub id: PrincipalId,

    /// Administrators bypass every permission check
    #[serde(default)]
    pub is_admin: bool,

    /// Directly assigned role IDs, in assignment order
    #[serde(default)]
    pub role_ids: Vec<RoleId>,

    /// Principal's own web-mount roots
    #[serde(default)]
    pub webmounts: Vec<i64>,

    /// Principal's own file-mount IDs
    #[serde(default)]
    pub file_mounts: Vec<i64>,

    /// Principal's own allowed language IDs
    #[serde(default)]
    pub allowed_languages: Vec<i64>,

    /// Principal's own file permission keys
    #[serde(default)]
    pub file_permissions: Vec<String>,

    /// Principal's own workspace permission bits
    #[serde(default)]
    pub workspace_perms: u8,

    /// Which role mounts are inherited
    #[serde(default)]
    pub options: MountOptions,

    /// Whether the account is disabled
    #[serde(default)]
    pub disabled: bool,

    /// Account becomes valid at
    pub starts_at: Option<DateTime<Utc>>,

    /// Account stops being valid at
    pub ends_at: Option<DateTime<Utc>>,
}

impl Principal {
    /// Creates an active, non-admin principal without roles or mounts.
    ///
    /// Role mounts are inherited by default.
    pub fn new(id: PrincipalId) -> Self {
        Self {
            id,
            is_admin: false,
            role_ids: Vec::new(),
            webmounts: Vec::new(),
            file_mounts: Vec::new(),
            allowed_languages: Vec::new(),
            file_permissions: Vec::new(),
            workspace_perms: 0,
            options: MountOptions::default(),
            disabled: false,
            starts_at: None,
            ends_at: None,
        }
    }

    /// Creates an administrator.
    pub fn admin(id: PrincipalId) -> Self {
        Self {
            is_admin: true,
            ..Self::new(id)
        }
    }

    /// Set the directly assigned roles.
    pub fn with_roles(mut self, roles: impl IntoIterator<Item = RoleId>) -> Self {
        self.role_ids = roles.into_iter().collect();
        self
    }

    /// Set the principal's own web mounts.
    pub fn with_webmounts(mut self, mounts: impl IntoIterator<Item = i64>) -> Self {
        self.webmounts = mounts.into_iter().collect();
        self
    }

    /// Set the principal's own workspace permission bits.
    pub fn with_workspace_perms(mut self, bits: u8) -> Self {
        self.workspace_perms = bits;
        self
    }

    /// Set the mount inheritance options.
    pub fn with_options(mut self, options: MountOptions) -> Self {
        self.options = options;
        self
    }

    /// Check whether the account may act at the given instant.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use cms_model::Principal;
    ///
    /// let now = Utc::now();
    /// let mut principal = Principal::new(1);
    /// assert!(principal.is_active_at(now));
    ///
    /// principal.ends_at = Some(now - Duration::hours(1));
    /// assert!(!principal.is_active_at(now));
    /// ```
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.disabled {
            return false;
        }
        if matches!(self.starts_at, Some(start) if now < start) {
            return false;
        }
        if matches!(self.ends_at, Some(end) if now >= end) {
            return false;
        }
        true
    }
}

/// Controls whether mounts granted by roles are added to the principal's own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountOptions {
    /// Inherit web mounts from roles
    pub role_webmounts: bool,

    /// Inherit file mounts from roles
    pub role_file_mounts: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            role_webmounts: true,
            role_file_mounts: true,
        }
    }
}

impl MountOptions {
    /// Decode the stored option bits (1 = web mounts, 2 = file mounts).
    pub fn from_bits(bits: u8) -> Self {
        Self {
            role_webmounts: bits & 1 == 1,
            role_file_mounts: bits & 2 == 2,
        }
    }

    /// Encode as stored option bits.
    pub fn bits(&self) -> u8 {
        u8::from(self.role_webmounts) | (u8::from(self.role_file_mounts) << 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_principal_creation() {
        let principal = Principal::new(5);
        assert_eq!(principal.id, 5);
        assert!(!principal.is_admin);
        assert!(principal.role_ids.is_empty());
        assert_eq!(principal.options, MountOptions::default());
    }

    #[test]
    fn test_admin() {
        let admin = Principal::admin(1);
        assert!(admin.is_admin);
        assert_eq!(admin.id, 1);
    }

    #[test]
    fn test_activity_window() {
        let now = Utc::now();
        let mut principal = Principal::new(1);
        principal.starts_at = Some(now + Duration::minutes(5));
        assert!(!principal.is_active_at(now));

        principal.starts_at = Some(now - Duration::minutes(5));
        assert!(principal.is_active_at(now));

        principal.disabled = true;
        assert!(!principal.is_active_at(now));
    }

    #[test]
    fn test_mount_option_bits() {
        assert_eq!(MountOptions::from_bits(3), MountOptions::default());
        let web_only = MountOptions::from_bits(1);
        assert!(web_only.role_webmounts);
        assert!(!web_only.role_file_mounts);
        assert_eq!(web_only.bits(), 1);
        assert_eq!(MountOptions::from_bits(0).bits(), 0);
    }
}
