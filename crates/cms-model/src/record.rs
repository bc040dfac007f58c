//! Resource records
//!
//! A [`Record`] is one row of a hierarchical, ownable, optionally versioned
//! table. Draft rows live next to their live counterpart, marked by
//! `pid == -1`, and point back to it through `t3ver_oid`.
//!
//! Overlay output carries derived markers (`_ORIG_uid`, `_ORIG_pid`,
//! `_MOVE_PLH_*`, `_CSSCLASS`) that never exist in storage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::principal::PrincipalId;
use crate::role::RoleId;
use crate::workspace::WorkspaceId;

/// The pid stored on every draft row.
pub const DRAFT_PID: i64 = -1;

/// Version lifecycle state of a row.
///
/// The integer encodings are a persisted format and must never change.
///
/// # Examples
///
/// ```
/// use cms_model::VersionState;
///
/// assert_eq!(i32::from(VersionState::MovePointer), 4);
/// assert_eq!(VersionState::try_from(-1), Ok(VersionState::NewPlaceholderVersion));
/// assert!(VersionState::try_from(9).is_err());
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(try_from = "i32", into = "i32")]
pub enum VersionState {
    /// Ordinary row
    #[default]
    Default,
    /// Draft version of a record created in a workspace
    NewPlaceholderVersion,
    /// Live-side placeholder of a record created in a workspace
    NewPlaceholder,
    /// Draft marking its live record as deleted
    DeletePlaceholder,
    /// Live-side row marking where a moved record now lives
    MovePlaceholder,
    /// Draft marking where a moved record used to live
    MovePointer,
}

impl VersionState {
    /// Get the stored integer encoding.
    pub fn as_i32(&self) -> i32 {
        match self {
            VersionState::NewPlaceholderVersion => -1,
            VersionState::Default => 0,
            VersionState::NewPlaceholder => 1,
            VersionState::DeletePlaceholder => 2,
            VersionState::MovePlaceholder => 3,
            VersionState::MovePointer => 4,
        }
    }

    /// Check if this row is a placeholder that must not be edited directly.
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            VersionState::NewPlaceholder
                | VersionState::DeletePlaceholder
                | VersionState::MovePlaceholder
        )
    }
}

/// Error for an unknown stored version-state value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownVersionState(pub i32);

impl fmt::Display for UnknownVersionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown version state {}", self.0)
    }
}

impl std::error::Error for UnknownVersionState {}

impl TryFrom<i32> for VersionState {
    type Error = UnknownVersionState;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(VersionState::NewPlaceholderVersion),
            0 => Ok(VersionState::Default),
            1 => Ok(VersionState::NewPlaceholder),
            2 => Ok(VersionState::DeletePlaceholder),
            3 => Ok(VersionState::MovePlaceholder),
            4 => Ok(VersionState::MovePointer),
            other => Err(UnknownVersionState(other)),
        }
    }
}

impl From<VersionState> for i32 {
    fn from(state: VersionState) -> Self {
        state.as_i32()
    }
}

/// Versioning columns of a row.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionFields {
    /// Live uid this draft shadows (0 on live rows)
    #[serde(rename = "t3ver_oid", default)]
    pub oid: i64,

    /// Owning workspace (0 on live rows)
    #[serde(rename = "t3ver_wsid", default)]
    pub wsid: WorkspaceId,

    /// Lifecycle state
    #[serde(rename = "t3ver_state", default)]
    pub state: VersionState,

    /// Target of a move placeholder
    #[serde(rename = "t3ver_move_id", default)]
    pub move_id: i64,

    /// Review stage, opaque to the engine
    #[serde(rename = "t3ver_stage", default)]
    pub stage: i32,
}

impl VersionFields {
    /// Columns of a draft row for `oid` in workspace `wsid`.
    pub fn draft(oid: i64, wsid: WorkspaceId, state: VersionState) -> Self {
        Self {
            oid,
            wsid,
            state,
            move_id: 0,
            stage: 0,
        }
    }

    /// Columns of a move placeholder pointing at `move_id`.
    pub fn move_placeholder(move_id: i64, wsid: WorkspaceId) -> Self {
        Self {
            oid: 0,
            wsid,
            state: VersionState::MovePlaceholder,
            move_id,
            stage: 0,
        }
    }
}

/// Ownership and permission columns of a row.
///
/// The bitmasks are stored raw; bits beyond the known permission set are
/// ignored by the permission calculator.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ownership {
    /// Owning principal
    #[serde(rename = "perms_userid", default)]
    pub owner_principal_id: PrincipalId,

    /// Owning role
    #[serde(rename = "perms_groupid", default)]
    pub owner_role_id: RoleId,

    /// Bits granted to the owning principal
    #[serde(rename = "perms_user", default)]
    pub owner_bits: u8,

    /// Bits granted to members of the owning role
    #[serde(rename = "perms_group", default)]
    pub role_bits: u8,

    /// Bits granted to everyone
    #[serde(rename = "perms_everybody", default)]
    pub everyone_bits: u8,
}

/// Original position of a move placeholder swapped during overlay.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovePlaceholderOrigin {
    /// Uid before the swap
    pub uid: i64,
    /// Pid before the swap
    pub pid: i64,
}

/// Markers attached by overlay; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverlayMarkers {
    /// Physical uid of the draft addressed through a live uid
    #[serde(rename = "_ORIG_uid", default, skip_serializing_if = "Option::is_none")]
    pub orig_uid: Option<i64>,

    /// Pid before correction (`-1` for drafts)
    #[serde(rename = "_ORIG_pid", default, skip_serializing_if = "Option::is_none")]
    pub orig_pid: Option<i64>,

    /// Position before a move-placeholder swap
    #[serde(rename = "_MOVE_PLH", default, skip_serializing_if = "Option::is_none")]
    pub move_placeholder: Option<MovePlaceholderOrigin>,

    /// Presentation class, passed through opaquely
    #[serde(rename = "_CSSCLASS", default, skip_serializing_if = "Option::is_none")]
    pub css_class: Option<String>,
}

/// A resource row.
///
/// # Examples
///
/// ```
/// use cms_model::{Record, VersionFields, VersionState};
///
/// let live = Record::new(10, 1).with_title("About");
/// assert!(!live.is_draft());
///
/// let draft = Record::new(42, -1)
///     .with_version(VersionFields::draft(10, 7, VersionState::Default));
/// assert!(draft.is_draft());
/// assert_eq!(draft.physical_uid(), 42);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Row uid
    pub uid: i64,

    /// Parent uid, or `-1` for drafts
    pub pid: i64,

    /// Title
    #[serde(default)]
    pub title: String,

    /// Soft-delete flag
    #[serde(default)]
    pub deleted: bool,

    /// Ownership columns, absent on tables without them
    #[serde(default)]
    pub ownership: Option<Ownership>,

    /// Versioning columns, absent when not selected or not versioned
    #[serde(default)]
    pub version: Option<VersionFields>,

    /// Remaining columns, opaque to the engine
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,

    /// Overlay markers
    #[serde(flatten)]
    pub overlay: OverlayMarkers,
}

impl Record {
    /// Creates a row with the given identity and no optional columns.
    pub fn new(uid: i64, pid: i64) -> Self {
        Self {
            uid,
            pid,
            ..Self::default()
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the ownership columns.
    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = Some(ownership);
        self
    }

    /// Set the versioning columns.
    pub fn with_version(mut self, version: VersionFields) -> Self {
        self.version = Some(version);
        self
    }

    /// Set an opaque column.
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    /// Mark the row as soft-deleted.
    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    /// Check if this row is a draft.
    pub fn is_draft(&self) -> bool {
        self.pid == DRAFT_PID
    }

    /// The uid write operations must target.
    ///
    /// For an overlaid draft this is the draft's own uid, not the live uid
    /// it is addressed through.
    pub fn physical_uid(&self) -> i64 {
        self.overlay.orig_uid.unwrap_or(self.uid)
    }

    /// Version state, treating missing columns as [`VersionState::Default`].
    pub fn version_state(&self) -> VersionState {
        self.version.map(|v| v.state).unwrap_or_default()
    }

    /// Read an opaque column as an integer.
    pub fn int_field(&self, name: &str) -> Option<i64> {
        match self.fields.get(name)? {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::Bool(b) => Some(i64::from(*b)),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_state_encoding_is_stable() {
        let expected = [
            (VersionState::NewPlaceholderVersion, -1),
            (VersionState::Default, 0),
            (VersionState::NewPlaceholder, 1),
            (VersionState::DeletePlaceholder, 2),
            (VersionState::MovePlaceholder, 3),
            (VersionState::MovePointer, 4),
        ];
        for (state, raw) in expected {
            assert_eq!(state.as_i32(), raw);
            assert_eq!(VersionState::try_from(raw), Ok(state));
        }
        assert_eq!(VersionState::try_from(5), Err(UnknownVersionState(5)));
    }

    #[test]
    fn test_version_state_serde_uses_integers() {
        let fields = VersionFields::move_placeholder(10, 7);
        let json = serde_json::to_value(fields).unwrap();
        assert_eq!(json["t3ver_state"], 3);
        assert_eq!(json["t3ver_move_id"], 10);

        let bad: Result<VersionFields, _> =
            serde_json::from_value(serde_json::json!({"t3ver_state": 12}));
        assert!(bad.is_err());
    }

    #[test]
    fn test_overlay_markers_serialize_with_stored_names() {
        let mut record = Record::new(10, 3);
        record.overlay.orig_uid = Some(42);
        record.overlay.move_placeholder = Some(MovePlaceholderOrigin { uid: 10, pid: 1 });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["_ORIG_uid"], 42);
        assert_eq!(json["_MOVE_PLH"]["pid"], 1);
        assert!(json.get("_ORIG_pid").is_none());
        assert_eq!(record.physical_uid(), 42);
    }

    #[test]
    fn test_int_field() {
        let record = Record::new(1, 0)
            .with_field("doktype", serde_json::json!(254))
            .with_field("sorting", serde_json::json!("12"))
            .with_field("hidden", serde_json::json!(true));
        assert_eq!(record.int_field("doktype"), Some(254));
        assert_eq!(record.int_field("sorting"), Some(12));
        assert_eq!(record.int_field("hidden"), Some(1));
        assert_eq!(record.int_field("missing"), None);
    }

    #[test]
    fn test_placeholder_states() {
        assert!(VersionState::MovePlaceholder.is_placeholder());
        assert!(VersionState::DeletePlaceholder.is_placeholder());
        assert!(!VersionState::MovePointer.is_placeholder());
        assert!(!VersionState::Default.is_placeholder());
    }
}
