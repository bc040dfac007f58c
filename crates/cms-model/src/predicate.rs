//! Abstract filter predicates
//!
//! Predicates are boolean expressions over record columns that the engine
//! hands to the storage collaborator. They are plain data: hashable (so they
//! can key request caches), renderable for logs, and evaluable in memory.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::record::Record;

/// A record column a predicate can reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    /// `uid`
    Uid,
    /// `pid`
    Pid,
    /// `perms_userid`
    OwnerPrincipalId,
    /// `perms_groupid`
    OwnerRoleId,
    /// `perms_user`
    OwnerBits,
    /// `perms_group`
    RoleBits,
    /// `perms_everybody`
    EveryoneBits,
    /// `t3ver_oid`
    VersionOid,
    /// `t3ver_wsid`
    VersionWorkspace,
    /// `t3ver_state`
    VersionState,
    /// `t3ver_move_id`
    VersionMoveId,
    /// Any other integer column
    Column(String),
}

impl Field {
    /// Get the stored column name.
    pub fn column(&self) -> &str {
        match self {
            Field::Uid => "uid",
            Field::Pid => "pid",
            Field::OwnerPrincipalId => "perms_userid",
            Field::OwnerRoleId => "perms_groupid",
            Field::OwnerBits => "perms_user",
            Field::RoleBits => "perms_group",
            Field::EveryoneBits => "perms_everybody",
            Field::VersionOid => "t3ver_oid",
            Field::VersionWorkspace => "t3ver_wsid",
            Field::VersionState => "t3ver_state",
            Field::VersionMoveId => "t3ver_move_id",
            Field::Column(name) => name,
        }
    }

    /// Read this column from a record.
    ///
    /// Returns `None` when the record does not carry the column.
    pub fn value_of(&self, record: &Record) -> Option<i64> {
        match self {
            Field::Uid => Some(record.uid),
            Field::Pid => Some(record.pid),
            Field::OwnerPrincipalId => record.ownership.map(|o| o.owner_principal_id),
            Field::OwnerRoleId => record.ownership.map(|o| o.owner_role_id),
            Field::OwnerBits => record.ownership.map(|o| i64::from(o.owner_bits)),
            Field::RoleBits => record.ownership.map(|o| i64::from(o.role_bits)),
            Field::EveryoneBits => record.ownership.map(|o| i64::from(o.everyone_bits)),
            Field::VersionOid => record.version.map(|v| v.oid),
            Field::VersionWorkspace => record.version.map(|v| v.wsid),
            Field::VersionState => record.version.map(|v| i64::from(v.state.as_i32())),
            Field::VersionMoveId => record.version.map(|v| v.move_id),
            Field::Column(name) => record.int_field(name),
        }
    }
}

/// A composable boolean expression over record columns.
///
/// # Examples
///
/// ```
/// use cms_model::{Field, Predicate, Record};
///
/// let clause = Predicate::eq(Field::Pid, 1).and(Predicate::in_list(Field::Uid, [3, 4]));
/// assert!(clause.evaluate(&Record::new(3, 1)));
/// assert!(!clause.evaluate(&Record::new(5, 1)));
/// assert_eq!(clause.to_string(), "(pid = 1 AND uid IN (3,4))");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Always true
    True,
    /// Always false
    False,
    /// `field = value`
    Eq(Field, i64),
    /// `field IN (values)`
    In(Field, Vec<i64>),
    /// `field & mask = mask`
    BitsSet(Field, i64),
    /// Conjunction
    And(Vec<Predicate>),
    /// Disjunction
    Or(Vec<Predicate>),
    /// Negation
    Not(Box<Predicate>),
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::True
    }
}

impl Predicate {
    /// `field = value`
    pub fn eq(field: Field, value: i64) -> Self {
        Predicate::Eq(field, value)
    }

    /// `field IN (values)`; an empty list never matches.
    pub fn in_list(field: Field, values: impl IntoIterator<Item = i64>) -> Self {
        Predicate::In(field, values.into_iter().collect())
    }

    /// `field & mask = mask`
    pub fn bits_set(field: Field, mask: i64) -> Self {
        Predicate::BitsSet(field, mask)
    }

    /// Conjunction with another predicate, flattening trivial operands.
    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::True, p) | (p, Predicate::True) => p,
            (Predicate::False, _) | (_, Predicate::False) => Predicate::False,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, other) => Predicate::And(vec![p, other]),
        }
    }

    /// Disjunction with another predicate, flattening trivial operands.
    pub fn or(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::False, p) | (p, Predicate::False) => p,
            (Predicate::True, _) | (_, Predicate::True) => Predicate::True,
            (Predicate::Or(mut left), Predicate::Or(right)) => {
                left.extend(right);
                Predicate::Or(left)
            }
            (Predicate::Or(mut left), p) => {
                left.push(p);
                Predicate::Or(left)
            }
            (p, other) => Predicate::Or(vec![p, other]),
        }
    }

    /// Negation.
    pub fn negate(self) -> Self {
        match self {
            Predicate::True => Predicate::False,
            Predicate::False => Predicate::True,
            Predicate::Not(inner) => *inner,
            p => Predicate::Not(Box::new(p)),
        }
    }

    /// Evaluate against a record. Missing columns compare as non-matching.
    pub fn evaluate(&self, record: &Record) -> bool {
        match self {
            Predicate::True => true,
            Predicate::False => false,
            Predicate::Eq(field, value) => field.value_of(record) == Some(*value),
            Predicate::In(field, values) => field
                .value_of(record)
                .is_some_and(|v| values.contains(&v)),
            Predicate::BitsSet(field, mask) => field
                .value_of(record)
                .is_some_and(|v| v & mask == *mask),
            Predicate::And(parts) => parts.iter().all(|p| p.evaluate(record)),
            Predicate::Or(parts) => parts.iter().any(|p| p.evaluate(record)),
            Predicate::Not(inner) => !inner.evaluate(record),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::True => write!(f, "1=1"),
            Predicate::False => write!(f, "1=0"),
            Predicate::Eq(field, value) => write!(f, "{} = {}", field.column(), value),
            Predicate::In(field, values) => {
                let list: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} IN ({})", field.column(), list.join(","))
            }
            Predicate::BitsSet(field, mask) => {
                write!(f, "{} & {} = {}", field.column(), mask, mask)
            }
            Predicate::And(parts) => write_joined(f, parts, " AND "),
            Predicate::Or(parts) => write_joined(f, parts, " OR "),
            Predicate::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, parts: &[Predicate], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", part)?;
    }
    write!(f, ")")
}
