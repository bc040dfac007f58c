//! # Permission calculator
//!
//! Computes the effective page permission mask of a record from its
//! ownership columns, and builds the equivalent storage predicate used to
//! filter rows a principal may act on.
//!
//! ```text
//! effective = owner_bits    if record.owner == principal
//!           | role_bits     if record.owner_role ∈ expanded roles
//!           | everyone_bits
//! ```
//!
//! Administrators short-circuit to [`PagePermission::ALL`] and records
//! outside the principal's web mounts get [`PagePermission::NOTHING`]. The
//! mount check itself needs the rootline, so callers pass its outcome in.

use cms_model::{AccessError, AccessResult, Field, Predicate, Principal, Record};

use crate::hooks::PermissionHooks;
use crate::permissions::PagePermission;
use crate::roles::ExpandedRoles;

/// Build the predicate selecting rows on which `action` is granted.
///
/// Returns [`Predicate::True`] for administrators and [`Predicate::False`]
/// when there is no principal.
///
/// # Example
///
/// ```
/// use cms_rbac::{page_permissions_clause, ExpandedRoles, PagePermission, PermissionHooks};
/// use cms_model::{Predicate, Principal};
///
/// let hooks = PermissionHooks::new();
/// let roles = ExpandedRoles::default();
///
/// let admin = Principal::admin(1);
/// let open = page_permissions_clause(PagePermission::SHOW, Some(&admin), &roles, &hooks);
/// assert_eq!(open, Predicate::True);
///
/// let nobody = page_permissions_clause(PagePermission::SHOW, None, &roles, &hooks);
/// assert_eq!(nobody, Predicate::False);
///
/// let editor = Principal::new(5);
/// let clause = page_permissions_clause(PagePermission::SHOW, Some(&editor), &roles, &hooks);
/// assert_eq!(
///     clause.to_string(),
///     "(perms_everybody & 1 = 1 OR (perms_userid = 5 AND perms_user & 1 = 1))"
/// );
/// ```
pub fn page_permissions_clause(
    action: PagePermission,
    principal: Option<&Principal>,
    roles: &ExpandedRoles,
    hooks: &PermissionHooks,
) -> Predicate {
    let Some(principal) = principal else {
        return Predicate::False;
    };
    if principal.is_admin {
        return Predicate::True;
    }

    let mask = i64::from(action.bits());
    let mut clause = Predicate::bits_set(Field::EveryoneBits, mask).or(
        Predicate::eq(Field::OwnerPrincipalId, principal.id)
            .and(Predicate::bits_set(Field::OwnerBits, mask)),
    );
    if !roles.role_ids.is_empty() {
        clause = clause.or(
            Predicate::in_list(Field::OwnerRoleId, roles.role_ids.iter().copied())
                .and(Predicate::bits_set(Field::RoleBits, mask)),
        );
    }

    hooks.apply_page_permissions_clause(action, principal, clause)
}

/// Ownership algebra for one principal.
pub struct PermissionCalculator<'a> {
    principal: &'a Principal,
    roles: &'a ExpandedRoles,
    hooks: &'a PermissionHooks,
}

impl<'a> PermissionCalculator<'a> {
    /// Creates a calculator for `principal` with its expanded roles.
    pub fn new(
        principal: &'a Principal,
        roles: &'a ExpandedRoles,
        hooks: &'a PermissionHooks,
    ) -> Self {
        Self {
            principal,
            roles,
            hooks,
        }
    }

    /// The principal permissions are computed for.
    pub fn principal(&self) -> &Principal {
        self.principal
    }

    /// Compute the effective mask of `record` from `table`.
    ///
    /// `in_web_mount` is whether the record lies inside one of the
    /// principal's web mounts. It is ignored for administrators.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::MissingOwnership`] if the record carries no
    /// ownership columns at all.
    pub fn calc_perms(
        &self,
        table: &str,
        record: &Record,
        in_web_mount: bool,
    ) -> AccessResult<PagePermission> {
        let Some(ownership) = record.ownership else {
            return Err(AccessError::MissingOwnership {
                table: table.to_string(),
                uid: record.uid,
            });
        };
        if self.principal.is_admin {
            return Ok(PagePermission::ALL);
        }
        if !in_web_mount {
            return Ok(PagePermission::NOTHING);
        }

        let mut mask = PagePermission::from_stored(ownership.everyone_bits);
        if ownership.owner_principal_id == self.principal.id {
            mask |= PagePermission::from_stored(ownership.owner_bits);
        }
        if self.roles.contains(ownership.owner_role_id) {
            mask |= PagePermission::from_stored(ownership.role_bits);
        }

        Ok(self.hooks.apply_calc_perms(record, self.principal, mask))
    }

    /// Build the predicate selecting rows on which `action` is granted.
    pub fn page_permissions_clause(&self, action: PagePermission) -> Predicate {
        page_permissions_clause(action, Some(self.principal), self.roles, self.hooks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::testing::{GrantBits, RevokeBits};
    use cms_model::Ownership;

    fn roles_of(ids: &[i64]) -> ExpandedRoles {
        ExpandedRoles {
            role_ids: ids.to_vec(),
            ..ExpandedRoles::default()
        }
    }

    fn owned_by(owner: i64, role: i64, owner_bits: u8, role_bits: u8, everyone_bits: u8) -> Record {
        Record::new(20, 1).with_ownership(Ownership {
            owner_principal_id: owner,
            owner_role_id: role,
            owner_bits,
            role_bits,
            everyone_bits,
        })
    }

    #[test]
    fn test_admin_gets_everything() {
        let admin = Principal::admin(1);
        let roles = ExpandedRoles::default();
        let hooks = PermissionHooks::new();
        let calc = PermissionCalculator::new(&admin, &roles, &hooks);

        for record in [owned_by(0, 0, 0, 0, 0), owned_by(9, 9, 1, 2, 4)] {
            assert_eq!(calc.calc_perms("pages", &record, false).unwrap(), PagePermission::ALL);
        }
        assert_eq!(calc.page_permissions_clause(PagePermission::DELETE), Predicate::True);
    }

    #[test]
    fn test_owner_and_everyone_bits_combine() {
        let principal = Principal::new(5);
        let roles = ExpandedRoles::default();
        let hooks = PermissionHooks::new();
        let calc = PermissionCalculator::new(&principal, &roles, &hooks);

        let record = owned_by(5, 8, 2, 0, 1);
        assert_eq!(calc.calc_perms("pages", &record, true).unwrap().bits(), 3);
    }

    #[test]
    fn test_role_bits_need_membership() {
        let principal = Principal::new(5);
        let hooks = PermissionHooks::new();
        let record = owned_by(999, 8, 0, 16, 1);

        let member = roles_of(&[8]);
        let calc = PermissionCalculator::new(&principal, &member, &hooks);
        assert_eq!(calc.calc_perms("pages", &record, true).unwrap().bits(), 17);

        let outsider = roles_of(&[3]);
        let calc = PermissionCalculator::new(&principal, &outsider, &hooks);
        assert_eq!(calc.calc_perms("pages", &record, true).unwrap().bits(), 1);
    }

    #[test]
    fn test_role_zero_never_matches() {
        let principal = Principal::new(5);
        let hooks = PermissionHooks::new();
        let roles = roles_of(&[0]);
        let calc = PermissionCalculator::new(&principal, &roles, &hooks);

        let record = owned_by(999, 0, 0, 31, 0);
        assert_eq!(calc.calc_perms("pages", &record, true).unwrap(), PagePermission::NOTHING);
    }

    #[test]
    fn test_outside_web_mount_is_nothing() {
        let principal = Principal::new(5);
        let roles = ExpandedRoles::default();
        let hooks = PermissionHooks::new();
        let calc = PermissionCalculator::new(&principal, &roles, &hooks);

        let record = owned_by(5, 0, 31, 0, 31);
        assert_eq!(calc.calc_perms("pages", &record, false).unwrap(), PagePermission::NOTHING);
    }

    #[test]
    fn test_mask_is_subset_of_stored_bits() {
        let principal = Principal::new(5);
        let roles = roles_of(&[8]);
        let hooks = PermissionHooks::new();
        let calc = PermissionCalculator::new(&principal, &roles, &hooks);

        let cases = [(2, 0, 1), (31, 4, 0), (0, 16, 8), (255, 255, 255)];
        for (owner_bits, role_bits, everyone_bits) in cases {
            let record = owned_by(5, 8, owner_bits, role_bits, everyone_bits);
            let mask = calc.calc_perms("pages", &record, true).unwrap();
            let ceiling = PagePermission::from_stored(owner_bits | role_bits | everyone_bits);
            assert!(ceiling.contains(mask));
        }
    }

    #[test]
    fn test_missing_ownership_is_misuse() {
        let principal = Principal::new(5);
        let roles = ExpandedRoles::default();
        let hooks = PermissionHooks::new();
        let calc = PermissionCalculator::new(&principal, &roles, &hooks);

        let err = calc.calc_perms("sys_file", &Record::new(3, 0), true).unwrap_err();
        assert!(err.is_misuse());
        assert_eq!(err.error_code(), "MISSING_OWNERSHIP");
    }

    #[test]
    fn test_hooks_adjust_mask() {
        let principal = Principal::new(5);
        let roles = ExpandedRoles::default();
        let mut hooks = PermissionHooks::new();
        hooks.register(Box::new(GrantBits {
            id: "grant-new".to_string(),
            bits: PagePermission::NEW_SUBPAGE,
        }));
        hooks.register(Box::new(RevokeBits {
            id: "no-show".to_string(),
            bits: PagePermission::SHOW,
            only_pid: None,
        }));
        let calc = PermissionCalculator::new(&principal, &roles, &hooks);

        let record = owned_by(999, 0, 0, 0, 1);
        assert_eq!(calc.calc_perms("pages", &record, true).unwrap(), PagePermission::NEW_SUBPAGE);
    }

    #[test]
    fn test_clause_matches_calc_perms() {
        let principal = Principal::new(5);
        let roles = roles_of(&[8, 9]);
        let hooks = PermissionHooks::new();
        let calc = PermissionCalculator::new(&principal, &roles, &hooks);

        let records = [
            owned_by(5, 0, 2, 0, 0),
            owned_by(7, 9, 0, 2, 0),
            owned_by(7, 4, 0, 2, 0),
            owned_by(7, 4, 0, 0, 3),
            owned_by(7, 4, 2, 0, 1),
        ];
        let clause = calc.page_permissions_clause(PagePermission::EDIT_PAGE);
        for record in &records {
            let granted = calc
                .calc_perms("pages", record, true)
                .unwrap()
                .grants(PagePermission::EDIT_PAGE);
            assert_eq!(clause.evaluate(record), granted, "record {:?}", record.ownership);
        }
    }

    #[test]
    fn test_clause_with_roles_renders() {
        let principal = Principal::new(5);
        let roles = roles_of(&[8, 9]);
        let hooks = PermissionHooks::new();
        let clause =
            page_permissions_clause(PagePermission::SHOW, Some(&principal), &roles, &hooks);
        assert_eq!(
            clause.to_string(),
            "(perms_everybody & 1 = 1 OR (perms_userid = 5 AND perms_user & 1 = 1) OR (perms_groupid IN (8,9) AND perms_group & 1 = 1))"
        );
    }
}
