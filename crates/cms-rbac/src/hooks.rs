//! Permission hooks.
//!
//! Extensions can adjust computed permission masks and generated page
//! permission predicates. Hooks run in registration order, each receiving
//! the running result of the previous one.

use cms_model::{Predicate, Principal, Record};

use crate::permissions::PagePermission;

/// A single permission extension.
///
/// Both transforms default to passing their input through, so a hook only
/// implements the point it cares about. Hooks never see administrators:
/// those short-circuit before any hook runs.
pub trait PermissionHook: Send + Sync {
    /// Unique identifier for this hook.
    fn id(&self) -> &str;

    /// Adjust the mask computed for `record`.
    fn calc_perms(
        &self,
        _record: &Record,
        _principal: &Principal,
        current: PagePermission,
    ) -> PagePermission {
        current
    }

    /// Adjust the predicate generated for `action`.
    fn page_permissions_clause(
        &self,
        _action: PagePermission,
        _principal: &Principal,
        clause: Predicate,
    ) -> Predicate {
        clause
    }
}

/// Ordered collection of permission hooks.
#[derive(Default)]
pub struct PermissionHooks {
    hooks: Vec<Box<dyn PermissionHook>>,
}

impl std::fmt::Debug for PermissionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.id()))
            .finish()
    }
}

impl PermissionHooks {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a hook. Returns the hook's ID.
    pub fn register(&mut self, hook: Box<dyn PermissionHook>) -> String {
        let id = hook.id().to_string();
        self.hooks.push(hook);
        id
    }

    /// Removes every hook with the given ID. Returns `true` if any was removed.
    pub fn unregister(&mut self, id: &str) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|h| h.id() != id);
        self.hooks.len() != before
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook's mask transform in order.
    pub fn apply_calc_perms(
        &self,
        record: &Record,
        principal: &Principal,
        mask: PagePermission,
    ) -> PagePermission {
        self.hooks
            .iter()
            .fold(mask, |current, hook| hook.calc_perms(record, principal, current))
    }

    /// Run every hook's predicate transform in order.
    pub fn apply_page_permissions_clause(
        &self,
        action: PagePermission,
        principal: &Principal,
        clause: Predicate,
    ) -> Predicate {
        self.hooks.iter().fold(clause, |current, hook| {
            hook.page_permissions_clause(action, principal, current)
        })
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn test_hooks_run_in_registration_order() {
        let mut hooks = PermissionHooks::new();
        hooks.register(Box::new(GrantBits {
            id: "grant-delete".to_string(),
            bits: PagePermission::DELETE,
        }));
        hooks.register(Box::new(RevokeBits {
            id: "revoke-delete".to_string(),
            bits: PagePermission::DELETE,
            only_pid: None,
        }));

        let record = Record::new(1, 0);
        let principal = Principal::new(2);
        let result = hooks.apply_calc_perms(&record, &principal, PagePermission::SHOW);
        assert_eq!(result, PagePermission::SHOW);

        assert!(hooks.unregister("revoke-delete"));
        let result = hooks.apply_calc_perms(&record, &principal, PagePermission::SHOW);
        assert_eq!(result, PagePermission::SHOW | PagePermission::DELETE);
    }

    #[test]
    fn test_clause_transform() {
        let mut hooks = PermissionHooks::new();
        hooks.register(Box::new(RevokeBits {
            id: "pid-only".to_string(),
            bits: PagePermission::NOTHING,
            only_pid: Some(4),
        }));

        let clause = hooks.apply_page_permissions_clause(
            PagePermission::SHOW,
            &Principal::new(2),
            Predicate::True,
        );
        assert_eq!(clause, Predicate::eq(cms_model::Field::Pid, 4));
    }

    #[test]
    fn test_empty_registry() {
        let mut hooks = PermissionHooks::new();
        assert!(hooks.is_empty());
        assert!(!hooks.unregister("missing"));
        assert_eq!(format!("{:?}", hooks), "[]");
    }
}
