//! Who may work on (or preview) a project's tasks.

use crate::roles::{is_staff, ROLE_ADMIN};
use crate::types::DbId;

/// Access-relevant flags of a project and the batch being worked on.
#[derive(Debug, Clone, Copy)]
pub struct AccessRules {
    /// Project and batch are both active (the batch is published).
    pub active: bool,
    /// Anonymous workers are turned away.
    pub login_required: bool,
    /// Only members of the project's worker groups may work on it.
    pub custom_permissions: bool,
}

/// The requesting worker as seen by access checks.
#[derive(Debug, Clone, Copy)]
pub struct ActorAccess<'a> {
    /// `None` for anonymous workers.
    pub user_id: Option<DbId>,
    pub role: Option<&'a str>,
    /// Worker groups the user belongs to.
    pub group_ids: &'a [DbId],
}

impl ActorAccess<'_> {
    /// An anonymous worker.
    pub fn anonymous() -> ActorAccess<'static> {
        ActorAccess {
            user_id: None,
            role: None,
            group_ids: &[],
        }
    }

    fn is_admin(&self) -> bool {
        self.role == Some(ROLE_ADMIN)
    }
}

/// Whether the actor may claim tasks under `rules`.
pub fn can_work_on(rules: &AccessRules, actor: &ActorAccess<'_>, project_group_ids: &[DbId]) -> bool {
    if !rules.active {
        return false;
    }
    if actor.user_id.is_none() {
        return !rules.login_required && !rules.custom_permissions;
    }
    if rules.custom_permissions && !actor.is_admin() {
        return actor.group_ids.iter().any(|g| project_group_ids.contains(g));
    }
    true
}

/// Whether the actor may preview tasks. Staff may preview unpublished batches.
pub fn can_preview(rules: &AccessRules, actor: &ActorAccess<'_>, project_group_ids: &[DbId]) -> bool {
    if actor.role.is_some_and(is_staff) {
        return true;
    }
    can_work_on(rules, actor, project_group_ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: AccessRules = AccessRules {
        active: true,
        login_required: false,
        custom_permissions: false,
    };

    fn worker(groups: &[DbId]) -> ActorAccess<'_> {
        ActorAccess {
            user_id: Some(1),
            role: Some("worker"),
            group_ids: groups,
        }
    }

    #[test]
    fn anonymous_allowed_only_without_login() {
        assert!(can_work_on(&OPEN, &ActorAccess::anonymous(), &[]));
        let login = AccessRules {
            login_required: true,
            ..OPEN
        };
        assert!(!can_work_on(&login, &ActorAccess::anonymous(), &[]));
        assert!(can_work_on(&login, &worker(&[]), &[]));
    }

    #[test]
    fn inactive_blocks_everyone_from_working() {
        let inactive = AccessRules {
            active: false,
            ..OPEN
        };
        assert!(!can_work_on(&inactive, &worker(&[]), &[]));
    }

    #[test]
    fn custom_permissions_require_group_membership() {
        let custom = AccessRules {
            custom_permissions: true,
            ..OPEN
        };
        assert!(!can_work_on(&custom, &worker(&[3]), &[4, 5]));
        assert!(can_work_on(&custom, &worker(&[3, 5]), &[4, 5]));
        assert!(!can_work_on(&custom, &ActorAccess::anonymous(), &[4]));

        let admin = ActorAccess {
            user_id: Some(9),
            role: Some("admin"),
            group_ids: &[],
        };
        assert!(can_work_on(&custom, &admin, &[4]));
    }

    #[test]
    fn staff_preview_unpublished() {
        let inactive = AccessRules {
            active: false,
            ..OPEN
        };
        let requester = ActorAccess {
            user_id: Some(2),
            role: Some("requester"),
            group_ids: &[],
        };
        assert!(can_preview(&inactive, &requester, &[]));
        assert!(!can_preview(&inactive, &worker(&[]), &[]));
    }
}
