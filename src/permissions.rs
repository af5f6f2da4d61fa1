//! Role-to-capability mapping. Pure and total: an absent or unknown role
//! yields the least-privileged result, never an error. Route handlers are
//! the trust boundary and must consult these capabilities server-side;
//! any client-side check is a UI affordance only.

use crate::models::user::UserRole;

const ADMIN_ONLY: &[UserRole] = &[UserRole::Administrator];
const ADMIN_OR_KONSULTANT: &[UserRole] = &[UserRole::Administrator, UserRole::Konsultant];
const STAFF: &[UserRole] = &[
    UserRole::Administrator,
    UserRole::Konsultant,
    UserRole::Nauczyciel,
];
const STAFF_AND_GUARDIANS: &[UserRole] = &[
    UserRole::Administrator,
    UserRole::Konsultant,
    UserRole::Nauczyciel,
    UserRole::Opiekun,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub can_manage_users: bool,
    pub can_assign_roles: bool,
    pub can_view_all_students: bool,
    pub can_edit_students: bool,
    pub can_create_students: bool,
    pub can_delete_students: bool,
    pub can_manage_classes: bool,
    pub can_view_payments: bool,
    pub can_manage_payments: bool,
    pub can_link_guardians: bool,
    pub can_create_student_accounts: bool,
    pub is_staff: bool,
    pub is_admin_or_konsultant: bool,
    pub can_view_students_menu: bool,
}

impl Capabilities {
    pub fn for_role(role: Option<UserRole>) -> Self {
        let allows = |list: &[UserRole]| role.is_some_and(|r| list.contains(&r));

        Self {
            can_manage_users: allows(ADMIN_ONLY),
            can_assign_roles: allows(ADMIN_ONLY),
            can_view_all_students: allows(ADMIN_OR_KONSULTANT),
            can_edit_students: allows(STAFF),
            can_create_students: allows(STAFF),
            can_delete_students: allows(STAFF),
            can_manage_classes: allows(STAFF),
            can_view_payments: allows(STAFF_AND_GUARDIANS),
            can_manage_payments: allows(STAFF),
            can_link_guardians: allows(STAFF),
            can_create_student_accounts: allows(STAFF),
            is_staff: allows(STAFF),
            is_admin_or_konsultant: allows(ADMIN_OR_KONSULTANT),
            can_view_students_menu: allows(STAFF_AND_GUARDIANS),
        }
    }

    pub fn none() -> Self {
        Self::for_role(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROLES: [UserRole; 5] = [
        UserRole::Administrator,
        UserRole::Konsultant,
        UserRole::Nauczyciel,
        UserRole::Opiekun,
        UserRole::Uczen,
    ];

    #[test]
    fn absent_role_has_no_capabilities() {
        let caps = Capabilities::none();
        assert!(!caps.can_manage_users);
        assert!(!caps.can_assign_roles);
        assert!(!caps.can_view_all_students);
        assert!(!caps.can_edit_students);
        assert!(!caps.can_create_students);
        assert!(!caps.can_delete_students);
        assert!(!caps.can_manage_classes);
        assert!(!caps.can_view_payments);
        assert!(!caps.can_manage_payments);
        assert!(!caps.can_link_guardians);
        assert!(!caps.can_create_student_accounts);
        assert!(!caps.is_staff);
        assert!(!caps.is_admin_or_konsultant);
        assert!(!caps.can_view_students_menu);
    }

    #[test]
    fn capability_follows_allow_list_membership() {
        for role in ALL_ROLES {
            let caps = Capabilities::for_role(Some(role));
            assert_eq!(caps.can_manage_users, ADMIN_ONLY.contains(&role));
            assert_eq!(caps.can_assign_roles, ADMIN_ONLY.contains(&role));
            assert_eq!(caps.can_view_all_students, ADMIN_OR_KONSULTANT.contains(&role));
            assert_eq!(caps.can_edit_students, STAFF.contains(&role));
            assert_eq!(caps.can_create_students, STAFF.contains(&role));
            assert_eq!(caps.can_delete_students, STAFF.contains(&role));
            assert_eq!(caps.can_manage_classes, STAFF.contains(&role));
            assert_eq!(caps.can_view_payments, STAFF_AND_GUARDIANS.contains(&role));
            assert_eq!(caps.can_manage_payments, STAFF.contains(&role));
            assert_eq!(caps.can_link_guardians, STAFF.contains(&role));
            assert_eq!(caps.can_create_student_accounts, STAFF.contains(&role));
            assert_eq!(caps.is_staff, STAFF.contains(&role));
            assert_eq!(caps.is_admin_or_konsultant, ADMIN_OR_KONSULTANT.contains(&role));
            assert_eq!(caps.can_view_students_menu, STAFF_AND_GUARDIANS.contains(&role));
        }
    }

    #[test]
    fn only_administrator_manages_users() {
        for role in ALL_ROLES {
            let caps = Capabilities::for_role(Some(role));
            assert_eq!(caps.can_manage_users, role == UserRole::Administrator);
        }
    }

    #[test]
    fn guardians_view_but_never_manage_payments() {
        let caps = Capabilities::for_role(Some(UserRole::Opiekun));
        assert!(caps.can_view_payments);
        assert!(!caps.can_manage_payments);
    }

    #[test]
    fn student_role_sees_nothing() {
        let caps = Capabilities::for_role(Some(UserRole::Uczen));
        assert_eq!(caps, Capabilities::none());
    }
}
