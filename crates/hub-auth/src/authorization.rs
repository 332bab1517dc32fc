//! Authorization primitives (spec.md §4.2), grounded on
//! `authorization.py`'s `require_workspace_owner` / `require_super_admin` /
//! `require_permission` decorators — reworked here as plain functions over
//! a resolved `hub_domain::entities::User` instead of a framework decorator,
//! since the Hub's dispatcher already threads a `RequestContext` rather
//! than a FastAPI-style request object.

use uuid::Uuid;

use hub_domain::entities::User;
use hub_domain::{Error, Result};

use crate::permissions::role_has_permission;

/// An email is super-admin iff it appears in the configured list
/// (case-insensitive, trimmed) or the user row has `is_super_admin = true`.
pub fn is_super_admin(user: &User, super_admin_emails: &[String]) -> bool {
    if user.is_super_admin {
        return true;
    }
    let email = user.email.trim().to_lowercase();
    super_admin_emails.iter().any(|e| e.trim().to_lowercase() == email)
}

/// Super-admins bypass workspace isolation; everyone else must match
/// `target_workspace_id` against their own.
pub fn require_workspace_owner(user: &User, super_admin_emails: &[String], target_workspace_id: Uuid) -> Result<()> {
    if is_super_admin(user, super_admin_emails) {
        return Ok(());
    }
    if user.workspace_id != target_workspace_id {
        return Err(Error::Forbidden("cannot access another workspace".into()));
    }
    Ok(())
}

pub fn require_super_admin(user: &User, super_admin_emails: &[String]) -> Result<()> {
    if !is_super_admin(user, super_admin_emails) {
        return Err(Error::Forbidden("super-admin access required".into()));
    }
    Ok(())
}

/// Super-admins wildcard every permission; everyone else needs their role
/// tabulated as allowed for `permission`.
pub fn require_permission(user: &User, super_admin_emails: &[String], permission: &str) -> Result<()> {
    if is_super_admin(user, super_admin_emails) {
        return Ok(());
    }
    if !role_has_permission(user.role, permission) {
        return Err(Error::Forbidden(format!("permission denied: {permission}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hub_domain::entities::{ProvisioningSource, UserRole};

    fn user(role: UserRole, is_super_admin: bool, workspace_id: Uuid) -> User {
        User {
            id: Uuid::new_v4(),
            email: "member@example.com".into(),
            given_name: None,
            family_name: None,
            role,
            workspace_id,
            is_super_admin,
            provisioning_source: ProvisioningSource::Local,
            mfa_grace_end: Utc::now(),
        }
    }

    #[test]
    fn super_admin_flag_wins_regardless_of_email_list() {
        let u = user(UserRole::WorkspaceMember, true, Uuid::new_v4());
        assert!(is_super_admin(&u, &[]));
    }

    #[test]
    fn email_list_match_is_case_insensitive_and_trimmed() {
        let mut u = user(UserRole::WorkspaceMember, false, Uuid::new_v4());
        u.email = "  Admin@Example.com  ".into();
        assert!(is_super_admin(&u, &["admin@example.com".into()]));
    }

    #[test]
    fn require_workspace_owner_rejects_foreign_workspace() {
        let u = user(UserRole::WorkspaceOwner, false, Uuid::new_v4());
        assert!(require_workspace_owner(&u, &[], Uuid::new_v4()).is_err());
    }

    #[test]
    fn require_workspace_owner_allows_super_admin_anywhere() {
        let u = user(UserRole::WorkspaceMember, true, Uuid::new_v4());
        assert!(require_workspace_owner(&u, &[], Uuid::new_v4()).is_ok());
    }

    #[test]
    fn require_super_admin_rejects_regular_owner() {
        let u = user(UserRole::WorkspaceOwner, false, Uuid::new_v4());
        assert!(require_super_admin(&u, &[]).is_err());
    }

    #[test]
    fn require_permission_checks_role_table() {
        let u = user(UserRole::WorkspaceMember, false, Uuid::new_v4());
        assert!(require_permission(&u, &[], crate::permissions::permission::TOOLS_EXECUTE).is_ok());
        assert!(require_permission(&u, &[], crate::permissions::permission::TOOLS_ADD).is_err());
    }
}
