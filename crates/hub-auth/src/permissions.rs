//! Permission table for `require_permission` (spec.md §4.2). Trimmed to the
//! Hub's actual domain — there is no project/agent layer here, just
//! workspace-scoped tools, credentials, and audit visibility plus the
//! platform-wide super-admin surface.

use hub_domain::entities::UserRole;

pub mod permission {
    pub const PLATFORM_ADMIN: &str = "platform:admin";
    pub const PLATFORM_USERS: &str = "platform:users";
    pub const PLATFORM_AUDIT: &str = "platform:audit";
    pub const PLATFORM_SETTINGS: &str = "platform:settings";

    pub const WORKSPACE_ADMIN: &str = "workspace:admin";
    pub const WORKSPACE_AUDIT: &str = "workspace:audit";

    pub const TOOLS_READ: &str = "tools:read";
    pub const TOOLS_ADD: &str = "tools:add";
    pub const TOOLS_CONFIGURE: &str = "tools:configure";
    pub const TOOLS_DELETE: &str = "tools:delete";
    pub const TOOLS_EXECUTE: &str = "tools:execute";

    pub const CREDENTIALS_MANAGE: &str = "credentials:manage";
}

/// Allowed roles for a permission name, lowest-to-highest in the `UserRole`
/// hierarchy. A permission absent from the table has no role allowance —
/// `require_permission` then only succeeds for a super-admin caller.
fn allowed_roles(permission: &str) -> &'static [UserRole] {
    use permission::*;
    use UserRole::*;

    match permission {
        PLATFORM_ADMIN | PLATFORM_USERS | PLATFORM_AUDIT | PLATFORM_SETTINGS => &[SuperAdmin],
        WORKSPACE_ADMIN | WORKSPACE_AUDIT => &[SuperAdmin, WorkspaceOwner],
        TOOLS_READ => &[SuperAdmin, WorkspaceOwner, WorkspaceMember, WorkspaceViewer],
        TOOLS_ADD | TOOLS_CONFIGURE | TOOLS_DELETE => &[SuperAdmin, WorkspaceOwner],
        TOOLS_EXECUTE => &[SuperAdmin, WorkspaceOwner, WorkspaceMember],
        CREDENTIALS_MANAGE => &[SuperAdmin, WorkspaceOwner],
        _ => &[],
    }
}

/// Whether `role` is among the roles allowed to exercise `permission`.
/// Super-admins should be checked separately by the caller (they wildcard
/// every permission regardless of this table) — this function only
/// consults the tabulated role set.
pub fn role_has_permission(role: UserRole, permission: &str) -> bool {
    allowed_roles(permission).contains(&role)
}
