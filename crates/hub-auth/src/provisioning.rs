//! Workspace auto-provisioning on first successful authentication
//! (spec.md §4.2), grounded on `authorization.py`'s `get_or_create_user` /
//! `get_or_create_workspace`.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use hub_domain::entities::{slugify_unique, ProvisioningSource, User, UserRole, Workspace};
use hub_domain::Result;
use hub_store::repo::{user, workspace};

use crate::authorization::is_super_admin;

/// Identity claims resolved from a validated session (local mode's fixed
/// super-admin, or a WorkOS identity assertion). Not yet a `User` row.
pub struct IdentityClaims {
    pub email: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub provisioning_source: ProvisioningSource,
}

/// Looks the user up by stable identity (email); creates the user and a
/// dedicated workspace on first sight. MFA grace period is recorded only
/// at creation — existing users keep whatever grace end they already have.
pub async fn get_or_create_user_and_workspace(
    pool: &SqlitePool,
    claims: IdentityClaims,
    super_admin_emails: &[String],
    mfa_grace_days: i64,
) -> Result<(User, Workspace)> {
    if let Some(existing) = user::find_by_email(pool, &claims.email).await? {
        let ws = workspace::find_by_id(pool, existing.workspace_id)
            .await?
            .ok_or_else(|| hub_domain::Error::Store(format!("workspace {} missing for user {}", existing.workspace_id, existing.id)))?;
        return Ok((existing, ws));
    }

    let user_id = Uuid::new_v4();
    let workspace_id = Uuid::new_v4();

    let existing_slugs = workspace::all_slugs(pool).await?;
    let name_hint = claims
        .given_name
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| claims.email.split('@').next().unwrap_or(&claims.email).to_string());
    let workspace_name = format!("{name_hint}'s Workspace");
    let slug = slugify_unique(&workspace_name, &existing_slugs);

    let new_workspace = Workspace {
        id: workspace_id,
        name: workspace_name,
        slug,
        owner_user_id: user_id,
        external_org_id: None,
        settings: serde_json::json!({ "default_tools": [], "mfa_required": true }),
    };
    workspace::insert(pool, &new_workspace).await?;

    let new_user = User {
        id: user_id,
        email: claims.email,
        given_name: claims.given_name,
        family_name: claims.family_name,
        role: UserRole::WorkspaceOwner,
        workspace_id,
        is_super_admin: false,
        provisioning_source: claims.provisioning_source,
        mfa_grace_end: Utc::now() + Duration::days(mfa_grace_days),
    };
    let new_user = User { is_super_admin: is_super_admin(&new_user, super_admin_emails), ..new_user };
    user::insert(pool, &new_user).await?;

    Ok((new_user, new_workspace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hub_store::pool;

    async fn memory_pool() -> SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    fn claims(email: &str) -> IdentityClaims {
        IdentityClaims {
            email: email.into(),
            given_name: Some("Jane".into()),
            family_name: None,
            provisioning_source: ProvisioningSource::WorkOs,
        }
    }

    #[tokio::test]
    async fn first_login_creates_user_and_workspace() {
        let pool = memory_pool().await;
        let (u, ws) = get_or_create_user_and_workspace(&pool, claims("jane@example.com"), &[], 7).await.unwrap();
        assert_eq!(u.workspace_id, ws.id);
        assert_eq!(ws.name, "Jane's Workspace");
        assert_eq!(u.role, UserRole::WorkspaceOwner);
    }

    #[tokio::test]
    async fn second_login_reuses_existing_user() {
        let pool = memory_pool().await;
        let (first, _) = get_or_create_user_and_workspace(&pool, claims("jane@example.com"), &[], 7).await.unwrap();
        let (second, _) = get_or_create_user_and_workspace(&pool, claims("jane@example.com"), &[], 7).await.unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn slug_collision_gets_numeric_suffix() {
        let pool = memory_pool().await;
        get_or_create_user_and_workspace(&pool, claims("jane@example.com"), &[], 7).await.unwrap();
        let (_, ws2) = get_or_create_user_and_workspace(&pool, claims("jane2@example.com"), &[], 7)
            .await
            .unwrap();
        // Both resolve to "Jane's Workspace" -> slug collision.
        assert_eq!(ws2.slug, "jane-s-workspace-2");
    }

    #[tokio::test]
    async fn super_admin_email_list_flags_new_user() {
        let pool = memory_pool().await;
        let (u, _) = get_or_create_user_and_workspace(&pool, claims("root@example.com"), &["root@example.com".into()], 7)
            .await
            .unwrap();
        assert!(u.is_super_admin);
    }
}
