use chrono::{DateTime, Utc};
use hub_domain::entities::{ProvisioningSource, User, UserRole};
use hub_domain::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    given_name: Option<String>,
    family_name: Option<String>,
    role: String,
    workspace_id: String,
    is_super_admin: bool,
    provisioning_source: String,
    mfa_grace_end: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = match row.role.as_str() {
            "super_admin" => UserRole::SuperAdmin,
            "workspace_owner" => UserRole::WorkspaceOwner,
            "workspace_member" => UserRole::WorkspaceMember,
            "workspace_viewer" => UserRole::WorkspaceViewer,
            other => return Err(Error::Store(format!("unknown user role: {other}"))),
        };
        let provisioning_source = match row.provisioning_source.as_str() {
            "local" => ProvisioningSource::Local,
            "work_os" => ProvisioningSource::WorkOs,
            other => return Err(Error::Store(format!("unknown provisioning source: {other}"))),
        };
        Ok(User {
            id: Uuid::parse_str(&row.id).map_err(|e| Error::Store(e.to_string()))?,
            email: row.email,
            given_name: row.given_name,
            family_name: row.family_name,
            role,
            workspace_id: Uuid::parse_str(&row.workspace_id).map_err(|e| Error::Store(e.to_string()))?,
            is_super_admin: row.is_super_admin,
            provisioning_source,
            mfa_grace_end: DateTime::parse_from_rfc3339(&row.mfa_grace_end)
                .map_err(|e| Error::Store(e.to_string()))?
                .with_timezone(&Utc),
        })
    }
}

fn role_str(role: UserRole) -> &'static str {
    match role {
        UserRole::SuperAdmin => "super_admin",
        UserRole::WorkspaceOwner => "workspace_owner",
        UserRole::WorkspaceMember => "workspace_member",
        UserRole::WorkspaceViewer => "workspace_viewer",
    }
}

fn provisioning_str(source: ProvisioningSource) -> &'static str {
    match source {
        ProvisioningSource::Local => "local",
        ProvisioningSource::WorkOs => "work_os",
    }
}

pub async fn insert(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        "INSERT INTO user_account
            (id, email, given_name, family_name, role, workspace_id, is_super_admin, provisioning_source, mfa_grace_end)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.given_name)
    .bind(&user.family_name)
    .bind(role_str(user.role))
    .bind(user.workspace_id.to_string())
    .bind(user.is_super_admin)
    .bind(provisioning_str(user.provisioning_source))
    .bind(user.mfa_grace_end.to_rfc3339())
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, email, given_name, family_name, role, workspace_id, is_super_admin, provisioning_source, mfa_grace_end
         FROM user_account WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    row.map(User::try_from).transpose()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
    let row: Option<UserRow> = sqlx::query_as(
        "SELECT id, email, given_name, family_name, role, workspace_id, is_super_admin, provisioning_source, mfa_grace_end
         FROM user_account WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    row.map(User::try_from).transpose()
}

pub async fn list_by_workspace(pool: &SqlitePool, workspace_id: Uuid) -> Result<Vec<User>> {
    let rows: Vec<UserRow> = sqlx::query_as(
        "SELECT id, email, given_name, family_name, role, workspace_id, is_super_admin, provisioning_source, mfa_grace_end
         FROM user_account WHERE workspace_id = ?",
    )
    .bind(workspace_id.to_string())
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    rows.into_iter().map(User::try_from).collect()
}

pub async fn update_mfa_grace_end(pool: &SqlitePool, id: Uuid, new_end: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE user_account SET mfa_grace_end = ? WHERE id = ?")
        .bind(new_end.to_rfc3339())
        .bind(id.to_string())
        .execute(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool;
    use crate::repo::workspace;

    async fn memory_pool() -> SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    async fn seeded_workspace(pool: &SqlitePool) -> Uuid {
        let ws = hub_domain::entities::Workspace {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            slug: "acme".into(),
            owner_user_id: Uuid::new_v4(),
            external_org_id: None,
            settings: serde_json::json!({}),
        };
        workspace::insert(pool, &ws).await.unwrap();
        ws.id
    }

    fn sample(workspace_id: Uuid) -> User {
        User {
            id: Uuid::new_v4(),
            email: "jane@example.com".into(),
            given_name: Some("Jane".into()),
            family_name: None,
            role: UserRole::WorkspaceOwner,
            workspace_id,
            is_super_admin: false,
            provisioning_source: ProvisioningSource::Local,
            mfa_grace_end: Utc::now(),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_email() {
        let pool = memory_pool().await;
        let ws_id = seeded_workspace(&pool).await;
        let user = sample(ws_id);
        insert(&pool, &user).await.unwrap();
        let found = find_by_email(&pool, "jane@example.com").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.role, UserRole::WorkspaceOwner);
    }

    #[tokio::test]
    async fn list_by_workspace_returns_members() {
        let pool = memory_pool().await;
        let ws_id = seeded_workspace(&pool).await;
        insert(&pool, &sample(ws_id)).await.unwrap();
        let members = list_by_workspace(&pool, ws_id).await.unwrap();
        assert_eq!(members.len(), 1);
    }

    #[tokio::test]
    async fn update_mfa_grace_end_persists() {
        let pool = memory_pool().await;
        let ws_id = seeded_workspace(&pool).await;
        let user = sample(ws_id);
        insert(&pool, &user).await.unwrap();
        let new_end = Utc::now() + chrono::Duration::days(7);
        update_mfa_grace_end(&pool, user.id, new_end).await.unwrap();
        let found = find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert_eq!(found.mfa_grace_end.timestamp(), new_end.timestamp());
    }
}
