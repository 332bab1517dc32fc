use hub_domain::entities::Workspace;
use hub_domain::{Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    id: String,
    name: String,
    slug: String,
    owner_user_id: String,
    external_org_id: Option<String>,
    settings: String,
}

impl TryFrom<WorkspaceRow> for Workspace {
    type Error = Error;

    fn try_from(row: WorkspaceRow) -> Result<Self> {
        Ok(Workspace {
            id: Uuid::parse_str(&row.id).map_err(|e| Error::Store(e.to_string()))?,
            name: row.name,
            slug: row.slug,
            owner_user_id: Uuid::parse_str(&row.owner_user_id)
                .map_err(|e| Error::Store(e.to_string()))?,
            external_org_id: row.external_org_id,
            settings: serde_json::from_str(&row.settings).unwrap_or(serde_json::json!({})),
        })
    }
}

pub async fn insert(pool: &SqlitePool, workspace: &Workspace) -> Result<()> {
    sqlx::query(
        "INSERT INTO workspace (id, name, slug, owner_user_id, external_org_id, settings)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(workspace.id.to_string())
    .bind(&workspace.name)
    .bind(&workspace.slug)
    .bind(workspace.owner_user_id.to_string())
    .bind(&workspace.external_org_id)
    .bind(workspace.settings.to_string())
    .execute(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Workspace>> {
    let row: Option<WorkspaceRow> = sqlx::query_as(
        "SELECT id, name, slug, owner_user_id, external_org_id, settings FROM workspace WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    row.map(Workspace::try_from).transpose()
}

pub async fn find_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<Workspace>> {
    let row: Option<WorkspaceRow> = sqlx::query_as(
        "SELECT id, name, slug, owner_user_id, external_org_id, settings FROM workspace WHERE slug = ?",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    row.map(Workspace::try_from).transpose()
}

/// All slugs currently in use, for `slugify_unique` collision resolution.
pub async fn all_slugs(pool: &SqlitePool) -> Result<std::collections::HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT slug FROM workspace")
        .fetch_all(pool)
        .await
        .map_err(|e| Error::Store(e.to_string()))?;
    Ok(rows.into_iter().map(|(s,)| s).collect())
}

/// Every workspace, for the platform-wide super-admin view.
pub async fn all(pool: &SqlitePool) -> Result<Vec<Workspace>> {
    let rows: Vec<WorkspaceRow> = sqlx::query_as(
        "SELECT id, name, slug, owner_user_id, external_org_id, settings FROM workspace ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Store(e.to_string()))?;
    rows.into_iter().map(Workspace::try_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool;

    async fn memory_pool() -> SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    fn sample() -> Workspace {
        Workspace {
            id: Uuid::new_v4(),
            name: "Acme".into(),
            slug: "acme".into(),
            owner_user_id: Uuid::new_v4(),
            external_org_id: None,
            settings: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_id() {
        let pool = memory_pool().await;
        let ws = sample();
        insert(&pool, &ws).await.unwrap();
        let found = find_by_id(&pool, ws.id).await.unwrap().unwrap();
        assert_eq!(found.slug, "acme");
    }

    #[tokio::test]
    async fn find_by_slug_roundtrips() {
        let pool = memory_pool().await;
        let ws = sample();
        insert(&pool, &ws).await.unwrap();
        let found = find_by_slug(&pool, "acme").await.unwrap().unwrap();
        assert_eq!(found.id, ws.id);
    }

    #[tokio::test]
    async fn all_slugs_includes_inserted() {
        let pool = memory_pool().await;
        insert(&pool, &sample()).await.unwrap();
        let slugs = all_slugs(&pool).await.unwrap();
        assert!(slugs.contains("acme"));
    }

    #[tokio::test]
    async fn all_lists_every_workspace() {
        let pool = memory_pool().await;
        insert(&pool, &sample()).await.unwrap();
        let mut other = sample();
        other.id = Uuid::new_v4();
        other.slug = "other".into();
        insert(&pool, &other).await.unwrap();
        assert_eq!(all(&pool).await.unwrap().len(), 2);
    }
}
