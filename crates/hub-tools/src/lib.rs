pub mod activation;
pub mod catalogue;
pub mod credential;

pub use catalogue::{CatalogueEntry, ToolStatus};

#[cfg(test)]
mod tests {
    use super::*;
    use hub_domain::entities::{AuthType, ToolRegistryEntry};
    use hub_store::pool;
    use hub_store::repo::tool_registry;
    use uuid::Uuid;

    async fn memory_pool() -> sqlx::SqlitePool {
        let pool = pool::connect("sqlite::memory:", 1).await.unwrap();
        pool::migrate(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn get_tool_config_reflects_add_tool() {
        let pool = memory_pool().await;
        tool_registry::upsert(
            &pool,
            &ToolRegistryEntry {
                tool_name: "github".into(),
                display_name: "GitHub".into(),
                description: "d".into(),
                category: "dev".into(),
                auth_type: AuthType::None,
                config_schema: serde_json::json!({"required": ["org"]}),
                required_oauth: None,
                capabilities: Default::default(),
            },
        )
        .await
        .unwrap();
        let user_id = Uuid::new_v4();
        catalogue::add_tool(&pool, user_id, "github", &serde_json::json!({"org": "acme"})).await.unwrap();
        let config = catalogue::get_tool_config(&pool, user_id, "github").await.unwrap();
        assert_eq!(config["org"], "acme");
    }
}
