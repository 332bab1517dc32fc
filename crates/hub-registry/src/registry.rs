use std::path::PathBuf;

use hub_domain::Result;
use hub_store::repo::tool_registry;
use sqlx::SqlitePool;

use crate::loader;

/// Owns the configured descriptor directories and the pool the discovered
/// catalogue is upserted into. `sync()` is called once at startup and again
/// on each hot-reload tick.
pub struct Registry {
    pool: SqlitePool,
    tools_dirs: Vec<PathBuf>,
}

impl Registry {
    pub fn new(pool: SqlitePool, tools_dirs: Vec<PathBuf>) -> Self {
        Self { pool, tools_dirs }
    }

    /// Scans the descriptor directories and upserts every entry found into
    /// `tool_registry`. Returns the number of entries synced. Per spec.md
    /// §4.3 the table is upserted on every call so catalogue edits take
    /// effect without manual intervention.
    pub async fn sync(&self) -> Result<usize> {
        let entries = loader::scan_all(&self.tools_dirs)?;
        for entry in &entries {
            tool_registry::upsert(&self.pool, entry).await?;
        }
        tracing::info!(tools_count = entries.len(), "tool registry synced");
        Ok(entries.len())
    }

    pub async fn list(&self) -> Result<Vec<hub_domain::entities::ToolRegistryEntry>> {
        tool_registry::all(&self.pool).await
    }

    pub async fn get(&self, tool_name: &str) -> Result<Option<hub_domain::entities::ToolRegistryEntry>> {
        tool_registry::find_by_name(&self.pool, tool_name).await
    }
}

/// Spawns the hot-reload poll loop, matching the teacher's periodic-
/// background-task pattern. `None` disables polling — the catalogue only
/// refreshes on the next process restart.
pub fn spawn_watch(registry: std::sync::Arc<Registry>, interval_secs: Option<u64>) {
    let Some(secs) = interval_secs else {
        return;
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(secs));
        loop {
            interval.tick().await;
            if let Err(err) = registry.sync().await {
                tracing::warn!(%err, "tool registry reload failed");
            }
        }
    });
}
