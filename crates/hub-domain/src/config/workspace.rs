use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Workspace (filesystem layout root, not the tenancy entity)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where on disk the Hub keeps its process-local state: the SQLite file
/// (unless overridden by `store.database_url`), the channel/history JSON
/// documents, and any setup-wizard scratch files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfigRoot {
    #[serde(default = "d_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for WorkspaceConfigRoot {
    fn default() -> Self {
        Self {
            data_dir: d_data_dir(),
        }
    }
}

fn d_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
