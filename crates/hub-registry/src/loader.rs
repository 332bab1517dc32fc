use std::path::Path;

use hub_domain::entities::ToolRegistryEntry;
use hub_domain::Result;

use crate::descriptor::RawToolDescriptor;

/// Loads a single `tool.toml` descriptor from a tool directory.
pub fn load_descriptor(tool_dir: &Path) -> Result<ToolRegistryEntry> {
    let toml_path = tool_dir.join("tool.toml");
    let content = std::fs::read_to_string(&toml_path)?;
    let raw: RawToolDescriptor =
        toml::from_str(&content).map_err(|e| hub_domain::Error::Config(e.to_string()))?;
    Ok(raw.into())
}

/// Scans a directory for tool subdirectories, each containing a `tool.toml`.
/// Best-effort per spec.md §4.3: a descriptor that fails to parse is logged
/// at `warn!` and skipped, never aborting the scan.
pub fn scan_dir(tools_dir: &Path) -> Result<Vec<ToolRegistryEntry>> {
    let mut entries = Vec::new();
    if !tools_dir.exists() {
        return Ok(entries);
    }
    for dir_entry in std::fs::read_dir(tools_dir)? {
        let dir_entry = dir_entry?;
        let path = dir_entry.path();
        if !path.is_dir() || !path.join("tool.toml").exists() {
            continue;
        }
        match load_descriptor(&path) {
            Ok(entry) => entries.push(entry),
            Err(err) => {
                tracing::warn!(
                    tool_dir = %path.display(),
                    error = %err,
                    "skipping tool directory with invalid tool.toml"
                );
            }
        }
    }
    entries.sort_by(|a, b| a.tool_name.cmp(&b.tool_name));
    Ok(entries)
}

/// Scans every configured descriptor directory and concatenates the result.
pub fn scan_all(tools_dirs: &[std::path::PathBuf]) -> Result<Vec<ToolRegistryEntry>> {
    let mut entries = Vec::new();
    for dir in tools_dirs {
        entries.extend(scan_dir(dir)?);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_dir_skips_invalid_descriptor_without_aborting() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("github");
        fs::create_dir(&good).unwrap();
        fs::write(
            good.join("tool.toml"),
            r#"tool_name = "github"
               display_name = "GitHub"
               auth_type = "oauth""#,
        )
        .unwrap();

        let bad = tmp.path().join("broken");
        fs::create_dir(&bad).unwrap();
        fs::write(bad.join("tool.toml"), "not valid toml {{{").unwrap();

        let entries = scan_dir(tmp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].tool_name, "github");
    }

    #[test]
    fn scan_dir_returns_empty_for_missing_directory() {
        let entries = scan_dir(Path::new("/does/not/exist")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn scan_dir_ignores_directories_without_tool_toml() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir(tmp.path().join("not-a-tool")).unwrap();
        let entries = scan_dir(tmp.path()).unwrap();
        assert!(entries.is_empty());
    }
}
