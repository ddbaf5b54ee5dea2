//! Configuration parsing for foldersync
//!
//! Handles the JSON documents that declare which files and folders
//! should be kept in sync: per-root `foldersync.config.json` files and
//! workspace (`.code-workspace`) settings.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file name discovered in every workspace root
pub const CONFIG_FILE_NAME: &str = "foldersync.config.json";

/// File extension of workspace aggregate files
pub const WORKSPACE_FILE_EXTENSION: &str = "code-workspace";

/// A `foldersync.config.json` document.
///
/// Relative paths in `folders` and `files` are resolved against the
/// directory containing the config file itself.
#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    /// Folder pairs to expand into individual file pairs
    pub folders: Vec<(String, String)>,

    /// Direct file pairs, synced without expansion
    #[serde(default)]
    pub files: Vec<(String, String)>,
}

/// A workspace aggregate file. Only the sync-related settings are read;
/// everything else in the document is ignored.
#[derive(Debug, Deserialize)]
pub struct WorkspaceFile {
    #[serde(default)]
    pub settings: WorkspaceSettings,
}

/// Sync settings carried in a workspace file's `settings` object.
#[derive(Debug, Default, Deserialize)]
pub struct WorkspaceSettings {
    /// Folder pairs declared at workspace scope
    #[serde(rename = "foldersync.folders", default)]
    pub folders: Vec<(String, String)>,

    /// Direct file pairs declared at workspace scope
    #[serde(rename = "foldersync.files", default)]
    pub files: Vec<(String, String)>,
}

/// Failure to read one configuration origin. Never fatal to a rescan:
/// the offending origin contributes nothing and siblings continue.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl ConfigFile {
    /// Load and parse a config file. A missing `folders` array is a parse
    /// error, same as malformed JSON.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl WorkspaceFile {
    /// Load and parse a workspace aggregate file.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

lazy_static! {
    static ref DRIVE_PREFIX: Regex = Regex::new(r"^[A-Za-z]:\\").unwrap();
}

/// Resolve a declared path to an absolute path.
///
/// Absolute inputs (leading `/` or a `X:\` drive prefix) pass through
/// unchanged. Relative inputs are joined to the directory containing
/// `anchor_file`, the config or workspace file that declared them.
/// Returns `None` for entries that cannot be resolved; callers discard
/// the whole pair. The resolved path is not required to exist.
pub fn resolve_path(raw: &str, anchor_file: &Path) -> Option<PathBuf> {
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with('/') || DRIVE_PREFIX.is_match(raw) {
        return Some(PathBuf::from(raw));
    }
    let base = anchor_file.parent()?;
    if base.as_os_str().is_empty() {
        return None;
    }
    Some(base.join(raw))
}

/// Resolve a list of declared `[a, b]` pairs, dropping pairs where either
/// side fails to resolve.
pub fn resolve_pairs(pairs: &[(String, String)], anchor_file: &Path) -> Vec<(PathBuf, PathBuf)> {
    let mut resolved = Vec::with_capacity(pairs.len());
    for (a, b) in pairs {
        match (resolve_path(a, anchor_file), resolve_path(b, anchor_file)) {
            (Some(ra), Some(rb)) => resolved.push((ra, rb)),
            _ => {
                // Skip invalid entries
                tracing::warn!(a = %a, b = %b, "Skipping pair with unresolvable path");
            }
        }
    }
    resolved
}

/// Whether a path names a per-root configuration file.
pub fn is_config_file(path: &Path) -> bool {
    path.file_name().is_some_and(|name| name == CONFIG_FILE_NAME)
}

/// Whether a path names a workspace aggregate file.
pub fn is_workspace_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == WORKSPACE_FILE_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let json = r#"{ "folders": [["a", "b"]] }"#;

        let config: ConfigFile = serde_json::from_str(json).unwrap();
        assert_eq!(config.folders.len(), 1);
        assert_eq!(config.folders[0].0, "a");
        assert!(config.files.is_empty());
    }

    #[test]
    fn test_parse_config_with_files() {
        let json = r#"{
            "folders": [["src", "mirror/src"]],
            "files": [["notes.txt", "/tmp/notes.txt"]]
        }"#;

        let config: ConfigFile = serde_json::from_str(json).unwrap();
        assert_eq!(config.folders.len(), 1);
        assert_eq!(config.files.len(), 1);
        assert_eq!(config.files[0].1, "/tmp/notes.txt");
    }

    #[test]
    fn test_parse_config_missing_folders_fails() {
        let json = r#"{ "files": [["a", "b"]] }"#;

        assert!(serde_json::from_str::<ConfigFile>(json).is_err());
    }

    #[test]
    fn test_parse_workspace_settings() {
        let json = r#"{
            "folders": [{ "path": "." }],
            "settings": {
                "foldersync.folders": [["docs", "backup/docs"]]
            }
        }"#;

        let workspace: WorkspaceFile = serde_json::from_str(json).unwrap();
        assert_eq!(workspace.settings.folders.len(), 1);
        assert!(workspace.settings.files.is_empty());
    }

    #[test]
    fn test_parse_workspace_without_settings() {
        let workspace: WorkspaceFile = serde_json::from_str("{}").unwrap();
        assert!(workspace.settings.folders.is_empty());
    }

    #[test]
    fn test_resolve_absolute_path_unchanged() {
        let anchor = Path::new("/ws/foldersync.config.json");
        assert_eq!(
            resolve_path("/etc/hosts", anchor),
            Some(PathBuf::from("/etc/hosts"))
        );
    }

    #[test]
    fn test_resolve_drive_prefix_unchanged() {
        let anchor = Path::new("/ws/foldersync.config.json");
        assert_eq!(
            resolve_path(r"C:\data\a.txt", anchor),
            Some(PathBuf::from(r"C:\data\a.txt"))
        );
    }

    #[test]
    fn test_resolve_relative_against_anchor_dir() {
        let anchor = Path::new("/ws/project/foldersync.config.json");
        assert_eq!(
            resolve_path("sub/a.txt", anchor),
            Some(PathBuf::from("/ws/project/sub/a.txt"))
        );
    }

    #[test]
    fn test_resolve_empty_is_invalid() {
        let anchor = Path::new("/ws/foldersync.config.json");
        assert_eq!(resolve_path("", anchor), None);
    }

    #[test]
    fn test_resolve_pairs_skips_invalid_entries() {
        let anchor = Path::new("/ws/foldersync.config.json");
        let pairs = vec![
            ("a".to_string(), "b".to_string()),
            ("".to_string(), "c".to_string()),
        ];

        let resolved = resolve_pairs(&pairs, anchor);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].0, PathBuf::from("/ws/a"));
    }

    #[test]
    fn test_is_config_file() {
        assert!(is_config_file(Path::new("/ws/foldersync.config.json")));
        assert!(is_config_file(Path::new("foldersync.config.json")));
        assert!(!is_config_file(Path::new("/ws/other.json")));
    }

    #[test]
    fn test_is_workspace_file() {
        assert!(is_workspace_file(Path::new("/ws/team.code-workspace")));
        assert!(!is_workspace_file(Path::new("/ws/team.json")));
    }
}
