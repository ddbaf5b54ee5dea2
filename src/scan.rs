//! Configuration aggregation
//!
//! Rebuilds the tracked-pair mapping and the display tree from every
//! configuration origin: workspace-scope settings plus one discovered
//! `foldersync.config.json` per workspace root. Every rescan starts
//! from scratch; nothing is patched incrementally. A broken origin is
//! logged and skipped, it never aborts the aggregation.

use crate::config::{self, CONFIG_FILE_NAME, ConfigFile, WorkspaceFile};
use crate::mapping::PairMap;
use crate::tree::SyncTree;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Result of one full configuration rescan.
#[derive(Debug, Default)]
pub struct Scan {
    pub mapping: PairMap,
    pub tree: Vec<SyncTree>,
}

/// Rebuild the mapping and display tree from all origins.
///
/// Workspace settings are read first, then the per-root config files,
/// so config-file entries overwrite workspace entries for the same
/// path (last write wins).
pub async fn rescan(workspace_file: Option<&Path>, roots: &[PathBuf]) -> Scan {
    let mut mapping = PairMap::new();
    let mut tree = Vec::new();

    if let Some(workspace_file) = workspace_file {
        let (fragment, node) = scan_workspace(workspace_file).await;
        mapping.merge(fragment);
        if let Some(node) = node {
            tree.push(node);
        }
    }

    let (fragment, node) = scan_config_files(roots).await;
    mapping.merge(fragment);
    tree.push(node);

    Scan { mapping, tree }
}

/// Read the workspace-scope declarations, anchored at the workspace
/// file itself. Returns no tree node when the workspace file cannot be
/// read or parsed.
async fn scan_workspace(workspace_file: &Path) -> (PairMap, Option<SyncTree>) {
    tracing::debug!(path = %workspace_file.display(), "Reading workspace settings");

    let workspace = match WorkspaceFile::load(workspace_file).await {
        Ok(workspace) => workspace,
        Err(err) => {
            tracing::warn!(error = %err, "Skipping workspace settings");
            return (PairMap::new(), None);
        }
    };

    let mut mapping = PairMap::new();
    let mut children = Vec::new();

    for (a, b) in config::resolve_pairs(&workspace.settings.folders, workspace_file) {
        let (fragment, node) = expand_folder_pair(&a, &b).await;
        mapping.merge(fragment);
        children.push(node);
    }
    register_file_pairs(
        &workspace.settings.files,
        workspace_file,
        &mut mapping,
        &mut children,
    );

    (mapping, Some(SyncTree::container("from workspace", children)))
}

/// Check every workspace root for a config file and aggregate the ones
/// that parse. Each discovered file gets its own container node.
async fn scan_config_files(roots: &[PathBuf]) -> (PairMap, SyncTree) {
    let mut mapping = PairMap::new();
    let mut containers = Vec::new();

    for root in roots {
        let config_path = root.join(CONFIG_FILE_NAME);
        if !tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
            tracing::debug!(root = %root.display(), "No {CONFIG_FILE_NAME} found");
            continue;
        }

        let file = match ConfigFile::load(&config_path).await {
            Ok(file) => file,
            Err(err) => {
                tracing::warn!(error = %err, "Skipping config file");
                continue;
            }
        };

        let mut children = Vec::new();
        for (a, b) in config::resolve_pairs(&file.folders, &config_path) {
            let (fragment, node) = expand_folder_pair(&a, &b).await;
            mapping.merge(fragment);
            children.push(node);
        }
        register_file_pairs(&file.files, &config_path, &mut mapping, &mut children);

        containers.push(SyncTree::container(
            format!("from config file: {}", config_path.display()),
            children,
        ));
    }

    (mapping, SyncTree::container("from config files", containers))
}

/// Resolve direct file pairs and register them without expansion.
fn register_file_pairs(
    pairs: &[(String, String)],
    anchor_file: &Path,
    mapping: &mut PairMap,
    children: &mut Vec<SyncTree>,
) {
    for (a, b) in config::resolve_pairs(pairs, anchor_file) {
        children.push(SyncTree::pair(format!("{} <-> {}", a.display(), b.display())));
        mapping.insert_pair(a, b);
    }
}

/// Expand a folder pair into one tracked pair per relative file path.
///
/// Both folders must exist and be directories; otherwise the pair is
/// skipped for this rescan and represented by an error node naming the
/// missing side(s). The union of both folders' recursive contents is
/// used, so a file present on only one side still produces a tracked
/// pair; its counterpart may simply not exist yet.
pub async fn expand_folder_pair(folder_a: &Path, folder_b: &Path) -> (PairMap, SyncTree) {
    let label = format!("{} <-> {}", folder_a.display(), folder_b.display());

    let mut missing = Vec::new();
    for folder in [folder_a, folder_b] {
        if !is_dir(folder).await {
            missing.push(folder);
        }
    }
    if !missing.is_empty() {
        let children = missing
            .iter()
            .map(|folder| SyncTree::pair(format!("Missing folder: {}", folder.display())))
            .collect();
        tracing::warn!(pair = %label, "Folder pair not expanded; folder(s) missing");
        return (PairMap::new(), SyncTree::folder_error(label, children));
    }

    let (rel_a, rel_b) = match (
        list_files_recursive(folder_a).await,
        list_files_recursive(folder_b).await,
    ) {
        (Ok(rel_a), Ok(rel_b)) => (rel_a, rel_b),
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!(pair = %label, error = %err, "Error reading folder pair");
            let children = vec![SyncTree::pair("Error reading folder(s)")];
            return (PairMap::new(), SyncTree::folder_error(label, children));
        }
    };

    let union: BTreeSet<PathBuf> = rel_a.into_iter().chain(rel_b).collect();

    let mut mapping = PairMap::new();
    let mut children = Vec::new();
    for rel in &union {
        let full_a = folder_a.join(rel);
        let full_b = folder_b.join(rel);
        // Re-stat: the walk may be stale, and only regular files pair up
        if is_file(&full_a).await || is_file(&full_b).await {
            children.push(SyncTree::pair(format!(
                "{} <-> {}",
                rel.display(),
                rel.display()
            )));
            mapping.insert_pair(full_a, full_b);
        }
    }

    if children.is_empty() {
        children.push(SyncTree::pair("(empty)"));
    }

    (mapping, SyncTree::folder(label, children))
}

/// Recursively list every regular file under `root`, as paths relative
/// to `root`. Iterative traversal; symlinks and special files are
/// skipped.
async fn list_files_recursive(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to read directory entry in {}", dir.display()))?
        {
            let file_type = entry
                .file_type()
                .await
                .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
            let path = entry.path();

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file()
                && let Ok(rel) = path.strip_prefix(root)
            {
                files.push(rel.to_path_buf());
            }
        }
    }

    Ok(files)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_dir())
        .unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
