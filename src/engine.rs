//! The synchronization engine
//!
//! Owns the tracked-pair mapping, the display tree, and the
//! internal-operation flag, and reacts to the four file system events
//! the host delivers: document saved, files created, files deleted,
//! files renamed. Each event is classified and handled independently;
//! the only cross-event state is the mapping (replaced wholesale by
//! `rescan`) and the flag.

use crate::compare;
use crate::config;
use crate::guard::InternalOpFlag;
use crate::mapping::PairMap;
use crate::reconcile::{self, ReconcileReport};
use crate::scan::{self, Scan};
use crate::tree::SyncTree;
use std::path::{Path, PathBuf};

/// The event-reaction core. Constructed once at startup; handlers are
/// safe to invoke at any time and never fail the caller.
pub struct SyncEngine {
    workspace_file: Option<PathBuf>,
    roots: Vec<PathBuf>,
    mapping: PairMap,
    tree: Vec<SyncTree>,
    internal_op: InternalOpFlag,
}

impl SyncEngine {
    /// Create an engine with an empty mapping. Call `rescan` to load
    /// the configuration.
    pub fn new(workspace_file: Option<PathBuf>, roots: Vec<PathBuf>) -> Self {
        Self {
            workspace_file,
            roots,
            mapping: PairMap::new(),
            tree: Vec::new(),
            internal_op: InternalOpFlag::new(),
        }
    }

    /// The current mapping. Immutable between rescans.
    pub fn mapping(&self) -> &PairMap {
        &self.mapping
    }

    /// The current display tree.
    pub fn tree(&self) -> &[SyncTree] {
        &self.tree
    }

    /// Whether an engine-initiated file operation is in flight.
    pub fn internal_op_active(&self) -> bool {
        self.internal_op.is_set()
    }

    /// Rebuild the mapping and tree from all configuration origins.
    /// The previous mapping stays visible until the new one is fully
    /// constructed, then both are replaced in one assignment.
    pub async fn rescan(&mut self) {
        let Scan { mapping, tree } = scan::rescan(self.workspace_file.as_deref(), &self.roots).await;
        self.mapping = mapping;
        self.tree = tree;
        tracing::info!(tracked = self.mapping.len(), "Configuration rescan complete");
    }

    /// Handle a saved document.
    ///
    /// Saving a config or workspace file reconfigures instead of
    /// syncing. For tracked files the counterpart is overwritten with
    /// the saved content unless the two are already byte-identical,
    /// which is the check that stops save-triggered sync loops. The
    /// save handler never creates directory structure.
    pub async fn on_document_saved(&mut self, path: &Path) {
        tracing::debug!(path = %path.display(), "Document saved");

        if self.internal_op.is_set() || reconfigures(path) {
            tracing::info!("Configuration may have changed; rescanning");
            self.rescan().await;
            return;
        }

        let Some(counterpart) = self.mapping.counterpart(path).map(Path::to_path_buf) else {
            tracing::debug!(path = %path.display(), "Saved document is not in the sync list");
            return;
        };

        if compare::files_equal(path, &counterpart).await {
            tracing::debug!(
                path = %path.display(),
                "Files are identical by hash; no action taken"
            );
            return;
        }

        if !parent_dir_exists(&counterpart).await {
            tracing::warn!(
                target = %counterpart.display(),
                "Skipped sync; destination directory missing"
            );
            return;
        }

        match tokio::fs::copy(path, &counterpart).await {
            Ok(_) => tracing::info!(
                from = %path.display(),
                to = %counterpart.display(),
                "Synchronized"
            ),
            Err(err) => tracing::error!(
                from = %path.display(),
                to = %counterpart.display(),
                error = %err,
                "Error synchronizing"
            ),
        }
    }

    /// Handle newly created files. Creation never propagates directly;
    /// it can only invalidate the configuration, so the handler decides
    /// whether a rescan is needed: a new config/workspace file, or a
    /// file landing inside a folder that already holds tracked paths.
    pub async fn on_files_created(&mut self, paths: &[PathBuf]) {
        let mut needs_rescan = false;

        if paths.iter().any(|path| config::is_config_file(path)) {
            tracing::info!("Detected creation of a new config file");
            needs_rescan = true;
        }
        if paths.iter().any(|path| config::is_workspace_file(path)) {
            tracing::info!("Detected creation of a new workspace file");
            needs_rescan = true;
        }

        let in_synced_folder = {
            let tracked_dirs = self.mapping.tracked_parent_dirs();
            paths
                .iter()
                .any(|path| tracked_dirs.iter().any(|dir| path.starts_with(dir)))
        };
        if in_synced_folder {
            tracing::info!("Detected creation of a new file in a synced folder");
            needs_rescan = true;
        }

        if needs_rescan {
            self.rescan().await;
        }
    }

    /// Handle deleted files: a tracked file's deletion is propagated to
    /// its counterpart, performed under the internal-operation guard so
    /// the secondary deletion is not re-propagated. One batch rescan
    /// runs after all paths are processed.
    pub async fn on_files_deleted(&mut self, paths: &[PathBuf]) {
        if self.internal_op.is_set() {
            return;
        }

        let mut needs_rescan = false;

        for path in paths {
            tracing::debug!(path = %path.display(), "Detected deletion");

            if reconfigures(path) {
                needs_rescan = true;
                continue;
            }

            let Some(counterpart) = self.mapping.counterpart(path).map(Path::to_path_buf) else {
                continue; // not tracked
            };

            {
                let _guard = self.internal_op.enter();
                match tokio::fs::metadata(&counterpart).await {
                    Ok(meta) if meta.is_file() => {
                        match tokio::fs::remove_file(&counterpart).await {
                            Ok(()) => tracing::info!(
                                path = %counterpart.display(),
                                "Propagated deletion to counterpart"
                            ),
                            Err(err) => tracing::error!(
                                path = %counterpart.display(),
                                error = %err,
                                "Error deleting counterpart"
                            ),
                        }
                    }
                    _ => {}
                }
            }

            // Mapping may now be stale regardless of the outcome
            needs_rescan = true;
        }

        if needs_rescan {
            self.rescan().await;
        }
    }

    /// Handle renamed files: the counterpart takes the new basename in
    /// its own directory. Unlike the save handler, rename propagation
    /// may create the counterpart directory (the destination is being
    /// relocated, not first-synced) and overwrites any file already at
    /// the target. One batch rescan runs after all pairs are processed.
    pub async fn on_files_renamed(&mut self, pairs: &[(PathBuf, PathBuf)]) {
        if self.internal_op.is_set() {
            return;
        }

        let mut needs_rescan = false;

        for (old_path, new_path) in pairs {
            tracing::debug!(
                from = %old_path.display(),
                to = %new_path.display(),
                "Detected rename"
            );

            if reconfigures(old_path) {
                needs_rescan = true;
                continue;
            }

            let Some(counterpart) = self.mapping.counterpart(old_path).map(Path::to_path_buf)
            else {
                continue; // not tracked
            };

            let Some(new_name) = new_path.file_name() else {
                continue;
            };
            let Some(counterpart_dir) = counterpart.parent().map(Path::to_path_buf) else {
                continue;
            };
            let counterpart_new = counterpart_dir.join(new_name);

            if counterpart_new == counterpart {
                continue; // name unchanged relative to counterpart
            }

            {
                let _guard = self.internal_op.enter();

                if let Err(err) = tokio::fs::create_dir_all(&counterpart_dir).await {
                    tracing::warn!(
                        dir = %counterpart_dir.display(),
                        error = %err,
                        "Could not ensure counterpart directory"
                    );
                }

                match tokio::fs::metadata(&counterpart).await {
                    Ok(meta) if meta.is_file() => {
                        if tokio::fs::metadata(&counterpart_new)
                            .await
                            .map(|meta| meta.is_file())
                            .unwrap_or(false)
                        {
                            // Overwrite whatever is at the target
                            let _ = tokio::fs::remove_file(&counterpart_new).await;
                        }
                        match tokio::fs::rename(&counterpart, &counterpart_new).await {
                            Ok(()) => tracing::info!(
                                from = %counterpart.display(),
                                to = %counterpart_new.display(),
                                "Propagated rename"
                            ),
                            Err(err) => tracing::error!(
                                from = %counterpart.display(),
                                to = %counterpart_new.display(),
                                error = %err,
                                "Error propagating rename"
                            ),
                        }
                    }
                    _ => {} // counterpart missing; nothing to rename
                }
            }

            needs_rescan = true;
        }

        if needs_rescan {
            self.rescan().await;
        }
    }

    /// Run the initial synchronization over all logical pairs. The
    /// whole batch holds the internal-operation guard so none of its
    /// copies are re-processed as user edits.
    pub async fn initial_sync(&self) -> ReconcileReport {
        if self.mapping.is_empty() {
            tracing::info!("No files configured for synchronization");
            return ReconcileReport::default();
        }

        let _guard = self.internal_op.enter();
        reconcile::reconcile_pairs(&self.mapping).await
    }
}

/// Whether saving/creating/deleting this path can change the
/// configuration rather than tracked content.
fn reconfigures(path: &Path) -> bool {
    config::is_config_file(path) || config::is_workspace_file(path)
}

async fn parent_dir_exists(path: &Path) -> bool {
    match path.parent() {
        Some(parent) => tokio::fs::metadata(parent)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconfigures_matches_config_and_workspace_files() {
        assert!(reconfigures(Path::new("/ws/foldersync.config.json")));
        assert!(reconfigures(Path::new("/ws/team.code-workspace")));
        assert!(!reconfigures(Path::new("/ws/src/main.rs")));
    }

    #[tokio::test]
    async fn test_new_engine_starts_empty() {
        let engine = SyncEngine::new(None, vec![]);
        assert!(engine.mapping().is_empty());
        assert!(engine.tree().is_empty());
        assert!(!engine.internal_op_active());
    }

    #[tokio::test]
    async fn test_initial_sync_on_empty_mapping_is_clean_noop() {
        let engine = SyncEngine::new(None, vec![]);
        let report = engine.initial_sync().await;
        assert_eq!(report.copied, 0);
        assert!(report.is_clean());
        assert!(!engine.internal_op_active());
    }
}
