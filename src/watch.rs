//! File system event source
//!
//! Bridges `notify` events into the engine's four handlers for the
//! `watch` command. The watcher thread forwards raw events through a
//! channel into the single-threaded runtime, where they are classified
//! and dispatched one at a time.

use crate::engine::SyncEngine;
use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Watch the workspace roots and every folder holding a tracked path,
/// dispatching events to the engine until the channel closes.
///
/// TODO: re-register watches after a rescan adds folder pairs outside
/// the currently watched roots; today those are picked up on restart.
pub async fn watch(engine: &mut SyncEngine, roots: &[PathBuf]) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut watcher: RecommendedWatcher =
        notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = tx.send(res);
        })
        .context("Failed to create file system watcher")?;

    for root in watch_roots(engine, roots) {
        match watcher.watch(&root, RecursiveMode::Recursive) {
            Ok(()) => tracing::info!(root = %root.display(), "Watching"),
            Err(err) => tracing::warn!(
                root = %root.display(),
                error = %err,
                "Could not watch folder"
            ),
        }
    }

    while let Some(res) = rx.recv().await {
        match res {
            Ok(event) => dispatch(engine, event).await,
            Err(err) => tracing::error!(error = %err, "Watch error"),
        }
    }

    Ok(())
}

/// The distinct folders to watch: workspace roots plus the parent
/// folder of every tracked path, with folders already covered by an
/// ancestor dropped (watches are recursive).
fn watch_roots(engine: &SyncEngine, roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates: BTreeSet<PathBuf> = roots.iter().cloned().collect();
    for dir in engine.mapping().tracked_parent_dirs() {
        candidates.insert(dir.to_path_buf());
    }

    let mut result: Vec<PathBuf> = Vec::new();
    for candidate in candidates {
        // BTreeSet order guarantees ancestors come first
        if !result.iter().any(|kept| candidate.starts_with(kept)) {
            result.push(candidate);
        }
    }
    result
}

async fn dispatch(engine: &mut SyncEngine, event: notify::Event) {
    match event.kind {
        EventKind::Create(_) => engine.on_files_created(&event.paths).await,
        EventKind::Remove(_) => engine.on_files_deleted(&event.paths).await,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            engine.on_files_renamed(&rename_pairs(&event.paths)).await;
        }
        // One-sided renames: the old path vanished or a new one appeared
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            engine.on_files_deleted(&event.paths).await;
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            engine.on_files_created(&event.paths).await;
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                engine.on_document_saved(path).await;
            }
        }
        _ => {}
    }
}

/// `RenameMode::Both` events carry `[old, new]` path sequences.
fn rename_pairs(paths: &[PathBuf]) -> Vec<(PathBuf, PathBuf)> {
    paths
        .chunks(2)
        .filter_map(|chunk| match chunk {
            [old, new] => Some((old.clone(), new.clone())),
            _ => None,
        })
        .collect()
}
