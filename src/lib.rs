//! FolderSync - Workspace File Pair Synchronization
//!
//! Keeps configured pairs of files and folders content-identical: when
//! a tracked file is saved, created, deleted, or renamed, the change is
//! mirrored to its counterpart. Pairs are declared in per-root
//! `foldersync.config.json` files and workspace settings, expanded into
//! one canonical bidirectional mapping, and kept safe from sync loops
//! by content hashing and a re-entrancy guard around the engine's own
//! file operations.

pub mod compare;
pub mod config;
pub mod engine;
pub mod guard;
pub mod mapping;
pub mod reconcile;
pub mod scan;
pub mod tree;
pub mod watch;

pub use config::{CONFIG_FILE_NAME, ConfigFile, WorkspaceFile};
pub use engine::SyncEngine;
pub use mapping::PairMap;
pub use reconcile::ReconcileReport;
pub use scan::Scan;
pub use tree::SyncTree;
