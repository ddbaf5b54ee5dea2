//! Initial synchronization
//!
//! One-shot reconciliation over all logical pairs: fills in missing
//! counterparts and, where both sides exist, lets the more recently
//! modified side win. A failure on one pair never aborts the rest of
//! the batch.

use crate::mapping::PairMap;
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

/// Modification times closer than this are treated as simultaneous and
/// the pair is skipped; filesystem timestamp jitter would otherwise
/// cause needless churn.
const MTIME_TOLERANCE: Duration = Duration::from_millis(5);

/// Outcome of a reconciliation run.
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Number of copies performed
    pub copied: usize,
    /// Per-pair failure messages
    pub errors: Vec<String>,
}

impl ReconcileReport {
    /// Clean completion, as opposed to completed-with-errors.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Reconcile every logical pair in the mapping.
///
/// Callers hold the internal-operation guard across the whole batch;
/// see `SyncEngine::initial_sync`.
pub(crate) async fn reconcile_pairs(mapping: &PairMap) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for (a, b) in mapping.logical_pairs() {
        if let Err(err) = reconcile_pair(&a, &b, &mut report).await {
            let message = format!("{} <-> {}: {err:#}", a.display(), b.display());
            tracing::error!(pair = %message, "Initial sync error");
            report.errors.push(message);
        }
    }

    report
}

async fn reconcile_pair(a: &Path, b: &Path, report: &mut ReconcileReport) -> Result<()> {
    let meta_a = tokio::fs::metadata(a).await.ok();
    let meta_b = tokio::fs::metadata(b).await.ok();

    match (meta_a, meta_b) {
        // Both absent, nothing to do
        (None, None) => Ok(()),
        (Some(_), None) => copy_to_missing(a, b, report).await,
        (None, Some(_)) => copy_to_missing(b, a, report).await,
        (Some(meta_a), Some(meta_b)) => {
            let mtime_a = meta_a
                .modified()
                .with_context(|| format!("No modification time for {}", a.display()))?;
            let mtime_b = meta_b
                .modified()
                .with_context(|| format!("No modification time for {}", b.display()))?;

            let delta = mtime_a
                .duration_since(mtime_b)
                .unwrap_or_else(|err| err.duration());
            if delta < MTIME_TOLERANCE {
                return Ok(());
            }

            let (winner, loser) = if mtime_a > mtime_b { (a, b) } else { (b, a) };
            tokio::fs::copy(winner, loser).await.with_context(|| {
                format!(
                    "Failed to copy {} -> {}",
                    winner.display(),
                    loser.display()
                )
            })?;
            report.copied += 1;
            tracing::info!(
                from = %winner.display(),
                to = %loser.display(),
                "Copied newer side over older"
            );
            Ok(())
        }
    }
}

/// Copy the existing side onto the missing side. The missing side's
/// parent directory must already exist; directory structure is never
/// created here, matching the save handler's policy.
async fn copy_to_missing(existing: &Path, missing: &Path, report: &mut ReconcileReport) -> Result<()> {
    let parent_exists = match missing.parent() {
        Some(parent) => tokio::fs::metadata(parent)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false),
        None => false,
    };
    if !parent_exists {
        tracing::warn!(
            target = %missing.display(),
            "Skipped copy; destination directory missing"
        );
        return Ok(());
    }

    tokio::fs::copy(existing, missing).await.with_context(|| {
        format!(
            "Failed to copy {} -> {}",
            existing.display(),
            missing.display()
        )
    })?;
    report.copied += 1;
    tracing::info!(
        from = %existing.display(),
        to = %missing.display(),
        "Copied to missing counterpart"
    );
    Ok(())
}
