//! The canonical mapping of tracked paths
//!
//! Every configured pair is stored as two directed entries, `a -> b`
//! and `b -> a`, so a counterpart lookup is a single map access from
//! either side. The mapping is rebuilt from scratch on every rescan and
//! treated as immutable between rebuilds.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Bidirectional path-to-counterpart mapping.
///
/// Invariant: symmetric; whenever `x -> y` is present, `y -> x` is
/// present too. A path maps to exactly one counterpart; inserting a
/// pair that reuses a path overwrites the previous association
/// (last write wins).
#[derive(Debug, Default, Clone)]
pub struct PairMap {
    inner: HashMap<PathBuf, PathBuf>,
}

impl PairMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tracked pair, writing both directions. If either path
    /// was already paired elsewhere, the stale association is removed in
    /// both directions so the mapping stays symmetric.
    pub fn insert_pair(&mut self, a: PathBuf, b: PathBuf) {
        self.unlink(&a);
        self.unlink(&b);
        self.inner.insert(a.clone(), b.clone());
        self.inner.insert(b, a);
    }

    /// Remove the directed entry for `path`, plus its reverse if the
    /// reverse still points back at `path`.
    fn unlink(&mut self, path: &Path) {
        if let Some(prev) = self.inner.remove(path)
            && self.inner.get(&prev).is_some_and(|back| back == path)
        {
            self.inner.remove(&prev);
        }
    }

    /// The counterpart of a tracked path, if any.
    pub fn counterpart(&self, path: &Path) -> Option<&Path> {
        self.inner.get(path).map(PathBuf::as_path)
    }

    pub fn is_tracked(&self, path: &Path) -> bool {
        self.inner.contains_key(path)
    }

    /// Number of directed entries (twice the number of logical pairs for
    /// a fully symmetric mapping).
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Fold another mapping into this one. Pairs from `other` win on
    /// collision, so later configuration origins overwrite earlier
    /// ones.
    pub fn merge(&mut self, other: PairMap) {
        // Each logical pair appears twice in `other`; re-inserting the
        // reverse direction is a no-op.
        for (a, b) in other.inner {
            self.insert_pair(a, b);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &PathBuf)> {
        self.inner.iter()
    }

    /// Deduplicate the directed entries into canonical logical pairs,
    /// each unordered pair exactly once with its sides in lexicographic
    /// order. The result is sorted, so iteration order is stable.
    pub fn logical_pairs(&self) -> Vec<(PathBuf, PathBuf)> {
        let mut pairs: BTreeSet<(PathBuf, PathBuf)> = BTreeSet::new();
        for (a, b) in &self.inner {
            let (first, second) = if a <= b { (a, b) } else { (b, a) };
            pairs.insert((first.clone(), second.clone()));
        }
        pairs.into_iter().collect()
    }

    /// Parent directories of every tracked path. Used to decide whether
    /// a newly created file landed inside a synced folder.
    pub fn tracked_parent_dirs(&self) -> HashSet<&Path> {
        self.inner
            .keys()
            .filter_map(|path| path.parent())
            .collect()
    }
}
