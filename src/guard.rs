//! Re-entrancy guard
//!
//! Marks file system mutations performed by the engine itself so that
//! its own deletes, renames, and reconcile copies are not re-processed
//! as user actions. A single shared flag is enough because event
//! delivery is single-threaded; the guard releases on drop, so a failed
//! operation can never leave the flag stuck and silently disable
//! propagation.

use std::cell::Cell;

/// Process-wide (per engine) internal-operation flag.
#[derive(Debug, Default)]
pub struct InternalOpFlag {
    active: Cell<bool>,
}

impl InternalOpFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an engine-initiated operation is currently in flight.
    pub fn is_set(&self) -> bool {
        self.active.get()
    }

    /// Set the flag for the lifetime of the returned guard.
    pub fn enter(&self) -> InternalOpGuard<'_> {
        self.active.set(true);
        InternalOpGuard { flag: &self.active }
    }
}

/// Scoped acquisition of the internal-operation flag. Clears the flag
/// when dropped, including on early returns and unwinds.
#[must_use = "dropping the guard immediately clears the flag"]
pub struct InternalOpGuard<'a> {
    flag: &'a Cell<bool>,
}

impl Drop for InternalOpGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
