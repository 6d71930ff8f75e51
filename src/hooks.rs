//! Commit hook registration.
//!
//! A unit of work exposes two registration points: hooks that run while the
//! commit is being attempted, and hooks that run once the outcome is known.
//! Each point has its own callback type so a hook never has to guess which
//! way it was invoked.

use parking_lot::Mutex;
use std::mem;

use crate::TransactionResult;

/// Callback fired immediately before the unit of work commits.
pub type BeforeCommitHook = Box<dyn FnOnce() -> TransactionResult<()> + Send>;

/// Callback fired once the unit of work knows whether its commit succeeded.
pub type AfterCommitHook = Box<dyn FnOnce(CommitOutcome) -> TransactionResult<()> + Send>;

/// Outcome delivered to every after-commit hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    Failed,
}

impl CommitOutcome {
    /// Whether the commit went through.
    pub fn succeeded(self) -> bool {
        matches!(self, CommitOutcome::Committed)
    }
}

impl From<bool> for CommitOutcome {
    fn from(succeeded: bool) -> Self {
        if succeeded {
            CommitOutcome::Committed
        } else {
            CommitOutcome::Failed
        }
    }
}

/// Registration surface of a unit of work.
///
/// The dispatcher only ever registers hooks through this trait; creating,
/// committing and rolling back the unit of work stays with its owner.
pub trait CommitHooks: Send + Sync {
    /// Register a hook to run before the commit is attempted.
    fn add_before_commit_hook(&self, hook: BeforeCommitHook);

    /// Register a hook to run after the commit resolves.
    fn add_after_commit_hook(&self, hook: AfterCommitHook);
}

/// Ordered before/after-commit hook lists owned by a unit of work.
#[derive(Default)]
pub struct HookRegistry {
    before: Mutex<Vec<BeforeCommitHook>>,
    after: Mutex<Vec<AfterCommitHook>>,
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pending `(before, after)` hooks.
    pub fn pending(&self) -> (usize, usize) {
        (self.before.lock().len(), self.after.lock().len())
    }

    /// Run before-commit hooks in registration order.
    ///
    /// Hooks registered by a running hook are run in the same pass. The first
    /// failing hook aborts the pass; hooks behind it are dropped unrun.
    pub fn run_before_commit(&self) -> TransactionResult<()> {
        loop {
            let batch = mem::take(&mut *self.before.lock());
            if batch.is_empty() {
                return Ok(());
            }
            tracing::debug!(count = batch.len(), "running before-commit hooks");
            for hook in batch {
                if let Err(err) = hook() {
                    self.before.lock().clear();
                    return Err(err);
                }
            }
        }
    }

    /// Run every after-commit hook in registration order with `outcome`.
    ///
    /// Hooks registered by a running hook get the same outcome in the same
    /// pass. A failing hook does not stop the others. Failures are logged and
    /// the first one is returned.
    pub fn run_after_commit(&self, outcome: CommitOutcome) -> TransactionResult<()> {
        let mut first_error = None;
        loop {
            let batch = mem::take(&mut *self.after.lock());
            if batch.is_empty() {
                return first_error.map_or(Ok(()), Err);
            }
            tracing::debug!(count = batch.len(), ?outcome, "running after-commit hooks");
            for hook in batch {
                if let Err(err) = hook(outcome) {
                    tracing::error!(error = %err, "after-commit hook failed");
                    first_error.get_or_insert(err);
                }
            }
        }
    }

    /// Drop pending before-commit hooks; used when a commit is never attempted.
    pub fn discard_before_commit(&self) {
        self.before.lock().clear();
    }

    /// Drop every pending hook without running it.
    pub fn discard(&self) {
        self.discard_before_commit();
        self.after.lock().clear();
    }
}

impl CommitHooks for HookRegistry {
    fn add_before_commit_hook(&self, hook: BeforeCommitHook) {
        self.before.lock().push(hook);
    }

    fn add_after_commit_hook(&self, hook: AfterCommitHook) {
        self.after.lock().push(hook);
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (before, after) = self.pending();
        f.debug_struct("HookRegistry")
            .field("before", &before)
            .field("after", &after)
            .finish()
    }
}
