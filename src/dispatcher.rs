//! Commit-deferred dispatcher.
//!
//! Decouples deciding to perform a side effect (while handling a request)
//! from performing it (once the enclosing unit of work has resolved), and
//! optionally moves the effect onto a background thread.

use std::fmt;
use std::str::FromStr;
use std::thread;
use uuid::Uuid;

use crate::hooks::{CommitHooks, CommitOutcome};
use crate::{TransactionError, TransactionResult};

/// A callable and its captured arguments, stored until a commit hook fires.
pub struct DeferredCall {
    id: Uuid,
    label: String,
    call: Box<dyn FnOnce() -> TransactionResult<()> + Send>,
}

impl DeferredCall {
    /// Defer a closure that already captures everything it needs.
    pub fn new<F>(call: F) -> Self
    where
        F: FnOnce() -> TransactionResult<()> + Send + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            label: std::any::type_name::<F>().to_string(),
            call: Box::new(call),
        }
    }

    /// Defer `callable(args)`, capturing `args` now.
    pub fn with_args<F, A>(callable: F, args: A) -> Self
    where
        F: FnOnce(A) -> TransactionResult<()> + Send + 'static,
        A: Send + 'static,
    {
        let mut deferred = Self::new(move || callable(args));
        deferred.label = std::any::type_name::<F>().to_string();
        deferred
    }

    /// Replace the name used for this call in log output.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Unique id of this call, used to correlate log lines.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of this call in log output.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the call on the current thread.
    pub fn invoke(self) -> TransactionResult<()> {
        tracing::debug!(id = %self.id, label = %self.label, "invoking deferred call");
        (self.call)()
    }
}

impl fmt::Debug for DeferredCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredCall")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Where a deferred call is attached relative to the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    Before,
    #[default]
    After,
}

impl FromStr for JoinMode {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(JoinMode::Before),
            "after" => Ok(JoinMode::After),
            other => Err(TransactionError::UnknownJoinMode(other.to_string())),
        }
    }
}

/// Register `call` on `tx` according to `mode`.
pub fn join_with_mode<T>(tx: &T, mode: JoinMode, call: DeferredCall)
where
    T: CommitHooks + ?Sized,
{
    tracing::debug!(id = %call.id, label = %call.label, ?mode, "joining deferred call to transaction");

    match mode {
        JoinMode::Before => tx.add_before_commit_hook(Box::new(move || call.invoke())),
        JoinMode::After => tx.add_after_commit_hook(Box::new(move |outcome: CommitOutcome| {
            if outcome == CommitOutcome::Failed {
                tracing::debug!(id = %call.id, label = %call.label, "commit failed, skipping deferred call");
                return Ok(());
            }
            call.invoke()
        })),
    }
}

/// Register `call` using a textual join mode, `"before"` or `"after"`.
///
/// An unknown mode is rejected before anything is registered.
pub fn join<T>(tx: &T, when: &str, call: DeferredCall) -> TransactionResult<()>
where
    T: CommitHooks + ?Sized,
{
    let mode = when.parse::<JoinMode>()?;
    join_with_mode(tx, mode, call);
    Ok(())
}

/// Run `call` immediately before `tx` commits.
pub fn join_before_transaction<T>(tx: &T, call: DeferredCall)
where
    T: CommitHooks + ?Sized,
{
    join_with_mode(tx, JoinMode::Before, call)
}

/// Run `call` after `tx` commits, and only if the commit succeeded.
pub fn join_after_transaction<T>(tx: &T, call: DeferredCall)
where
    T: CommitHooks + ?Sized,
{
    join_with_mode(tx, JoinMode::After, call)
}

/// Default join: after a successful commit.
pub fn join_to_transaction<T>(tx: &T, call: DeferredCall)
where
    T: CommitHooks + ?Sized,
{
    join_after_transaction(tx, call)
}

/// Starts a deferred call somewhere other than the committing thread.
pub trait Spawner: Send + Sync {
    /// Start `call`. Only a failure to start is returned; the call's own
    /// result stays with whoever runs it.
    fn spawn(&self, call: DeferredCall) -> TransactionResult<()>;
}

/// One detached OS thread per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSpawner;

/// The call's error cannot reach the committing thread, so the worker logs it.
impl Spawner for ThreadSpawner {
    fn spawn(&self, call: DeferredCall) -> TransactionResult<()> {
        let name = format!("deferred-{}", call.id.simple());
        thread::Builder::new().name(name).spawn(move || {
            let id = call.id;
            let label = call.label.clone();
            if let Err(err) = call.invoke() {
                tracing::error!(%id, %label, error = %err, "background call failed");
            }
        })?;
        Ok(())
    }
}

/// Run `call` on a new background thread once `tx` has committed.
pub fn call_in_background<T>(tx: &T, call: DeferredCall)
where
    T: CommitHooks + ?Sized,
{
    call_in_background_with(tx, ThreadSpawner, call)
}

/// Like [`call_in_background`], starting the call through `spawner`.
pub fn call_in_background_with<T, S>(tx: &T, spawner: S, call: DeferredCall)
where
    T: CommitHooks + ?Sized,
    S: Spawner + 'static,
{
    let label = format!("start {}", call.label);
    let start = DeferredCall::new(move || spawner.spawn(call)).labelled(label);
    join_after_transaction(tx, start)
}
