//! Commit-deferred calls
//!
//! Joins side effects to a unit of work so they only happen once the work
//! has committed, optionally on a background thread. Ships a PostgreSQL unit
//! of work whose sessions fire the hooks around the real commit, and the
//! usual callers: flash messages, analytics tracking and webhook dispatch.

pub mod config;
pub mod dispatcher;
pub mod executor;
pub mod flash;
pub mod hooks;
pub mod track;
pub mod transaction_aware;
pub mod unit_of_work;
pub mod webhook;

pub use config::{EndpointSettings, Mode, Settings};
pub use dispatcher::{
    call_in_background, call_in_background_with, join, join_after_transaction, join_before_transaction,
    join_to_transaction, join_with_mode, DeferredCall, JoinMode, Spawner, ThreadSpawner,
};
pub use executor::Executor;
pub use hooks::{AfterCommitHook, BeforeCommitHook, CommitHooks, CommitOutcome, HookRegistry};
pub use transaction_aware::{TransactionAware, TransactionError, TransactionResult};
pub use unit_of_work::{PostgresUnitOfWork, PostgresUnitOfWorkSession, UnitOfWork, UnitOfWorkSession};
