use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use crate::hooks::{AfterCommitHook, BeforeCommitHook, CommitHooks, CommitOutcome, HookRegistry};
use crate::{Executor, TransactionAware, TransactionError, TransactionResult};

/// Unit of Work pattern for managing database transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Session: UnitOfWorkSession;

    /// Begin a new transaction session.
    async fn begin(&self) -> TransactionResult<Self::Session>;
}

/// A single database transaction session.
///
/// Sessions accept commit hooks (so deferred calls can be joined to them)
/// and transaction-aware observers. On commit the order is: before-commit
/// hooks, database commit, after-commit hooks, observers.
#[async_trait]
pub trait UnitOfWorkSession: CommitHooks {
    /// Get the executor for this session (provides access to the transaction).
    fn executor(&self) -> &Executor;

    /// Register a component that needs to be notified of transaction events.
    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>);

    /// Commit the transaction, firing hooks and notifying observers.
    ///
    /// If a before-commit hook or the database commit fails, after-commit
    /// hooks still run with [`CommitOutcome::Failed`]. Their own errors are
    /// only logged; the returned error is the one that stopped the commit.
    async fn commit(self) -> TransactionResult<()>;

    /// Roll the transaction back, discarding after-commit work.
    ///
    /// Pending before-commit hooks are dropped unrun and after-commit hooks
    /// run with [`CommitOutcome::Failed`]. Errors from those after-commit
    /// hooks are logged by the registry and not returned.
    async fn rollback(self) -> TransactionResult<()>;
}

/// Default implementation of UnitOfWork for PostgreSQL.
pub struct PostgresUnitOfWork {
    pool: Arc<PgPool>,
}

impl PostgresUnitOfWork {
    /// Create a new PostgresUnitOfWork with the given connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    type Session = PostgresUnitOfWorkSession;

    async fn begin(&self) -> TransactionResult<Self::Session> {
        let tx = self.pool.begin().await?;
        Ok(PostgresUnitOfWorkSession::new(tx))
    }
}

/// Default implementation of UnitOfWorkSession for PostgreSQL.
///
/// Owns the session's commit hooks; deferred calls join the session itself.
pub struct PostgresUnitOfWorkSession {
    executor: Executor,
    hooks: HookRegistry,
    observers: Arc<RwLock<Vec<Arc<dyn TransactionAware>>>>,
}

impl PostgresUnitOfWorkSession {
    /// Create a new session from a PostgreSQL transaction.
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            executor: Executor::new(tx),
            hooks: HookRegistry::new(),
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Notify observers that the transaction was rolled back.
    async fn notify_rollback(&self) -> TransactionResult<()> {
        let observers = self.observers.read().clone();
        for observer in observers.iter() {
            observer.on_rollback().await?;
        }
        Ok(())
    }
}

impl CommitHooks for PostgresUnitOfWorkSession {
    fn add_before_commit_hook(&self, hook: BeforeCommitHook) {
        self.hooks.add_before_commit_hook(hook);
    }

    fn add_after_commit_hook(&self, hook: AfterCommitHook) {
        self.hooks.add_after_commit_hook(hook);
    }
}

#[async_trait]
impl UnitOfWorkSession for PostgresUnitOfWorkSession {
    fn executor(&self) -> &Executor {
        &self.executor
    }

    fn register_transaction_aware(&self, observer: Arc<dyn TransactionAware>) {
        self.observers.write().push(observer);
    }

    async fn commit(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;

        // A failing before-commit hook aborts the commit.
        if let Err(err) = self.hooks.run_before_commit() {
            tracing::debug!(error = %err, "before-commit hook failed, rolling back");
            let rolled_back = tx.rollback().await;
            let _ = self.hooks.run_after_commit(CommitOutcome::Failed);
            rolled_back.map_err(|e| TransactionError::RollbackFailed(e.to_string()))?;
            self.notify_rollback().await?;
            return Err(err);
        }

        if let Err(err) = tx.commit().await {
            tracing::debug!(error = %err, "database commit failed");
            let _ = self.hooks.run_after_commit(CommitOutcome::Failed);
            return Err(TransactionError::CommitFailed(err.to_string()));
        }

        self.hooks.run_after_commit(CommitOutcome::Committed)?;

        // Notify observers after successful commit
        let observers = self.observers.read().clone();
        for observer in observers.iter() {
            observer.on_commit().await?;
        }
        Ok(())
    }

    async fn rollback(self) -> TransactionResult<()> {
        let tx = self.executor.take_transaction().await?;

        self.hooks.discard_before_commit();
        let rolled_back = tx.rollback().await;
        let _ = self.hooks.run_after_commit(CommitOutcome::Failed);
        rolled_back.map_err(|e| TransactionError::RollbackFailed(e.to_string()))?;

        self.notify_rollback().await
    }
}
