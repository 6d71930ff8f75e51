use async_trait::async_trait;

/// Error type for transaction-aware operations and deferred calls
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Unknown join mode: {0:?} (expected \"before\" or \"after\")")]
    UnknownJoinMode(String),

    #[error("Transaction commit failed: {0}")]
    CommitFailed(String),

    #[error("Transaction rollback failed: {0}")]
    RollbackFailed(String),

    #[error("Transaction is no longer active")]
    Inactive,

    #[error("Deferred call failed: {0}")]
    HookFailed(String),

    #[error("Failed to spawn background thread: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Result type for transaction-aware operations
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Trait for components that need to be notified of transaction lifecycle events.
///
/// Components implementing this trait can be registered with a UnitOfWorkSession
/// to receive callbacks once the transaction has been committed or rolled back.
/// Observers run after every after-commit hook of the session has fired.
#[async_trait]
pub trait TransactionAware: Send + Sync {
    /// Called after a successful transaction commit.
    async fn on_commit(&self) -> TransactionResult<()>;

    /// Called after a transaction rollback, including the rollback that
    /// follows a failing before-commit hook.
    async fn on_rollback(&self) -> TransactionResult<()>;
}
