use async_trait::async_trait;
use parking_lot::RwLock;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

use commit_deferred::{Executor, TransactionAware, TransactionError, TransactionResult};

/// Transaction-aware repository over the `audit_log` table
pub struct AuditRepository {
    executor: Executor,
    // Track lifecycle notifications for verification in tests
    committed: Arc<RwLock<bool>>,
    rolled_back: Arc<RwLock<bool>>,
}

impl AuditRepository {
    pub fn new(executor: Executor) -> Arc<Self> {
        Arc::new(Self {
            executor,
            committed: Arc::new(RwLock::new(false)),
            rolled_back: Arc::new(RwLock::new(false)),
        })
    }

    pub async fn record(&self, message: &str) -> TransactionResult<Uuid> {
        let id = Uuid::new_v4();
        let mut tx_guard = self.executor.tx.lock().await;
        let tx = tx_guard.as_mut().ok_or(TransactionError::Inactive)?;
        sqlx::query("INSERT INTO audit_log (id, message) VALUES ($1, $2)")
            .bind(id)
            .bind(message)
            .execute(&mut **tx)
            .await?;
        Ok(id)
    }

    /// Insert into `audit_keys`, whose unique constraint is only checked at commit.
    pub async fn claim_key(&self, key: &str) -> TransactionResult<()> {
        let mut tx_guard = self.executor.tx.lock().await;
        let tx = tx_guard.as_mut().ok_or(TransactionError::Inactive)?;
        sqlx::query("INSERT INTO audit_keys (key) VALUES ($1)")
            .bind(key)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn exists(&self, id: Uuid) -> TransactionResult<bool> {
        let mut tx_guard = self.executor.tx.lock().await;
        let tx = tx_guard.as_mut().ok_or(TransactionError::Inactive)?;
        let row = sqlx::query("SELECT COUNT(*) AS count FROM audit_log WHERE id = $1")
            .bind(id)
            .fetch_one(&mut **tx)
            .await?;
        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    pub fn is_committed(&self) -> bool {
        *self.committed.read()
    }

    pub fn is_rolled_back(&self) -> bool {
        *self.rolled_back.read()
    }
}

#[async_trait]
impl TransactionAware for AuditRepository {
    async fn on_commit(&self) -> TransactionResult<()> {
        *self.committed.write() = true;
        Ok(())
    }

    async fn on_rollback(&self) -> TransactionResult<()> {
        *self.rolled_back.write() = true;
        Ok(())
    }
}
