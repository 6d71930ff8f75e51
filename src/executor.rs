use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{TransactionError, TransactionResult};

/// Shared handle on the live database transaction of a session.
///
/// Repositories clone the executor and lock it around each query. Once the
/// session commits or rolls back the slot is empty and every further use
/// fails with [`TransactionError::Inactive`].
#[derive(Clone, Debug)]
pub struct Executor {
    pub tx: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

impl Executor {
    pub fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Whether the transaction has not yet been committed or rolled back.
    pub async fn is_active(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    pub(crate) async fn take_transaction(&self) -> TransactionResult<Transaction<'static, Postgres>> {
        self.tx.lock().await.take().ok_or(TransactionError::Inactive)
    }
}
