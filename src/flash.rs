//! Flash messages that only appear if the request's work commits.

use std::sync::Arc;

use crate::dispatcher::{join_to_transaction, DeferredCall};
use crate::hooks::CommitHooks;
use crate::TransactionResult;

/// Session-side flash message queue.
pub trait FlashSink: Send + Sync + 'static {
    /// Queue `message` on `queue`, or on the default queue when `None`.
    fn flash(&self, message: String, queue: Option<String>) -> TransactionResult<()>;
}

/// Flash helper whose messages are joined to the unit of work.
pub struct JoinedFlash<S: FlashSink> {
    sink: Arc<S>,
}

impl<S: FlashSink> JoinedFlash<S> {
    /// Wrap the session's flash queue.
    pub fn new(sink: Arc<S>) -> Self {
        Self { sink }
    }

    /// Flash `message` onto `queue` after `tx` commits successfully.
    pub fn flash<T>(&self, tx: &T, message: impl Into<String>, queue: Option<&str>)
    where
        T: CommitHooks + ?Sized,
    {
        let sink = Arc::clone(&self.sink);
        let args = (message.into(), queue.map(str::to_string));
        let flash = move |(message, queue): (String, Option<String>)| sink.flash(message, queue);
        join_to_transaction(tx, DeferredCall::with_args(flash, args).labelled("flash"));
    }
}
