use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// One recorded invocation: the positional argument, an optional keyword
/// argument and the thread it ran on.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub arg: String,
    pub y: Option<i64>,
    pub thread: ThreadId,
}

/// Records every call made through it.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, arg: impl Into<String>, y: Option<i64>) {
        self.calls.lock().push(Call {
            arg: arg.into(),
            y,
            thread: thread::current().id(),
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
