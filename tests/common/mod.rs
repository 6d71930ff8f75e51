pub mod recorder;
pub mod repositories;

pub use recorder::{init_tracing, Call, Recorder};
pub use repositories::AuditRepository;
