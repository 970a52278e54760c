//! The result-carrier queue item and explicit shutdown sentinel used on
//! every inter-thread channel, per spec section 5 and section 9's
//! "exceptions across thread boundaries" design note.

use crate::errors::PipelineError;

/// One slot on an inter-thread channel: either a decoded/processed value,
/// a propagated error, or the terminal sentinel. A worker that receives
/// `Shutdown` drains nothing further and exits; one `Shutdown` is sent per
/// consumer thread so every worker observes exactly one.
pub enum QueueItem<T> {
    Item(Result<T, PipelineError>),
    Shutdown,
}

impl<T> QueueItem<T> {
    pub fn ok(value: T) -> QueueItem<T> {
        QueueItem::Item(Ok(value))
    }

    pub fn err(error: impl Into<PipelineError>) -> QueueItem<T> {
        QueueItem::Item(Err(error.into()))
    }
}
