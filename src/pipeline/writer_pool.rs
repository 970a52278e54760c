//! The writer side of the pipeline: several threads draining one shared
//! queue, with no ordering guarantee among them (spec section 5: rows
//! carry no sequencing requirement once geometry has been assembled).
//!
//! Unlike the decoder, this is genuinely parallel — `crossbeam_channel`'s
//! `Receiver` is itself a multi-consumer handle, so cloning it across N
//! threads is all that's needed to fan work out.

use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;

use crate::errors::PipelineError;

use super::queue::QueueItem;

/// Spawns `worker_count` threads, each draining `receiver` until it sees
/// `Shutdown` or the channel disconnects, applying `handle` to every item.
/// The first error any worker hits is what that worker's `JoinHandle`
/// resolves to; workers do not stop each other early, since a shared
/// `RowSink` may still need the remaining in-flight rows flushed.
pub fn spawn_worker_pool<T, F>(
    receiver: Receiver<QueueItem<T>>,
    worker_count: usize,
    handle: F,
) -> Vec<JoinHandle<Result<(), PipelineError>>>
where
    T: Send + 'static,
    F: Fn(T) -> Result<(), PipelineError> + Send + Sync + 'static,
{
    let handle = Arc::new(handle);
    (0..worker_count)
        .map(|_| {
            let receiver = receiver.clone();
            let handle = Arc::clone(&handle);
            thread::spawn(move || -> Result<(), PipelineError> {
                let mut first_error = None;
                loop {
                    match receiver.recv() {
                        Ok(QueueItem::Shutdown) => break,
                        Ok(QueueItem::Item(Ok(value))) => {
                            if let Err(e) = handle(value) {
                                if first_error.is_none() {
                                    first_error = Some(e);
                                }
                            }
                        }
                        Ok(QueueItem::Item(Err(e))) => {
                            if first_error.is_none() {
                                first_error = Some(e);
                            }
                        }
                        Err(_) => break,
                    }
                }
                match first_error {
                    Some(e) => Err(e),
                    None => Ok(()),
                }
            })
        })
        .collect()
}

/// Runs a `RowSink` behind a mutex so any number of worker threads can
/// share it; `finish` must be called once after every worker has joined.
pub fn shared_sink<S>(sink: S) -> Arc<Mutex<S>> {
    Arc::new(Mutex::new(sink))
}
