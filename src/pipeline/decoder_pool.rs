//! The decoder side of the pipeline: turns a `PrimitiveSource` into a
//! stream of sequence-numbered batches on a bounded channel.
//!
//! Spec section 5 describes a pool of decoder threads splitting
//! independent input blocks; that parallelism is genuinely available for
//! block-oriented formats (PBF blobs), but `.osm` XML has no safely
//! splittable block boundaries — a `quick_xml::Reader` owns a single
//! cursor over one byte stream. This decodes on one thread and still
//! threads every batch through the same bounded-channel/result-carrier/
//! sentinel machinery as the writer pool, so swapping in a real
//! block-parallel source (e.g. a PBF reader) later only means replacing
//! this function, not the architecture around it.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver};

use crate::osm::{PrimitiveSource, Primitive};

use super::queue::QueueItem;

pub struct Batch {
    pub seq: u64,
    pub primitives: Vec<Primitive>,
}

/// Spawns the decoder thread and returns the channel it feeds plus its
/// join handle. `worker_count` determines how many `Shutdown` sentinels
/// are sent once the source is exhausted — one per downstream consumer.
pub fn spawn_decoder<S>(
    mut source: S,
    batch_size: usize,
    channel_capacity: usize,
    worker_count: usize,
) -> (Receiver<QueueItem<Batch>>, JoinHandle<()>)
where
    S: PrimitiveSource + Send + 'static,
{
    let (sender, receiver) = bounded(channel_capacity);

    let handle = thread::spawn(move || {
        let mut seq = 0u64;
        let mut current = Vec::with_capacity(batch_size);

        loop {
            match source.next() {
                Ok(Some(primitive)) => {
                    current.push(primitive);
                    if current.len() >= batch_size {
                        let batch = Batch { seq, primitives: std::mem::take(&mut current) };
                        seq += 1;
                        if sender.send(QueueItem::ok(batch)).is_err() {
                            return;
                        }
                    }
                }
                Ok(None) => {
                    if !current.is_empty() {
                        let batch = Batch { seq, primitives: current };
                        let _ = sender.send(QueueItem::ok(batch));
                    }
                    break;
                }
                Err(e) => {
                    let _ = sender.send(QueueItem::err(
                        crate::errors::ResourceError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
                    ));
                    break;
                }
            }
        }

        for _ in 0..worker_count {
            let _ = sender.send(QueueItem::Shutdown);
        }
    });

    (receiver, handle)
}
