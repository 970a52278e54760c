//! Concurrency scaffolding: a sequential decoder producer and a parallel
//! writer pool, connected by bounded channels carrying `QueueItem`s, with
//! ordering across decoder batches restored by `ReorderBuffer` wherever a
//! later stage actually needs file order (only the order-checking and
//! node/way store population do; row writing does not).

pub mod decoder_pool;
pub mod queue;
pub mod reorder;
pub mod writer_pool;

pub use decoder_pool::{spawn_decoder, Batch};
pub use queue::QueueItem;
pub use reorder::ReorderBuffer;
pub use writer_pool::{shared_sink, spawn_worker_pool};
