//! Output rows and the `RowSink` sink abstraction.

pub mod copy_text;
#[cfg(feature = "postgres-sink")]
pub mod postgres_sink;

use thiserror::Error;

use crate::tags::TagList;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(String),
}

/// One output record: spec section 6's `(id, tags, geometry, srid)` row.
/// `geometry` is already hex-encoded ASCII EWKB (`GeometryFactory` with
/// `OutputEncoding::Hex`) — PostgreSQL's COPY text format can't carry
/// arbitrary binary, so the hex form is what every `RowSink` expects.
pub struct OutputRow {
    pub id: i64,
    pub tags: TagList,
    pub geometry_hex: Vec<u8>,
    pub srid: i32,
}

/// Consumes classified, geometry-bearing primitives and persists them.
/// Rows carry no ordering constraint (spec section 5): a `RowSink` may be
/// handed rows from any worker in any order.
pub trait RowSink {
    fn write_row(&mut self, row: &OutputRow) -> Result<(), WriterError>;
    fn finish(&mut self) -> Result<(), WriterError>;
}

pub use copy_text::CopyTextWriter;
