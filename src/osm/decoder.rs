//! The decoder-side contract: anything that can hand primitives to the
//! pipeline one at a time, in file order (nodes, then ways, then
//! relations — the order spec section 3 assumes for streaming ID checks).

use thiserror::Error;

use super::primitive::Primitive;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed input: {0}")]
    Malformed(String),

    #[error("missing required attribute `{attr}` on <{element}>")]
    MissingAttribute { element: &'static str, attr: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A pull-based source of OSM primitives. `next()` returns `Ok(None)` once
/// the input is exhausted.
pub trait PrimitiveSource {
    fn next(&mut self) -> Result<Option<Primitive>, DecodeError>;
}
