//! Typed error kinds per the project's error-handling design.
//!
//! `InputError` and `GeometryError` are recovered at the enclosing
//! primitive and folded into `stats::Counters`; `ResourceError` and
//! `ProgrammerError` unwind the pipeline.

use thiserror::Error;

/// Errors deriving deterministically from the shape of the input stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("id {0} exceeds the maximum representable node id (2^42)")]
    IdTooLarge(i64),

    #[error("location for referenced id {0} is undefined")]
    InvalidLocation(i64),

    #[error("id {0} appeared out of order (previous max was {1})")]
    OutOfOrder(i64, i64),

    #[error("id {0} appeared twice within its primitive kind")]
    DuplicateId(i64),
}

/// Errors that are fatal to the whole run.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("node cache capacity exceeded (non-lossy mode)")]
    CapacityExceeded,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Db(String),
}

/// Errors local to a single way/relation assembly run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("ring did not close")]
    OpenRing,

    #[error("segments self-intersect")]
    SelfIntersection,

    #[error("duplicate segment collapsed")]
    DuplicateSegment,

    #[error("computed winding contradicts supplied role")]
    OrientationMismatch,

    #[error("coordinate overflowed while encoding geometry ({0} points)")]
    TooManyPoints(usize),
}

/// Precondition violations: programmer error, should abort immediately.
#[derive(Debug, Error)]
pub enum ProgrammerError {
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
}

/// Top-level error type threaded through the pipeline's result carriers.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Programmer(#[from] ProgrammerError),
}
