//! OSM primitive decoding: a source-agnostic `Primitive` stream, with a
//! concrete XML adapter.

pub mod decoder;
pub mod primitive;
pub mod xml;

pub use decoder::{DecodeError, PrimitiveSource};
pub use primitive::{Member, MemberKind, Node, Primitive, Relation, Way};
pub use xml::XmlSource;
