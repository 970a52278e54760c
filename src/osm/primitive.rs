//! The three OSM primitive kinds, decoded from whichever wire format the
//! active `PrimitiveSource` reads.

use crate::location::{Identifier, Location};
use crate::tags::TagList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Node,
    Way,
    Relation,
}

#[derive(Debug, Clone)]
pub struct Member {
    pub kind: MemberKind,
    pub id: Identifier,
    pub role: String,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: Identifier,
    pub location: Location,
    pub tags: TagList,
}

#[derive(Debug, Clone)]
pub struct Way {
    pub id: Identifier,
    pub node_ids: Vec<Identifier>,
    pub tags: TagList,
}

#[derive(Debug, Clone)]
pub struct Relation {
    pub id: Identifier,
    pub members: Vec<Member>,
    pub tags: TagList,
}

#[derive(Debug, Clone)]
pub enum Primitive {
    Node(Node),
    Way(Way),
    Relation(Relation),
}
