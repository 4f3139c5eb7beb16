//! Consistent hashing of string keys onto a dynamic set of named nodes.
//!
//! Keys and node identifiers are hashed into the same bounded keyspace. A key
//! belongs to the first node at or after its position, wrapping around to the
//! node with the smallest position. Adding or removing a node only moves the
//! keys in the affected arc of the ring.

pub mod config;
mod consistent_hashring;
mod metrics;
pub mod node;
pub mod observability;
pub mod position;

pub use consistent_hashring::{
    ConsistentHashRing,
    RingError,
};
pub use node::Node;
pub use position::{
    Position,
    PositionHasher,
    SEARCH_SPACE,
    Sha256Position,
    hash_position,
};
