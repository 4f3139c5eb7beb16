use std::{
    fmt,
    sync::Arc,
};

use crate::position::{
    Position,
    PositionHasher,
    Sha256Position,
};

/// A named member of the ring. The position is derived from the identifier
/// once and never changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    identifier: Arc<str>,
    position: Position,
}

impl Node {
    /// Create a node positioned with the default SHA-256 hasher.
    pub fn new(identifier: impl Into<Arc<str>>) -> Self {
        Self::with_hasher(identifier, &Sha256Position::default())
    }

    /// Create a node positioned with `hasher`. Nodes added to a ring should
    /// use the same hasher as the ring's keys.
    pub fn with_hasher<H>(identifier: impl Into<Arc<str>>, hasher: &H) -> Self
    where
        H: PositionHasher + ?Sized,
    {
        let identifier = identifier.into();
        let position = hasher.position(&identifier);
        Self { identifier, position }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub(crate) fn shared_identifier(&self) -> Arc<str> {
        self.identifier.clone()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}
