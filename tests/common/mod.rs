use std::collections::HashMap;

use ringcache::{
    Position,
    PositionHasher,
};

/// Hasher that places known identifiers at fixed positions.
#[derive(Debug, Clone)]
pub struct Pinned(HashMap<String, Position>);

impl Pinned {
    pub fn new(entries: impl IntoIterator<Item = (&'static str, Position)>) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(key, position)| (key.to_string(), position))
                .collect(),
        )
    }
}

impl PositionHasher for Pinned {
    fn position(&self, key: &str) -> Position {
        match self.0.get(key) {
            Some(position) => *position,
            None => panic!("no pinned position for {key:?}"),
        }
    }
}

/// Linear clockwise walk over ascending `positions`, used to check the ring
/// against an independent computation.
pub fn reference_successor(positions: &[Position], position: Position) -> Option<Position> {
    positions
        .iter()
        .copied()
        .find(|candidate| *candidate >= position)
        .or_else(|| positions.first().copied())
}
