use std::{
    collections::{
        BTreeMap,
        HashMap,
        btree_map::Entry,
    },
    fmt,
    sync::Arc,
};

use thiserror::Error;
use tracing::{
    debug,
    info,
    warn,
};

use crate::{
    metrics::{
        CollisionSource,
        LookupOutcome,
        RingMetrics,
        TopologyChange,
    },
    node::Node,
    position::{
        Position,
        PositionHasher,
        Sha256Position,
    },
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("No nodes in the ring")]
    EmptyRing,

    #[error("Hash collision at position {position} with node {existing}")]
    HashCollision { position: Position, existing: Arc<str> },
}

/// A consistent hash ring with a memoized key assignment cache.
///
/// Every node occupies exactly one position. A key belongs to the first node
/// at or after the key's position, wrapping around to the node with the
/// smallest position. Lookups are cached by key position, and the cache is
/// recomputed after every topology change so that cached answers always
/// agree with the current membership.
pub struct ConsistentHashRing<H = Sha256Position> {
    /// Members keyed by position, which keeps them in ring order.
    ring: BTreeMap<Position, Arc<Node>>,

    /// Owner of every key position looked up so far.
    assignments: HashMap<Position, Arc<Node>>,

    hasher: H,
    metrics: RingMetrics,
}

impl ConsistentHashRing {
    /// Create an empty ring using the default SHA-256 hasher.
    pub fn new() -> Self {
        Self::empty_with_hasher(Sha256Position::default())
    }

    /// Create a ring from `nodes` using the default SHA-256 hasher.
    pub fn build<I>(nodes: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = Node>,
    {
        Self::with_hasher(Sha256Position::default(), nodes)
    }
}

impl Default for ConsistentHashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> ConsistentHashRing<H>
where
    H: PositionHasher,
{
    pub fn empty_with_hasher(hasher: H) -> Self {
        ConsistentHashRing {
            ring: BTreeMap::new(),
            assignments: HashMap::new(),
            hasher,
            metrics: RingMetrics::new(),
        }
    }

    /// Create a ring from `nodes`. Fails if two nodes share a position.
    pub fn with_hasher<I>(hasher: H, nodes: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = Node>,
    {
        let mut ring = Self::empty_with_hasher(hasher);
        for node in nodes {
            match ring.ring.entry(node.position()) {
                Entry::Occupied(existing) => {
                    warn!(
                        node = %node,
                        existing = %existing.get(),
                        position = node.position(),
                        "Rejected ring: hash collision"
                    );
                    ring.metrics.record_collision(CollisionSource::Build);
                    return Err(RingError::HashCollision {
                        position: node.position(),
                        existing: existing.get().shared_identifier(),
                    });
                },
                Entry::Vacant(slot) => {
                    slot.insert(Arc::new(node));
                },
            }
        }

        debug!(nodes = ring.ring.len(), "Built consistent hash ring");
        Ok(ring)
    }

    /// Create a node positioned with this ring's hasher.
    pub fn node(&self, identifier: impl Into<Arc<str>>) -> Node {
        Node::with_hasher(identifier, &self.hasher)
    }

    /// Add a node to the ring and reassign cached keys.
    ///
    /// Fails without modifying the ring if another member already occupies
    /// the node's position.
    pub fn add_node(&mut self, node: Node) -> Result<Arc<Node>, RingError> {
        let position = node.position();
        if let Some(existing) = self.ring.get(&position) {
            warn!(node = %node, existing = %existing, position, "Rejected node: hash collision");
            self.metrics.record_collision(CollisionSource::Add);
            return Err(RingError::HashCollision {
                position,
                existing: existing.shared_identifier(),
            });
        }

        let node = Arc::new(node);
        self.ring.insert(position, node.clone());
        self.metrics.record_topology_change(TopologyChange::Add);
        info!(node = %node, position, members = self.ring.len(), "Added node to ring");

        self.repair_assignments();
        Ok(node)
    }

    /// Remove the member at `node`'s position and reassign cached keys.
    ///
    /// Returns the removed member, or `None` if the position was vacant.
    /// Removing the last member clears the cache.
    pub fn remove_node(&mut self, node: &Node) -> Option<Arc<Node>> {
        let removed = self.ring.remove(&node.position())?;
        self.metrics.record_topology_change(TopologyChange::Remove);
        info!(node = %removed, position = removed.position(), members = self.ring.len(), "Removed node from ring");

        if self.ring.is_empty() {
            debug!(cached = self.assignments.len(), "Ring is empty, dropping cached assignments");
            self.assignments.clear();
            return Some(removed);
        }

        self.repair_assignments();
        Some(removed)
    }

    /// Get the node responsible for `key`, caching the answer.
    pub fn get_node(&mut self, key: &str) -> Result<Arc<Node>, RingError> {
        let position = self.hasher.position(key);
        if let Some(node) = self.assignments.get(&position) {
            self.metrics.record_lookup(LookupOutcome::Hit);
            return Ok(node.clone());
        }

        if self.ring.is_empty() {
            self.metrics.record_lookup(LookupOutcome::Error);
            return Err(RingError::EmptyRing);
        }

        if let Some(existing) = self.ring.get(&position) {
            warn!(key, existing = %existing, position, "Key hash collides with a node");
            self.metrics.record_lookup(LookupOutcome::Error);
            self.metrics.record_collision(CollisionSource::Lookup);
            return Err(RingError::HashCollision {
                position,
                existing: existing.shared_identifier(),
            });
        }

        let node = self.successor(position)?;
        self.assignments.insert(position, node.clone());
        self.metrics.record_lookup(LookupOutcome::Miss);
        debug!(key, position, node = %node, "Assigned key");
        Ok(node)
    }

    /// First member at or after `position`, wrapping around to the member
    /// with the smallest position.
    pub fn successor(&self, position: Position) -> Result<Arc<Node>, RingError> {
        successor_in(&self.ring, position)
            .cloned()
            .ok_or(RingError::EmptyRing)
    }

    /// Cached owner of `key`, without populating the cache.
    pub fn cached_node(&self, key: &str) -> Option<&Arc<Node>> {
        self.assignments.get(&self.hasher.position(key))
    }

    /// Cached `(key position, owner)` pairs, in no particular order.
    pub fn cached_assignments(&self) -> impl Iterator<Item = (Position, &Arc<Node>)> {
        self.assignments.iter().map(|(position, node)| (*position, node))
    }

    pub fn cached_len(&self) -> usize {
        self.assignments.len()
    }

    /// Members in ascending position order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<Node>> {
        self.ring.values()
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.ring
            .get(&node.position())
            .is_some_and(|member| member.as_ref() == node)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    fn repair_assignments(&mut self) {
        let mut moved = 0usize;
        for (position, owner) in self.assignments.iter_mut() {
            let Some(successor) = successor_in(&self.ring, *position) else {
                continue;
            };
            if !Arc::ptr_eq(owner, successor) {
                *owner = successor.clone();
                moved += 1;
            }
        }

        self.metrics.record_repair();
        debug!(cached = self.assignments.len(), moved, "Repaired cached assignments");
    }
}

impl<H> fmt::Debug for ConsistentHashRing<H>
where
    H: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistentHashRing")
            .field("nodes", &self.ring.values().collect::<Vec<_>>())
            .field("cached", &self.assignments.len())
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}

fn successor_in(ring: &BTreeMap<Position, Arc<Node>>, position: Position) -> Option<&Arc<Node>> {
    ring.range(position..)
        .next()
        .or_else(|| ring.iter().next())
        .map(|(_, node)| node)
}
