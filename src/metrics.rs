use opentelemetry::{
    KeyValue,
    global,
    metrics::Counter,
};

const METER_NAME: &str = "ringcache";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LookupOutcome {
    Hit,
    Miss,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollisionSource {
    Build,
    Add,
    Lookup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TopologyChange {
    Add,
    Remove,
}

/// Counters reported by a ring. They go to whatever meter provider is
/// installed globally, which is a no-op unless the binary configured OTLP.
#[derive(Clone)]
pub(crate) struct RingMetrics {
    lookups: Counter<u64>,
    collisions: Counter<u64>,
    repairs: Counter<u64>,
    topology_changes: Counter<u64>,
}

impl RingMetrics {
    pub(crate) fn new() -> Self {
        let meter = global::meter(METER_NAME);
        Self {
            lookups: meter.u64_counter("ringcache_lookups_total").build(),
            collisions: meter.u64_counter("ringcache_collisions_total").build(),
            repairs: meter.u64_counter("ringcache_cache_repairs_total").build(),
            topology_changes: meter.u64_counter("ringcache_topology_changes_total").build(),
        }
    }

    pub(crate) fn record_lookup(&self, outcome: LookupOutcome) {
        let result = match outcome {
            LookupOutcome::Hit => "hit",
            LookupOutcome::Miss => "miss",
            LookupOutcome::Error => "error",
        };
        self.lookups.add(1, &[KeyValue::new("result", result)]);
    }

    pub(crate) fn record_collision(&self, source: CollisionSource) {
        let source = match source {
            CollisionSource::Build => "build",
            CollisionSource::Add => "add",
            CollisionSource::Lookup => "lookup",
        };
        self.collisions.add(1, &[KeyValue::new("source", source)]);
    }

    pub(crate) fn record_topology_change(&self, change: TopologyChange) {
        let op = match change {
            TopologyChange::Add => "add",
            TopologyChange::Remove => "remove",
        };
        self.topology_changes.add(1, &[KeyValue::new("op", op)]);
    }

    pub(crate) fn record_repair(&self) {
        self.repairs.add(1, &[]);
    }
}
