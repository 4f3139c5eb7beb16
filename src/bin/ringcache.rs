use std::collections::BTreeMap;

use anyhow::{
    Context,
    Result,
};
use clap::Parser;
use ringcache::{
    ConsistentHashRing,
    Node,
    PositionHasher,
    config::{
        OtelConfig,
        RingConfig,
        SentryConfig,
    },
    observability,
};
use tracing::{
    info,
    warn,
};

#[derive(Debug, Parser, Clone)]
#[command(name = "ringcache", about = "Assign keys to nodes on a consistent hash ring.")]
struct Config {
    /// Initial ring members.
    #[arg(long = "node", env = "RINGCACHE_NODES", value_delimiter = ',', required = true)]
    nodes: Vec<String>,

    /// Keys to resolve against the initial ring.
    #[arg(long = "key", env = "RINGCACHE_KEYS", value_delimiter = ',')]
    keys: Vec<String>,

    /// Members to remove after the initial lookups.
    #[arg(long = "remove", value_delimiter = ',')]
    remove: Vec<String>,

    /// Members to add after removals.
    #[arg(long = "add", value_delimiter = ',')]
    add: Vec<String>,

    #[clap(flatten)]
    ring: RingConfig,

    #[clap(flatten)]
    sentry: SentryConfig,

    #[clap(flatten)]
    otel: OtelConfig,
}

type Owners = BTreeMap<String, Option<String>>;

fn main() -> Result<()> {
    let config = Config::parse();
    let version = env!("CARGO_PKG_VERSION");
    let _sentry = observability::init_tracing_and_sentry(config.sentry.clone());

    let meter_provider = observability::init_otel_metrics(config.otel.clone())
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to initialize OpenTelemetry metrics")?;

    info!(config = ?config, version = version, "Starting ringcache");

    let hasher = config.ring.hasher();
    let nodes: Vec<Node> = config
        .nodes
        .iter()
        .map(|id| Node::with_hasher(id.as_str(), &hasher))
        .collect();
    let mut ring = ConsistentHashRing::with_hasher(hasher, nodes).context("Failed to build ring")?;

    for node in ring.nodes() {
        println!("node {node} @ {}", node.position());
    }

    for key in &config.keys {
        let position = ring.hasher().position(key);
        match ring.get_node(key) {
            Ok(node) => println!("{key} ({position}) -> {node}"),
            Err(e) => println!("{key} ({position}) -> error: {e}"),
        }
    }

    for id in &config.remove {
        let before = owners(&ring, &config.keys);
        let node = ring.node(id.as_str());
        match ring.remove_node(&node) {
            Some(removed) => println!("removed {removed}"),
            None => {
                warn!(node = %id, "Node is not a ring member");
                continue;
            },
        }
        print_moves(&before, &owners(&ring, &config.keys));
    }

    for id in &config.add {
        let before = owners(&ring, &config.keys);
        let node = ring.node(id.as_str());
        match ring.add_node(node) {
            Ok(added) => println!("added {added} @ {}", added.position()),
            Err(e) => {
                println!("add {id}: {e}");
                continue;
            },
        }
        print_moves(&before, &owners(&ring, &config.keys));
    }

    if let Some(provider) = meter_provider {
        provider
            .shutdown()
            .context("Failed to flush OpenTelemetry metrics")?;
    }

    info!("ringcache finished");
    Ok(())
}

fn owners<H: PositionHasher>(ring: &ConsistentHashRing<H>, keys: &[String]) -> Owners {
    keys.iter()
        .map(|key| {
            let owner = ring.cached_node(key).map(|node| node.identifier().to_string());
            (key.clone(), owner)
        })
        .collect()
}

/// Keys whose cached owner differs between two snapshots, with the old and
/// new owner.
fn moved_keys<'a>(before: &'a Owners, after: &'a Owners) -> Vec<(&'a str, Option<&'a str>, Option<&'a str>)> {
    before
        .iter()
        .filter_map(|(key, old)| {
            let new = after.get(key).and_then(|owner| owner.as_deref());
            (old.as_deref() != new).then_some((key.as_str(), old.as_deref(), new))
        })
        .collect()
}

fn print_moves(before: &Owners, after: &Owners) {
    for (key, old, new) in moved_keys(before, after) {
        println!("  {key}: {} -> {}", old.unwrap_or("-"), new.unwrap_or("-"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(entries: &[(&str, Option<&str>)]) -> Owners {
        entries
            .iter()
            .map(|(key, owner)| (key.to_string(), owner.map(str::to_string)))
            .collect()
    }

    #[test]
    fn test_moved_keys_reports_only_changes() {
        let before = snapshot(&[("k1", Some("a")), ("k2", Some("b")), ("k3", None)]);
        let after = snapshot(&[("k1", Some("a")), ("k2", Some("c")), ("k3", None)]);

        assert_eq!(moved_keys(&before, &after), vec![("k2", Some("b"), Some("c"))]);
    }

    #[test]
    fn test_moved_keys_when_cache_cleared() {
        let before = snapshot(&[("k1", Some("a")), ("k2", Some("b"))]);
        let after = snapshot(&[("k1", None), ("k2", None)]);

        assert_eq!(moved_keys(&before, &after), vec![
            ("k1", Some("a"), None),
            ("k2", Some("b"), None),
        ]);
    }

    #[test]
    fn test_moves_after_removing_a_node() {
        let keys: Vec<String> = (0..32).map(|i| format!("key-{i}")).collect();
        let mut ring = ConsistentHashRing::build(["a", "b", "c"].map(Node::new)).unwrap();
        for key in &keys {
            ring.get_node(key).unwrap();
        }

        let before = owners(&ring, &keys);
        ring.remove_node(&Node::new("b")).unwrap();
        let after = owners(&ring, &keys);

        let moved = moved_keys(&before, &after);
        let released = before.values().filter(|owner| owner.as_deref() == Some("b")).count();
        assert_eq!(moved.len(), released);
        for (_, old, new) in moved {
            assert_eq!(old, Some("b"));
            assert_ne!(new, Some("b"));
            assert!(new.is_some());
        }
    }
}
