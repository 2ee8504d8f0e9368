//! Demo scenario.
//!
//! Builds a small ring, writes a handful of keys through different
//! nodes, reads them back from everywhere, then demonstrates a join and
//! a leave while reporting what every node knows.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_channel::Receiver;
use ringlet_core::dht::Did;
use ringlet_core::directory::Directory;
use ringlet_core::inspect::NodeInspect;
use ringlet_core::node::ClientEvent;
use ringlet_core::node::Node;
use ringlet_core::node::NodeHandle;

const SAMPLE_PAIRS: [(&str, &str); 4] = [
    ("Banana", "0"),
    ("Turnip", "1"),
    ("Chinchilla", "2"),
    ("Komquat", "3"),
];

/// A spawned node as the driver sees it.
pub struct DemoNode {
    handle: NodeHandle,
    events: Receiver<ClientEvent>,
}

impl DemoNode {
    fn did(&self) -> Did {
        self.handle.did()
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        self.handle.get(key).await?;
        let event = self
            .events
            .recv()
            .await
            .context("node stopped before answering")?;
        let ClientEvent::Get { value, .. } = event;
        Ok(value)
    }

    async fn inspect(&self) -> anyhow::Result<NodeInspect> {
        Ok(self.handle.inspect().await?)
    }
}

async fn spawn(
    directory: &Arc<Directory>,
    did: Option<u8>,
    poll_interval: Duration,
) -> anyhow::Result<DemoNode> {
    let (events_tx, events) = async_channel::unbounded();
    let (node, handle) = Node::create(directory.clone(), did.map(Did::from))?;
    let node = node.with_events(events_tx).with_poll_interval(poll_interval);
    tokio::spawn(node.run());
    // Inspect only answers once the node finished joining.
    handle.inspect().await?;
    Ok(DemoNode { handle, events })
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

fn print_report(info: &NodeInspect, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }
    println!("node {}", info.did);
    println!(
        "  predecessor: {:>3}   successor: {:>3}",
        info.predecessor, info.successor
    );
    println!("  fingers:");
    for finger in &info.fingers {
        println!("    start {:>3} -> node {:>3}", finger.start, finger.owner);
    }
    if info.store.is_empty() {
        println!("  store: (empty)");
    } else {
        println!("  store:");
        for entry in &info.store {
            println!("    key {:>3} = {}", entry.key, entry.value);
        }
    }
    Ok(())
}

async fn print_all_reports(nodes: &[&DemoNode], json: bool) -> anyhow::Result<()> {
    for node in nodes {
        print_report(&node.inspect().await?, json)?;
    }
    Ok(())
}

async fn read_all(through: &DemoNode) -> anyhow::Result<()> {
    for (key, _) in SAMPLE_PAIRS {
        let value = through.get(key).await?;
        match value {
            Some(v) => println!("GET {key} via node {} -> {v}", through.did()),
            None => println!("GET {key} via node {} -> (no value)", through.did()),
        }
    }
    Ok(())
}

/// Run the full demo: build, populate, read, join, leave.
pub async fn run_demo(
    node_ids: Vec<u8>,
    poll_interval_ms: u64,
    json: bool,
) -> anyhow::Result<()> {
    anyhow::ensure!(!node_ids.is_empty(), "need at least one node");
    let poll_interval = Duration::from_millis(poll_interval_ms);
    let directory = Arc::new(Directory::new());

    println!("== building a ring of {} nodes ==", node_ids.len());
    let mut nodes = Vec::with_capacity(node_ids.len());
    for &id in &node_ids {
        nodes.push(spawn(&directory, Some(id), poll_interval).await?);
    }
    settle().await;

    println!("== writing sample pairs ==");
    for (i, (key, value)) in SAMPLE_PAIRS.iter().enumerate() {
        let through = &nodes[i % nodes.len()];
        through.handle.set(*key, *value).await?;
        println!("SET {key} = {value} via node {}", through.did());
    }
    settle().await;

    println!("== reading every key through node {} ==", nodes[0].did());
    read_all(&nodes[0]).await?;

    println!("== ring reports ==");
    print_all_reports(&nodes.iter().collect::<Vec<_>>(), json).await?;

    println!("== a newcomer joins ==");
    let newcomer = spawn(&directory, None, poll_interval).await?;
    println!("node {} joined", newcomer.did());
    settle().await;
    read_all(&newcomer).await?;

    if nodes.len() > 1 {
        println!("== node {} leaves ==", nodes[1].did());
        nodes[1].handle.leave().await?;
        settle().await;
        nodes.remove(1);
        read_all(&nodes[0]).await?;
    }

    println!("== final reports ==");
    let mut survivors: Vec<&DemoNode> = nodes.iter().collect();
    survivors.push(&newcomer);
    print_all_reports(&survivors, json).await?;

    Ok(())
}
