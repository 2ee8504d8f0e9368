use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;

use crate::dht::Did;
use crate::directory::Directory;
use crate::inspect::NodeInspect;
use crate::node::ClientEvent;
use crate::node::Node;
use crate::node::NodeHandle;

mod test_membership;

#[allow(dead_code)]
pub fn setup_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

pub struct TestNode {
    pub handle: NodeHandle,
    pub events: Receiver<ClientEvent>,
}

/// Spawn a node and wait until it has joined the ring.
pub async fn spawn_node(directory: &Arc<Directory>, did: u8) -> TestNode {
    let node = start_node(directory, did);
    node.handle.inspect().await.expect("node failed to join");
    node
}

/// Spawn a node without waiting for its join to complete.
pub fn start_node(directory: &Arc<Directory>, did: u8) -> TestNode {
    let (events_tx, events) = async_channel::unbounded();
    let (node, handle) =
        Node::create(directory.clone(), Some(Did::from(did))).expect("free identifier");
    let node = node.with_events(events_tx);
    tokio::spawn(async move {
        if let Err(e) = node.run().await {
            eprintln!("node terminated: {e}");
        }
    });
    TestNode { handle, events }
}

/// Spawn a ring of nodes one by one, waiting for each join.
pub async fn spawn_ring(directory: &Arc<Directory>, dids: &[u8]) -> Vec<TestNode> {
    let mut nodes = Vec::with_capacity(dids.len());
    for &did in dids {
        nodes.push(spawn_node(directory, did).await);
    }
    settle().await;
    nodes
}

/// Let in-flight messages drain.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(300)).await;
}

impl TestNode {
    pub fn did(&self) -> Did {
        self.handle.did()
    }

    pub async fn inspect(&self) -> NodeInspect {
        self.handle.inspect().await.expect("inspect")
    }

    /// Read a key through this node and wait for the reported value.
    pub async fn get(&self, key: &str) -> Option<String> {
        self.handle.get(key).await.expect("get dispatched");
        let event = tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("get timed out")
            .expect("event channel closed");
        let ClientEvent::Get { key: reported, value } = event;
        assert_eq!(reported, key);
        value
    }

    pub async fn set(&self, key: &str, value: &str) {
        self.handle.set(key, value).await.expect("set dispatched");
    }
}

/// Assert that every stored key of every node lies in that node's owned
/// interval.
pub async fn assert_ownership_invariant(nodes: &[TestNode]) {
    for node in nodes {
        let info = node.inspect().await;
        for entry in &info.store {
            assert!(
                entry.key.between(info.predecessor.next(), info.did),
                "key {} stored on {} outside its interval ({}, {}]",
                entry.key,
                info.did,
                info.predecessor,
                info.did,
            );
        }
    }
}

/// Assert that successor and predecessor pointers of the given nodes are
/// mutually consistent and close into a single ring.
pub async fn assert_ring_closure(nodes: &[TestNode]) {
    let mut by_did = std::collections::HashMap::new();
    for node in nodes {
        by_did.insert(node.did(), node.inspect().await);
    }
    for info in by_did.values() {
        let successor = &by_did[&info.successor];
        assert_eq!(
            successor.predecessor, info.did,
            "{} -> {} not mutual",
            info.did, info.successor
        );
        let predecessor = &by_did[&info.predecessor];
        assert_eq!(
            predecessor.successor, info.did,
            "{} <- {} not mutual",
            info.did, info.predecessor
        );
    }
    // Following successors N times returns to the start.
    let start = nodes[0].did();
    let mut current = start;
    for _ in 0..nodes.len() {
        current = by_did[&current].successor;
    }
    assert_eq!(current, start, "successor chain does not close");
}
