use std::sync::Arc;

use super::*;

#[tokio::test]
async fn test_ring_closes_after_sequential_joins() {
    let directory = Arc::new(Directory::new());
    let nodes = spawn_ring(&directory, &[0, 42, 100, 172]).await;

    assert_ring_closure(&nodes).await;
    assert_eq!(directory.all_ids().len(), 4);
}

#[tokio::test]
async fn test_join_preserves_data() {
    let directory = Arc::new(Directory::new());
    let first = spawn_node(&directory, 0).await;

    let keys: Vec<String> = (0..12).map(|i| format!("item-{i}")).collect();
    for (i, key) in keys.iter().enumerate() {
        first.set(key, &format!("v{i}")).await;
    }
    settle().await;

    // A newcomer takes over part of the interval; nothing may be lost.
    let second = spawn_node(&directory, 42).await;
    settle().await;

    for (i, key) in keys.iter().enumerate() {
        assert_eq!(
            first.get(key).await.as_deref(),
            Some(format!("v{i}").as_str()),
            "{key} lost after join",
        );
    }
    // Both partitions together hold every pair exactly once.
    let total = first.inspect().await.store.len() + second.inspect().await.store.len();
    assert_eq!(total, keys.len());
    assert_ownership_invariant(&[first, second]).await;
}

#[tokio::test]
async fn test_leave_preserves_data() {
    let directory = Arc::new(Directory::new());
    let nodes = spawn_ring(&directory, &[0, 42, 100, 172]).await;

    let keys: Vec<String> = (0..16).map(|i| format!("record-{i}")).collect();
    for (i, key) in keys.iter().enumerate() {
        nodes[i % nodes.len()].set(key, &format!("v{i}")).await;
    }
    settle().await;

    // Node 100 leaves; its partition must move to node 172.
    nodes[2].handle.leave().await.expect("leave dispatched");
    settle().await;
    assert!(!directory.contains(Did::from(100)));

    let survivors = [&nodes[0], &nodes[1], &nodes[3]];
    for (i, key) in keys.iter().enumerate() {
        for node in survivors {
            assert_eq!(
                node.get(key).await.as_deref(),
                Some(format!("v{i}").as_str()),
                "{} lost after leave, asked through {}",
                key,
                node.did(),
            );
        }
    }
}

#[tokio::test]
async fn test_leave_repairs_neighbor_pointers() {
    let directory = Arc::new(Directory::new());
    let nodes = spawn_ring(&directory, &[0, 42, 100, 172]).await;

    nodes[2].handle.leave().await.expect("leave dispatched");
    settle().await;

    let survivors: Vec<TestNode> = nodes
        .into_iter()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(_, n)| n)
        .collect();
    assert_ring_closure(&survivors).await;

    let info_42 = survivors[1].inspect().await;
    assert_eq!(info_42.successor, Did::from(172));
    let info_172 = survivors[2].inspect().await;
    assert_eq!(info_172.predecessor, Did::from(42));
}

#[tokio::test]
async fn test_two_node_ring_survives_leave() {
    let directory = Arc::new(Directory::new());
    let nodes = spawn_ring(&directory, &[0, 128]).await;

    nodes[0].set("Banana", "x").await;
    nodes[0].set("Chinchilla", "y").await;
    settle().await;

    nodes[1].handle.leave().await.expect("leave dispatched");
    settle().await;

    // The survivor is a ring of one again and owns everything.
    let info = nodes[0].inspect().await;
    assert_eq!(info.predecessor, Did::from(0));
    assert_eq!(info.successor, Did::from(0));
    assert_eq!(nodes[0].get("Banana").await.as_deref(), Some("x"));
    assert_eq!(nodes[0].get("Chinchilla").await.as_deref(), Some("y"));
}

#[tokio::test]
async fn test_adjacent_concurrent_joins_stabilize() {
    let directory = Arc::new(Directory::new());
    let base = spawn_ring(&directory, &[0, 100]).await;

    // Two nodes target neighboring positions at nearly the same time.
    let left = start_node(&directory, 40);
    let right = start_node(&directory, 50);
    left.handle.inspect().await.expect("left failed to join");
    right.handle.inspect().await.expect("right failed to join");
    settle().await;
    settle().await;

    let mut nodes = base;
    nodes.push(left);
    nodes.push(right);
    assert_ring_closure(&nodes).await;
}

#[tokio::test]
async fn test_rejoin_after_leave_reuses_identifier() {
    let directory = Arc::new(Directory::new());
    let nodes = spawn_ring(&directory, &[0, 42, 100]).await;

    nodes[1].handle.leave().await.expect("leave dispatched");
    settle().await;

    // The identifier is free again and may be claimed by a new node.
    let revenant = spawn_node(&directory, 42).await;
    settle().await;
    assert_eq!(directory.all_ids().len(), 3);

    let mut remaining = nodes;
    remaining.remove(1);
    remaining.insert(1, revenant);
    assert_ring_closure(&remaining).await;
    assert_ownership_invariant(&remaining).await;
}
