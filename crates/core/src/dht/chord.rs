//! Ring membership state and routing decisions of a single node.
#![warn(missing_docs)]

use crate::consts::FINGER_COUNT;
use crate::dht::Did;
use crate::dht::FingerTable;

/// Per-node view of the ring.
///
/// A node owns the half-open identifier interval `(predecessor, did]`.
/// The successor pointer lives in the finger table as entry 0. All state
/// here is owned by the node's actor and mutated only while handling its
/// own messages; cross-node coordination happens by message exchange, so
/// no locking is involved.
#[derive(Clone, Debug)]
pub struct NodeRing {
    /// The did of current node.
    did: Did,
    /// The did of the previous node on the ring.
    predecessor: Did,
    /// Routing shortcuts, including the successor at entry 0.
    fingers: FingerTable,
    /// Set when routing discovered a stale finger. Cleared when a refresh
    /// sweep is issued.
    refresh_needed: bool,
}

/// One step of a finger refresh sweep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FingerFix {
    /// The entry start falls inside the successor interval; set directly.
    Set {
        /// Finger table index to update.
        index: usize,
        /// New owner for that entry.
        owner: Did,
    },
    /// The owner of `start` must be resolved through the ring.
    Resolve {
        /// Finger table index awaiting the resolution reply.
        index: usize,
        /// Identifier whose owner is wanted.
        start: Did,
    },
}

impl NodeRing {
    /// State of the first node of a ring: its own predecessor and
    /// successor, every finger pointing at itself.
    pub fn new(did: Did) -> Self {
        Self {
            did,
            predecessor: did,
            fingers: FingerTable::new(did, did),
            refresh_needed: false,
        }
    }

    /// The did of current node.
    pub fn did(&self) -> Did {
        self.did
    }

    /// The node directly before this one on the ring.
    pub fn predecessor(&self) -> Did {
        self.predecessor
    }

    /// The node directly after this one on the ring.
    pub fn successor(&self) -> Did {
        self.fingers.successor()
    }

    /// setter
    pub fn set_predecessor(&mut self, did: Did) {
        tracing::debug!("node {}: predecessor <- {}", self.did, did);
        self.predecessor = did;
    }

    /// setter
    pub fn set_successor(&mut self, did: Did) {
        tracing::debug!("node {}: successor <- {}", self.did, did);
        self.fingers.set_successor(did);
    }

    /// Read access to the finger table.
    pub fn fingers(&self) -> &FingerTable {
        &self.fingers
    }

    /// Update one finger entry, typically from a resolution reply.
    pub fn set_finger(&mut self, index: usize, owner: Did) {
        self.fingers.set_owner(index, owner);
    }

    /// Adopt the neighbors resolved during a join. Every finger is seeded
    /// with the successor until the first refresh sweep runs.
    pub fn adopt_neighbors(&mut self, predecessor: Did, successor: Did) {
        tracing::debug!(
            "node {}: joining between {} and {}",
            self.did,
            predecessor,
            successor
        );
        self.predecessor = predecessor;
        self.fingers.seed(successor);
        self.refresh_needed = true;
    }

    /// True iff this node owns `target`, i.e. `target` lies in
    /// `(predecessor, did]`. A lone node owns the whole ring.
    pub fn owns(&self, target: Did) -> bool {
        target.between(self.predecessor.next(), self.did)
    }

    /// Next hop for a lookup this node cannot answer. Scans the finger
    /// table for the closest preceding live owner and falls back to the
    /// successor, which always makes progress. Skipped dead owners flag
    /// the table for a refresh sweep.
    pub fn next_hop<F>(&mut self, target: Did, alive: F) -> Did
    where F: Fn(Did) -> bool {
        let (hop, saw_stale) = self.fingers.closest_preceding(target, alive);
        if saw_stale {
            tracing::debug!("node {}: stale finger while routing to {}", self.did, target);
            self.refresh_needed = true;
        }
        hop.unwrap_or_else(|| self.successor())
    }

    /// Handle the claim that `claimant` may be this node's predecessor.
    /// Accepts only a claimant genuinely closer than the current pointer,
    /// or any claimant when the current pointer is no longer reachable.
    /// Returns the predecessor after the update; a caller that sees a
    /// value different from `claimant` should answer with a correction.
    pub fn notify_predecessor(&mut self, claimant: Did, current_alive: bool) -> Did {
        if claimant != self.did && (self.improves_predecessor(claimant) || !current_alive) {
            self.set_predecessor(claimant);
        }
        self.predecessor
    }

    /// Handle the claim that `claimant` may be this node's successor.
    /// Mirror image of [NodeRing::notify_predecessor].
    pub fn notify_successor(&mut self, claimant: Did, current_alive: bool) -> Did {
        if claimant != self.did && (self.improves_successor(claimant) || !current_alive) {
            self.set_successor(claimant);
        }
        self.successor()
    }

    // Strictly inside (predecessor, did). When the predecessor is the node
    // itself the open interval is the rest of the ring.
    fn improves_predecessor(&self, claimant: Did) -> bool {
        claimant != self.did && claimant.between(self.predecessor.next(), self.did)
    }

    // Strictly inside (did, successor).
    fn improves_successor(&self, claimant: Did) -> bool {
        claimant != self.successor() && claimant.between(self.did.next(), self.successor())
    }

    /// Mark the finger table as needing a refresh sweep.
    pub fn mark_refresh(&mut self) {
        self.refresh_needed = true;
    }

    /// Consume the refresh flag. The flag clears when the sweep is issued,
    /// not when its replies arrive; replies land asynchronously and update
    /// entries one by one.
    pub fn take_refresh_needed(&mut self) -> bool {
        std::mem::take(&mut self.refresh_needed)
    }

    /// Plan a refresh of fingers `1..FINGER_COUNT`. Entry 0 is the
    /// successor and is maintained by stabilization instead.
    pub fn refresh_plan(&self) -> Vec<FingerFix> {
        let successor = self.successor();
        (1..FINGER_COUNT)
            .map(|index| {
                let start = self.fingers.start(index);
                if start.between(self.did.next(), successor) {
                    FingerFix::Set {
                        index,
                        owner: successor,
                    }
                } else {
                    FingerFix::Resolve { index, start }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The four-node ring used throughout: 0 -> 42 -> 100 -> 172 -> 0.
    fn ring_node_0() -> NodeRing {
        let mut ring = NodeRing::new(Did::from(0));
        ring.set_predecessor(Did::from(172));
        ring.fingers.seed(Did::from(42));
        ring.set_finger(6, Did::from(100));
        ring.set_finger(7, Did::from(172));
        ring
    }

    #[test]
    fn test_lone_node_owns_everything() {
        let ring = NodeRing::new(Did::from(42));
        for x in 0..=255u8 {
            assert!(ring.owns(Did::from(x)));
        }
        assert_eq!(ring.predecessor(), Did::from(42));
        assert_eq!(ring.successor(), Did::from(42));
    }

    #[test]
    fn test_ownership_interval() {
        let ring = ring_node_0();
        // Node 0 owns (172, 0], which wraps through 255.
        assert!(ring.owns(Did::from(0)));
        assert!(ring.owns(Did::from(200)));
        assert!(ring.owns(Did::from(255)));
        assert!(!ring.owns(Did::from(172)));
        assert!(!ring.owns(Did::from(42)));
        assert!(!ring.owns(Did::from(1)));
    }

    #[test]
    fn test_next_hop_takes_largest_safe_jump() {
        let mut ring = ring_node_0();
        let alive = |_: Did| true;
        assert_eq!(ring.next_hop(Did::from(120), alive), Did::from(100));
        assert_eq!(ring.next_hop(Did::from(180), alive), Did::from(172));
        assert_eq!(ring.next_hop(Did::from(42), alive), Did::from(42));
        assert!(!ring.take_refresh_needed());
    }

    #[test]
    fn test_next_hop_falls_back_past_dead_fingers() {
        let mut ring = ring_node_0();
        // 172 left without notice; routing to 180 degrades to finger 100.
        let hop = ring.next_hop(Did::from(180), |d| d != Did::from(172));
        assert_eq!(hop, Did::from(100));
        assert!(ring.take_refresh_needed());
        assert!(!ring.take_refresh_needed());

        // With every finger dead the successor is still proposed.
        let hop = ring.next_hop(Did::from(180), |_| false);
        assert_eq!(hop, Did::from(42));
        assert!(ring.take_refresh_needed());
    }

    #[test]
    fn test_notify_predecessor_accepts_closer_claimant() {
        let mut ring = ring_node_0();
        // 200 sits inside (172, 0) so it is a better predecessor.
        assert_eq!(ring.notify_predecessor(Did::from(200), true), Did::from(200));
        // 150 is behind 200 now, rejected; the actual pointer is returned.
        assert_eq!(ring.notify_predecessor(Did::from(150), true), Did::from(200));
        // The current claimant repeated is a no-op, not a rejection.
        assert_eq!(ring.notify_predecessor(Did::from(200), true), Did::from(200));
    }

    #[test]
    fn test_notify_predecessor_replaces_dead_pointer() {
        let mut ring = ring_node_0();
        // 150 is not inside (172, 0), but the current predecessor is gone.
        assert_eq!(ring.notify_predecessor(Did::from(150), false), Did::from(150));
    }

    #[test]
    fn test_notify_successor_accepts_closer_claimant() {
        let mut ring = ring_node_0();
        // 20 sits inside (0, 42).
        assert_eq!(ring.notify_successor(Did::from(20), true), Did::from(20));
        assert_eq!(ring.notify_successor(Did::from(30), true), Did::from(20));
        // Lone node accepts any successor claim.
        let mut lone = NodeRing::new(Did::from(7));
        assert_eq!(lone.notify_successor(Did::from(100), true), Did::from(100));
    }

    #[test]
    fn test_adopt_neighbors_seeds_fingers() {
        let mut ring = NodeRing::new(Did::from(60));
        ring.adopt_neighbors(Did::from(42), Did::from(100));
        assert_eq!(ring.predecessor(), Did::from(42));
        assert_eq!(ring.successor(), Did::from(100));
        assert!(ring.fingers().iter().all(|f| f.owner == Did::from(100)));
        assert!(ring.take_refresh_needed());
    }

    #[test]
    fn test_refresh_plan_splits_trivial_and_remote() {
        let mut ring = NodeRing::new(Did::from(0));
        ring.adopt_neighbors(Did::from(172), Did::from(42));
        let plan = ring.refresh_plan();
        assert_eq!(plan.len(), FINGER_COUNT - 1);
        // Starts 2..32 fall inside (0, 42] and resolve to the successor.
        for (i, fix) in plan.iter().take(5).enumerate() {
            assert_eq!(fix, &FingerFix::Set {
                index: i + 1,
                owner: Did::from(42),
            });
        }
        // Starts 64 and 128 lie beyond the successor.
        assert_eq!(plan[5], FingerFix::Resolve {
            index: 6,
            start: Did::from(64),
        });
        assert_eq!(plan[6], FingerFix::Resolve {
            index: 7,
            start: Did::from(128),
        });
    }

    #[test]
    fn test_refresh_plan_is_idempotent() {
        let mut ring = ring_node_0();
        ring.mark_refresh();
        let first = ring.refresh_plan();
        let second = ring.refresh_plan();
        assert_eq!(first, second);
    }
}
