#![warn(missing_docs)]

use serde::Deserialize;
use serde::Serialize;

use crate::consts::FINGER_COUNT;
use crate::dht::Did;

/// One routing shortcut. `start` is fixed for the lifetime of the owning
/// node; `owner` is the current best guess for the node responsible for
/// `start` and may go stale as membership changes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finger {
    /// First identifier this finger covers, `node + 2^index`.
    pub start: Did,
    /// Node believed to own `start`.
    pub owner: Did,
}

/// Finger table of a ring node.
///
/// Holds [FINGER_COUNT] entries whose starts double in distance, so a
/// lookup can cross the ring in logarithmic hops. Entry 0 doubles as the
/// node's successor pointer. Entries are always populated: a lone node
/// points every finger at itself, and a joining node seeds all entries
/// with its successor until a refresh sweep corrects them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerTable {
    did: Did,
    entries: Vec<Finger>,
}

impl FingerTable {
    /// Build a table for `did` with every owner set to `owner`.
    pub fn new(did: Did, owner: Did) -> Self {
        let entries = (0..FINGER_COUNT)
            .map(|index| Finger {
                start: did.finger_start(index),
                owner,
            })
            .collect();
        Self { did, entries }
    }

    /// Start identifier of entry `index`.
    pub fn start(&self, index: usize) -> Did {
        self.entries[index].start
    }

    /// Owner of entry `index`.
    pub fn owner(&self, index: usize) -> Did {
        self.entries[index].owner
    }

    /// setter
    pub fn set_owner(&mut self, index: usize, owner: Did) {
        if index >= self.entries.len() {
            tracing::error!("set finger index out of range, index: {}", index);
            return;
        }
        tracing::debug!("node {}: finger[{}] <- {}", self.did, index, owner);
        self.entries[index].owner = owner;
    }

    /// The next node on the ring, stored as entry 0.
    pub fn successor(&self) -> Did {
        self.entries[0].owner
    }

    /// Point entry 0 at a new successor.
    pub fn set_successor(&mut self, did: Did) {
        self.set_owner(0, did);
    }

    /// Point every entry at `owner`. A coarse approximation used right
    /// after a join, before the first refresh sweep.
    pub fn seed(&mut self, owner: Did) {
        for entry in self.entries.iter_mut() {
            entry.owner = owner;
        }
    }

    /// Furthest live finger owner that still precedes `target`, scanning
    /// from the farthest entry down. Owners equal to the node itself are
    /// skipped. The second value reports whether any candidate was skipped
    /// for being unreachable.
    pub fn closest_preceding<F>(&self, target: Did, alive: F) -> (Option<Did>, bool)
    where F: Fn(Did) -> bool {
        let mut saw_stale = false;
        for entry in self.entries.iter().rev() {
            if entry.owner == self.did {
                continue;
            }
            if !entry.owner.between(self.did.next(), target) {
                continue;
            }
            if alive(entry.owner) {
                return (Some(entry.owner), saw_stale);
            }
            saw_stale = true;
        }
        (None, saw_stale)
    }

    /// Iterate entries from nearest to farthest.
    pub fn iter(&self) -> impl Iterator<Item = &Finger> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_table_points_everywhere_at_seed() {
        let table = FingerTable::new(Did::from(0), Did::from(0));
        assert_eq!(table.successor(), Did::from(0));
        let starts: Vec<u8> = table.iter().map(|f| f.start.into()).collect();
        assert_eq!(starts, vec![1, 2, 4, 8, 16, 32, 64, 128]);
    }

    #[test]
    fn test_seed_and_set_owner() {
        let mut table = FingerTable::new(Did::from(0), Did::from(0));
        table.seed(Did::from(42));
        assert!(table.iter().all(|f| f.owner == Did::from(42)));

        table.set_owner(6, Did::from(100));
        table.set_owner(7, Did::from(172));
        assert_eq!(table.owner(6), Did::from(100));
        assert_eq!(table.owner(7), Did::from(172));
        assert_eq!(table.successor(), Did::from(42));

        // out of range is ignored
        table.set_owner(usize::MAX, Did::from(9));
    }

    #[test]
    fn test_closest_preceding_picks_farthest_below_target() {
        // Table of node 0 in the ring 0 -> 42 -> 100 -> 172.
        let mut table = FingerTable::new(Did::from(0), Did::from(42));
        table.set_owner(6, Did::from(100));
        table.set_owner(7, Did::from(172));

        let all_alive = |_: Did| true;
        // Target 120: finger owner 100 precedes it, 172 does not.
        let (hop, stale) = table.closest_preceding(Did::from(120), all_alive);
        assert_eq!(hop, Some(Did::from(100)));
        assert!(!stale);

        // Target 20: no entry precedes it, the caller falls back to the
        // successor.
        let (hop, _) = table.closest_preceding(Did::from(20), all_alive);
        assert_eq!(hop, None);

        // Target 250: the farthest finger applies.
        let (hop, _) = table.closest_preceding(Did::from(250), all_alive);
        assert_eq!(hop, Some(Did::from(172)));
    }

    #[test]
    fn test_closest_preceding_skips_dead_owners() {
        let mut table = FingerTable::new(Did::from(0), Did::from(42));
        table.set_owner(6, Did::from(100));
        table.set_owner(7, Did::from(172));

        // 172 is gone, so target 250 falls back to the next candidate.
        let (hop, stale) = table.closest_preceding(Did::from(250), |d| d != Did::from(172));
        assert_eq!(hop, Some(Did::from(100)));
        assert!(stale);

        // Everything dead reports no hop at all.
        let (hop, stale) = table.closest_preceding(Did::from(250), |_| false);
        assert_eq!(hop, None);
        assert!(stale);
    }

    #[test]
    fn test_closest_preceding_never_returns_self() {
        let table = FingerTable::new(Did::from(7), Did::from(7));
        let (hop, stale) = table.closest_preceding(Did::from(200), |_| true);
        assert_eq!(hop, None);
        assert!(!stale);
    }
}
