#![warn(missing_docs)]
//! Diagnostic snapshots of node state, for reports and tests.

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;

/// One finger table entry as reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerInspect {
    /// First identifier the entry covers.
    pub start: Did,
    /// Node currently believed to own it.
    pub owner: Did,
}

/// One stored pair as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreEntryInspect {
    /// Hashed key.
    pub key: Did,
    /// Stored value.
    pub value: String,
}

/// Snapshot of a node's ring pointers, fingers and partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInspect {
    /// The node's identifier.
    pub did: Did,
    /// Current predecessor pointer.
    pub predecessor: Did,
    /// Current successor pointer.
    pub successor: Did,
    /// Finger table entries, nearest first.
    pub fingers: Vec<FingerInspect>,
    /// Stored pairs in key order.
    pub store: Vec<StoreEntryInspect>,
}
