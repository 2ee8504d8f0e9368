#![warn(missing_docs)]
//! This module defines the message structures exchanged between ring
//! nodes. Requests that expect an answer come in `Xxx` / `XxxReport`
//! pairs; resolution replies carry a [ResolveThen] tag so the receiver
//! can route them to the right continuation.

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;

/// Continuation of an owner resolution. Carried on the request, echoed
/// on the reply.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolveThen {
    /// A joining node resolving its own ring position.
    Join,
    /// Resolve the owner of a key, then send it the read.
    Get {
        /// Key being read.
        key: String,
    },
    /// Resolve the owner of a key, then send it the write.
    Set {
        /// Key being written.
        key: String,
        /// Value to store.
        value: String,
    },
    /// Resolve the owner of a finger start, then fix that entry.
    Finger {
        /// Finger table index awaiting the answer.
        index: usize,
    },
}

/// Read a key from the ring. Forwarded hop by hop until it reaches the
/// owner, which answers the originating node with a [GetReport].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GetRequest {
    /// Key being read.
    pub key: String,
}

/// Write a key into the ring. Forwarded like [GetRequest].
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SetRequest {
    /// Key being written.
    pub key: String,
    /// Value to store.
    pub value: String,
}

/// Answer to a [GetRequest], sent by the owner to the originating node.
/// A missing key is a normal outcome, not an error.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GetReport {
    /// Key that was read.
    pub key: String,
    /// Stored value, if the owner had one.
    pub value: Option<String>,
}

/// Locate the node owning `target`. Routed by closest preceding finger
/// until the owner's interval test succeeds.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindPredecessor {
    /// Identifier being located.
    pub target: Did,
    /// What the resolution is for.
    pub then: ResolveThen,
}

/// Join-mode answer to [FindPredecessor]: the predecessor of the owner,
/// which is the node the joiner slots in behind.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindPredecessorReport {
    /// The resolved predecessor.
    pub resolved: Did,
}

/// Ask a node directly for its current successor.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessor {
    /// What the resolution is for.
    pub then: ResolveThen,
}

/// Answer carrying a resolved owner, tagged with the continuation it
/// belongs to.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FindSuccessorReport {
    /// The resolved node.
    pub resolved: Did,
    /// Continuation echoed from the request.
    pub then: ResolveThen,
}

/// Stabilization claim sent to a node's successor: "I may be your new
/// predecessor."
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct SuccessorCheck {
    /// The claiming node.
    pub claimant: Did,
}

/// Stabilization claim sent to a node's predecessor: "I may be your new
/// successor."
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct PredecessorCheck {
    /// The claiming node.
    pub claimant: Did,
}

/// Correction: point your successor pointer here. Sent when a
/// [SuccessorCheck] is rejected, and by a leaving node to its
/// predecessor.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct SetSuccessor {
    /// The successor to adopt.
    pub successor: Did,
}

/// Correction: point your predecessor pointer here. Sent when a
/// [PredecessorCheck] is rejected, and by a leaving node to its
/// successor.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct SetPredecessor {
    /// The predecessor to adopt.
    pub predecessor: Did,
}

/// Ask a node to hand over the stored pairs its sender now owns.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct DataRequest {}

/// One key/value pair changing hands. The receiver inserts it without
/// re-checking ownership; the sender's partition judgment is trusted.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct DataTransfer {
    /// Hashed key of the pair.
    pub key: Did,
    /// Stored value.
    pub value: String,
}

/// Self-directed trigger that starts the leave sequence.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct LeaveNetwork {}

/// A collection MessageType use for unified management.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Message {
    /// Remote message reading a key.
    GetRequest(GetRequest),
    /// Remote message writing a key.
    SetRequest(SetRequest),
    /// Response of GetRequest.
    GetReport(GetReport),
    /// Remote message locating the owner of an identifier.
    FindPredecessor(FindPredecessor),
    /// Join-mode response of FindPredecessor.
    FindPredecessorReport(FindPredecessorReport),
    /// Remote message asking a node for its successor.
    FindSuccessor(FindSuccessor),
    /// Response carrying a resolved owner.
    FindSuccessorReport(FindSuccessorReport),
    /// Stabilization claim toward a successor.
    SuccessorCheck(SuccessorCheck),
    /// Stabilization claim toward a predecessor.
    PredecessorCheck(PredecessorCheck),
    /// Successor pointer correction.
    SetSuccessor(SetSuccessor),
    /// Predecessor pointer correction.
    SetPredecessor(SetPredecessor),
    /// Partition handoff request.
    DataRequest(DataRequest),
    /// One pair of a partition handoff.
    DataTransfer(DataTransfer),
    /// Self-directed trigger of the leave sequence.
    LeaveNetwork(LeaveNetwork),
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
