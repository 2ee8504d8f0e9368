#![warn(missing_docs)]

use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::message::types::Message;

/// The envelope every message travels in.
///
/// `orig_sender` names the node that initiated the logical operation and
/// survives every hop, so the final owner can answer the origin directly.
/// `sender` names the most recent relay and is rewritten at each hop.
/// Envelopes are never mutated in place; forwarding builds a fresh copy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The wrapped message.
    pub message: Message,
    /// Node that initiated the operation. Stable across hops.
    pub orig_sender: Did,
    /// Most recent relaying node. Rewritten per hop.
    pub sender: Did,
}

impl Envelope {
    /// Envelope for a freshly initiated operation: origin and sender are
    /// the same node.
    pub fn new(message: Message, origin: Did) -> Self {
        Self {
            message,
            orig_sender: origin,
            sender: origin,
        }
    }

    /// Copy of this envelope as relayed by `hop`.
    pub fn forward(&self, hop: Did) -> Self {
        Self {
            message: self.message.clone(),
            orig_sender: self.orig_sender,
            sender: hop,
        }
    }
}
