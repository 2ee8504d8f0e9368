#![warn(missing_docs)]
//! Ring state of a node, based on CHORD,
//! ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//! With high probability, the number of nodes that must be contacted to
//! find the owner of a key in an N-node ring is O(log N).

mod chord;
pub mod did;
/// Finger table of a ring node
pub mod finger;

pub use chord::FingerFix;
pub use chord::NodeRing;
pub use did::Did;
pub use finger::Finger;
pub use finger::FingerTable;
