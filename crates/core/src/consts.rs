//! Constant variables.

/// Number of bits in a ring identifier, which is also the number of
/// entries in a finger table.
pub const FINGER_COUNT: usize = 8;
/// Number of points on the identifier ring.
pub const RING_SIZE: u16 = 1 << FINGER_COUNT;
/// Capacity of a node's inbound mailbox.
pub const MAILBOX_CAPACITY: usize = 256;
/// Default mailbox poll timeout in ms. Due maintenance runs when it elapses.
pub const POLL_INTERVAL_MS: u64 = 20;
/// How long a joining node waits for a single resolution reply, in ms.
pub const JOIN_WAIT_TIMEOUT_MS: u64 = 500;
/// How many times a join resolution is re-sent before the join fails.
pub const JOIN_RETRIES: usize = 3;
