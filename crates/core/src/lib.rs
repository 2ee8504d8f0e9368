#![warn(missing_docs)]
//! Core protocol engine of ringlet, a simulation of the Chord structured
//! peer-to-peer ring.
//!
//! Keys hash onto a modular identifier ring and every node owns the
//! interval between its predecessor and itself. Each node runs as an
//! independent actor over a private mailbox; nodes find key owners in
//! logarithmic hops through their finger tables, repair successor and
//! predecessor pointers through stabilization claims as members join and
//! leave, and move key/value partitions so ownership always follows the
//! ring.
//!
//! The [directory::Directory] stands in for network addressing: it is
//! the only state shared between nodes and maps a live identifier to its
//! mailbox. Everything else happens by message exchange, modeled in
//! [message] and handled per kind via [message::HandleMsg].
//!
//! A minimal ring:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ringlet_core::dht::Did;
//! use ringlet_core::directory::Directory;
//! use ringlet_core::node::Node;
//!
//! #[tokio::main]
//! async fn main() -> ringlet_core::Result<()> {
//!     let directory = Arc::new(Directory::new());
//!     let (node, handle) = Node::create(directory.clone(), Some(Did::from(0)))?;
//!     tokio::spawn(node.run());
//!     handle.set("Banana", "0").await?;
//!     Ok(())
//! }
//! ```

pub mod consts;
pub mod dht;
pub mod directory;
mod error;
pub mod hash;
pub mod inspect;
pub mod message;
pub mod node;
pub mod store;

pub use error::Error;
pub use error::Result;

#[cfg(test)]
mod tests;
