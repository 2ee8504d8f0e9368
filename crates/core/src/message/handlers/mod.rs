#![warn(missing_docs)]
//! This module implements the message handlers of the ring protocol.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::Envelope;

/// Operator and Handler for membership and stabilization
pub mod membership;
/// Operator and Handler for key routing and owner resolution
pub mod routing;
/// Operator and Handler for partition handoff
pub mod storage;

/// Generic trait for handle message, inspired by Actor-Model.
#[async_trait]
pub trait HandleMsg<T> {
    /// Message handler.
    async fn handle(&mut self, ctx: &Envelope, msg: &T) -> Result<()>;
}
