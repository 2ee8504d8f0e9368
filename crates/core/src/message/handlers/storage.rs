//! Partition handoff.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::types::DataRequest;
use crate::message::types::DataTransfer;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::node::Node;

#[async_trait]
impl HandleMsg<DataRequest> for Node {
    async fn handle(&mut self, ctx: &Envelope, _msg: &DataRequest) -> Result<()> {
        // Everything outside (predecessor, did] now belongs to the new
        // neighbor that asked.
        let lower = self.ring.predecessor().next();
        let upper = self.ring.did();
        let moved = self.store.split_outside(lower, upper);
        if moved.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            "node {}: handing {} pairs over to {}",
            upper,
            moved.len(),
            ctx.orig_sender
        );
        for (key, value) in moved {
            self.send_to(
                ctx.orig_sender,
                Message::DataTransfer(DataTransfer { key, value }),
            )
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<DataTransfer> for Node {
    async fn handle(&mut self, ctx: &Envelope, msg: &DataTransfer) -> Result<()> {
        // The sender's partition judgment is trusted; no re-validation.
        if !self.ring.owns(msg.key) {
            tracing::debug!(
                "node {}: accepting key {} from {} outside the owned interval",
                self.ring.did(),
                msg.key,
                ctx.sender
            );
        }
        self.store.insert(msg.key, msg.value.clone());
        Ok(())
    }
}
