//! Key routing and owner resolution.
//!
//! A node answers what it owns and forwards the rest along the closest
//! preceding live finger. Owner resolutions travel the same way and
//! report back to the originating node with a continuation tag.

use async_trait::async_trait;

use crate::error::Result;
use crate::hash::hash_key;
use crate::message::types::FindPredecessor;
use crate::message::types::FindPredecessorReport;
use crate::message::types::FindSuccessor;
use crate::message::types::FindSuccessorReport;
use crate::message::types::GetReport;
use crate::message::types::GetRequest;
use crate::message::types::ResolveThen;
use crate::message::types::SetRequest;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::node::ClientEvent;
use crate::node::Node;

#[async_trait]
impl HandleMsg<GetRequest> for Node {
    async fn handle(&mut self, ctx: &Envelope, msg: &GetRequest) -> Result<()> {
        let target = hash_key(&msg.key);
        if !self.ring.owns(target) {
            let hop = self.next_hop(target);
            return self.forward_to(hop, ctx).await;
        }
        let value = self.store.get(target).cloned();
        match &value {
            Some(v) => tracing::info!(
                "node {}: value at key {} ({}) is {}",
                self.ring.did(),
                target,
                msg.key,
                v
            ),
            None => tracing::info!(
                "node {}: no value at key {} ({})",
                self.ring.did(),
                target,
                msg.key
            ),
        }
        if ctx.orig_sender == self.ring.did() {
            self.emit(ClientEvent::Get {
                key: msg.key.clone(),
                value,
            });
            return Ok(());
        }
        self.send_to(
            ctx.orig_sender,
            Message::GetReport(GetReport {
                key: msg.key.clone(),
                value,
            }),
        )
        .await
    }
}

#[async_trait]
impl HandleMsg<SetRequest> for Node {
    async fn handle(&mut self, ctx: &Envelope, msg: &SetRequest) -> Result<()> {
        let target = hash_key(&msg.key);
        if !self.ring.owns(target) {
            let hop = self.next_hop(target);
            return self.forward_to(hop, ctx).await;
        }
        tracing::info!(
            "node {}: setting value at key {} ({}) to {}",
            self.ring.did(),
            target,
            msg.key,
            msg.value
        );
        self.store.insert(target, msg.value.clone());
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<GetReport> for Node {
    async fn handle(&mut self, _ctx: &Envelope, msg: &GetReport) -> Result<()> {
        self.emit(ClientEvent::Get {
            key: msg.key.clone(),
            value: msg.value.clone(),
        });
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<FindPredecessor> for Node {
    async fn handle(&mut self, ctx: &Envelope, msg: &FindPredecessor) -> Result<()> {
        if !self.ring.owns(msg.target) {
            let hop = self.next_hop(msg.target);
            return self.forward_to(hop, ctx).await;
        }
        match &msg.then {
            // A joiner wants the node it slots in behind.
            ResolveThen::Join => {
                self.send_to(
                    ctx.orig_sender,
                    Message::FindPredecessorReport(FindPredecessorReport {
                        resolved: self.ring.predecessor(),
                    }),
                )
                .await
            }
            // Everything else wants the owner itself.
            then => {
                self.send_to(
                    ctx.orig_sender,
                    Message::FindSuccessorReport(FindSuccessorReport {
                        resolved: self.ring.did(),
                        then: then.clone(),
                    }),
                )
                .await
            }
        }
    }
}

#[async_trait]
impl HandleMsg<FindSuccessor> for Node {
    async fn handle(&mut self, ctx: &Envelope, msg: &FindSuccessor) -> Result<()> {
        self.send_to(
            ctx.sender,
            Message::FindSuccessorReport(FindSuccessorReport {
                resolved: self.ring.successor(),
                then: msg.then.clone(),
            }),
        )
        .await
    }
}

#[async_trait]
impl HandleMsg<FindSuccessorReport> for Node {
    async fn handle(&mut self, _ctx: &Envelope, msg: &FindSuccessorReport) -> Result<()> {
        match &msg.then {
            ResolveThen::Finger { index } => {
                self.ring.set_finger(*index, msg.resolved);
                Ok(())
            }
            ResolveThen::Get { key } => {
                self.send_to(
                    msg.resolved,
                    Message::GetRequest(GetRequest { key: key.clone() }),
                )
                .await
            }
            ResolveThen::Set { key, value } => {
                self.send_to(
                    msg.resolved,
                    Message::SetRequest(SetRequest {
                        key: key.clone(),
                        value: value.clone(),
                    }),
                )
                .await
            }
            ResolveThen::Join => {
                tracing::debug!(
                    "node {}: stray join resolution ignored",
                    self.ring.did()
                );
                Ok(())
            }
        }
    }
}
