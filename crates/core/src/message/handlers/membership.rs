//! Stabilization claims, pointer corrections and the leave sequence.
//!
//! A check is a claim, not an order: the receiver accepts it only when
//! the claimant is genuinely closer than its current pointer, and
//! otherwise answers with the pointer it actually holds so the claimant
//! can re-target. Two nodes joining side by side converge through this
//! exchange without any global coordination.

use async_trait::async_trait;

use crate::error::Result;
use crate::message::types::DataTransfer;
use crate::message::types::LeaveNetwork;
use crate::message::types::PredecessorCheck;
use crate::message::types::SetPredecessor;
use crate::message::types::SetSuccessor;
use crate::message::types::SuccessorCheck;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::node::Node;
use crate::node::NodeState;

#[async_trait]
impl HandleMsg<SuccessorCheck> for Node {
    async fn handle(&mut self, _ctx: &Envelope, msg: &SuccessorCheck) -> Result<()> {
        let current = self.ring.predecessor();
        let current_alive = self.directory.contains(current);
        let after = self.ring.notify_predecessor(msg.claimant, current_alive);
        if after != msg.claimant {
            // Rejected. Point the claimant at the node actually in front.
            return self
                .send_to(
                    msg.claimant,
                    Message::SetSuccessor(SetSuccessor { successor: after }),
                )
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<PredecessorCheck> for Node {
    async fn handle(&mut self, _ctx: &Envelope, msg: &PredecessorCheck) -> Result<()> {
        let current = self.ring.successor();
        let current_alive = self.directory.contains(current);
        let after = self.ring.notify_successor(msg.claimant, current_alive);
        if after != msg.claimant {
            return self
                .send_to(
                    msg.claimant,
                    Message::SetPredecessor(SetPredecessor {
                        predecessor: after,
                    }),
                )
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<SetSuccessor> for Node {
    async fn handle(&mut self, _ctx: &Envelope, msg: &SetSuccessor) -> Result<()> {
        self.ring.set_successor(msg.successor);
        if msg.successor != self.ring.did() {
            // Re-run the claim against the corrected pointer.
            return self
                .send_to(
                    msg.successor,
                    Message::SuccessorCheck(SuccessorCheck {
                        claimant: self.ring.did(),
                    }),
                )
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<SetPredecessor> for Node {
    async fn handle(&mut self, _ctx: &Envelope, msg: &SetPredecessor) -> Result<()> {
        self.ring.set_predecessor(msg.predecessor);
        if msg.predecessor != self.ring.did() {
            return self
                .send_to(
                    msg.predecessor,
                    Message::PredecessorCheck(PredecessorCheck {
                        claimant: self.ring.did(),
                    }),
                )
                .await;
        }
        Ok(())
    }
}

#[async_trait]
impl HandleMsg<LeaveNetwork> for Node {
    async fn handle(&mut self, _ctx: &Envelope, _msg: &LeaveNetwork) -> Result<()> {
        let did = self.ring.did();
        self.state = NodeState::Leaving;
        tracing::info!("node {}: leaving the ring", did);
        let successor = self.ring.successor();
        let predecessor = self.ring.predecessor();
        if successor != did {
            // Relinquish the partition, then repair the neighbors'
            // pointers. Deregistration must wait until both
            // notifications are on their way.
            for (key, value) in self.store.drain_all() {
                if let Err(e) = self
                    .send_to(successor, Message::DataTransfer(DataTransfer { key, value }))
                    .await
                {
                    tracing::error!("node {}: handoff to {} failed: {}", did, successor, e);
                    break;
                }
            }
            if let Err(e) = self
                .send_to(
                    successor,
                    Message::SetPredecessor(SetPredecessor { predecessor }),
                )
                .await
            {
                tracing::error!("node {}: could not notify successor: {}", did, e);
            }
            if let Err(e) = self
                .send_to(
                    predecessor,
                    Message::SetSuccessor(SetSuccessor { successor }),
                )
                .await
            {
                tracing::error!("node {}: could not notify predecessor: {}", did, e);
            }
        } else if !self.store.is_empty() {
            tracing::warn!(
                "node {}: leaving as the last member, {} stored pairs are dropped",
                did,
                self.store.len()
            );
        }
        self.directory.deregister(did);
        self.state = NodeState::Gone;
        tracing::info!("node {}: left the ring", did);
        Ok(())
    }
}
