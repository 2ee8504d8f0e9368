#![warn(missing_docs)]
//! The node actor.
//!
//! Every ring member is one independent task owning its mailbox, ring
//! pointers and partition. The receive loop prefers envelopes buffered
//! during a synchronous join wait, then polls the mailbox with a bounded
//! timeout; when the timeout elapses, due maintenance runs. Nothing here
//! is shared with other nodes except the [Directory].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_channel::Receiver;
use async_channel::Sender;
use futures::pin_mut;
use futures::select;
use futures::FutureExt;
use futures_timer::Delay;

use crate::consts::JOIN_RETRIES;
use crate::consts::JOIN_WAIT_TIMEOUT_MS;
use crate::consts::POLL_INTERVAL_MS;
use crate::dht::Did;
use crate::dht::FingerFix;
use crate::dht::NodeRing;
use crate::directory::Directory;
use crate::error::Error;
use crate::error::Result;
use crate::hash::hash_key;
use crate::inspect::FingerInspect;
use crate::inspect::NodeInspect;
use crate::inspect::StoreEntryInspect;
use crate::message::types::DataRequest;
use crate::message::types::FindPredecessor;
use crate::message::types::FindSuccessor;
use crate::message::types::GetRequest;
use crate::message::types::LeaveNetwork;
use crate::message::types::PredecessorCheck;
use crate::message::types::ResolveThen;
use crate::message::types::SetRequest;
use crate::message::types::SuccessorCheck;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::Message;
use crate::store::PartitionStore;

/// Lifecycle of a node actor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeState {
    /// Resolving ring position via a bootstrap contact.
    Joining,
    /// Normal message-loop processing.
    Active,
    /// Handing off data and notifying neighbors.
    Leaving,
    /// Deregistered; the actor is about to terminate.
    Gone,
}

/// Driver-facing commands, delivered over a channel separate from the
/// wire mailbox.
#[derive(Debug)]
pub enum Control {
    /// Read a key through this node.
    Get {
        /// Key to read.
        key: String,
    },
    /// Write a key through this node.
    Set {
        /// Key to write.
        key: String,
        /// Value to store.
        value: String,
    },
    /// Start the leave sequence.
    Leave,
    /// Snapshot ring pointers, fingers and stored pairs.
    Inspect(Sender<NodeInspect>),
}

/// Events a node surfaces to its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Outcome of a read issued through this node. `None` means the
    /// owner had no value for the key.
    Get {
        /// Key that was read.
        key: String,
        /// Value reported by the owner.
        value: Option<String>,
    },
}

enum Wake {
    Envelope(Envelope),
    Control(Control),
    ControlClosed,
    MailboxClosed,
    Tick,
}

/// A ring member. Drive it with [Node::run] on any async runtime.
pub struct Node {
    pub(crate) ring: NodeRing,
    pub(crate) state: NodeState,
    pub(crate) store: PartitionStore,
    pub(crate) directory: Arc<Directory>,
    mailbox: Receiver<Envelope>,
    control: Receiver<Control>,
    control_open: bool,
    pending: VecDeque<Envelope>,
    events: Option<Sender<ClientEvent>>,
    poll_interval: Duration,
}

/// Driver-side handle of a spawned node.
#[derive(Clone, Debug)]
pub struct NodeHandle {
    did: Did,
    control: Sender<Control>,
}

impl Node {
    /// Register a node with the directory and build its actor. Pass
    /// `None` to sample a free identifier. The node does not join the
    /// ring until [Node::run] is driven.
    pub fn create(
        directory: Arc<Directory>,
        did: Option<Did>,
    ) -> Result<(Self, NodeHandle)> {
        let (did, mailbox) = match did {
            Some(did) => (did, directory.register(did)?),
            None => directory.register_free()?,
        };
        let (control_tx, control_rx) = async_channel::unbounded();
        let node = Self {
            ring: NodeRing::new(did),
            state: NodeState::Joining,
            store: PartitionStore::new(),
            directory,
            mailbox,
            control: control_rx,
            control_open: true,
            pending: VecDeque::new(),
            events: None,
            poll_interval: Duration::from_millis(POLL_INTERVAL_MS),
        };
        let handle = NodeHandle {
            did,
            control: control_tx,
        };
        Ok((node, handle))
    }

    /// Attach a channel for [ClientEvent]s.
    pub fn with_events(mut self, events: Sender<ClientEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Override the mailbox poll timeout.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The did of current node.
    pub fn did(&self) -> Did {
        self.ring.did()
    }

    /// Join the ring, then process messages until the node leaves.
    pub async fn run(mut self) -> Result<()> {
        if let Err(e) = self.join().await {
            self.directory.deregister(self.ring.did());
            return Err(e);
        }
        self.state = NodeState::Active;
        self.directory.activate(self.ring.did());
        // One proactive sweep right after the join.
        if self.ring.take_refresh_needed() {
            self.refresh_fingers().await;
        }
        tracing::info!("node {}: active", self.ring.did());
        while self.state != NodeState::Gone {
            self.step().await;
        }
        Ok(())
    }

    // One turn of the receive loop. Buffered envelopes first, in their
    // original receipt order.
    async fn step(&mut self) {
        if let Some(env) = self.pending.pop_front() {
            self.dispatch(env).await;
            return;
        }
        let wake = {
            let mailbox = self.mailbox.recv().fuse();
            let control = Self::recv_control(&self.control, self.control_open).fuse();
            let tick = Delay::new(self.poll_interval).fuse();
            pin_mut!(mailbox, control, tick);
            select! {
                env = mailbox => match env {
                    Ok(env) => Wake::Envelope(env),
                    Err(_) => Wake::MailboxClosed,
                },
                ctrl = control => match ctrl {
                    Some(ctrl) => Wake::Control(ctrl),
                    None => Wake::ControlClosed,
                },
                _ = tick => Wake::Tick,
            }
        };
        match wake {
            Wake::Envelope(env) => self.dispatch(env).await,
            Wake::Control(ctrl) => self.handle_control(ctrl).await,
            Wake::ControlClosed => self.control_open = false,
            Wake::MailboxClosed => {
                tracing::warn!("node {}: mailbox closed", self.ring.did());
                self.state = NodeState::Gone;
            }
            Wake::Tick => self.maintenance().await,
        }
    }

    async fn recv_control(control: &Receiver<Control>, open: bool) -> Option<Control> {
        if !open {
            futures::future::pending::<()>().await;
        }
        control.recv().await.ok()
    }

    pub(crate) async fn dispatch(&mut self, env: Envelope) {
        tracing::trace!("node {}: handling {}", self.ring.did(), env.message);
        let result = match &env.message {
            Message::GetRequest(msg) => self.handle(&env, msg).await,
            Message::SetRequest(msg) => self.handle(&env, msg).await,
            Message::GetReport(msg) => self.handle(&env, msg).await,
            Message::FindPredecessor(msg) => self.handle(&env, msg).await,
            Message::FindSuccessor(msg) => self.handle(&env, msg).await,
            Message::FindSuccessorReport(msg) => self.handle(&env, msg).await,
            Message::SuccessorCheck(msg) => self.handle(&env, msg).await,
            Message::PredecessorCheck(msg) => self.handle(&env, msg).await,
            Message::SetSuccessor(msg) => self.handle(&env, msg).await,
            Message::SetPredecessor(msg) => self.handle(&env, msg).await,
            Message::DataRequest(msg) => self.handle(&env, msg).await,
            Message::DataTransfer(msg) => self.handle(&env, msg).await,
            Message::LeaveNetwork(msg) => self.handle(&env, msg).await,
            // A resolution that outlived its join wait. Nothing to do.
            Message::FindPredecessorReport(_) => {
                tracing::debug!("node {}: stray join resolution ignored", self.ring.did());
                Ok(())
            }
        };
        if let Err(e) = result {
            tracing::error!(
                "node {}: failed handling {}: {}",
                self.ring.did(),
                env.message,
                e
            );
        }
    }

    // ---- join ----

    async fn join(&mut self) -> Result<()> {
        let did = self.ring.did();
        let Some(contact) = self.directory.random_contact(did) else {
            tracing::info!("node {}: starting a new ring", did);
            return Ok(());
        };
        tracing::info!("node {}: joining via {}", did, contact);
        let predecessor = self
            .resolve_with_retry(
                contact,
                Message::FindPredecessor(FindPredecessor {
                    target: did,
                    then: ResolveThen::Join,
                }),
                |message| match message {
                    Message::FindPredecessorReport(report) => Some(report.resolved),
                    _ => None,
                },
            )
            .await?;
        let successor = self
            .resolve_with_retry(
                predecessor,
                Message::FindSuccessor(FindSuccessor {
                    then: ResolveThen::Join,
                }),
                |message| match message {
                    Message::FindSuccessorReport(report)
                        if report.then == ResolveThen::Join =>
                    {
                        Some(report.resolved)
                    }
                    _ => None,
                },
            )
            .await?;
        self.ring.adopt_neighbors(predecessor, successor);
        // Tell both neighbors, then claim the owned key range. The check
        // must reach the successor before the data request does.
        self.send_to(
            successor,
            Message::SuccessorCheck(SuccessorCheck { claimant: did }),
        )
        .await?;
        self.send_to(
            predecessor,
            Message::PredecessorCheck(PredecessorCheck { claimant: did }),
        )
        .await?;
        self.send_to(successor, Message::DataRequest(DataRequest {}))
            .await?;
        Ok(())
    }

    // Send `message` to `target` and block until a reply matches,
    // buffering everything else for later processing. The wait is
    // bounded; the request is re-sent a few times before the join fails.
    async fn resolve_with_retry<F>(
        &mut self,
        target: Did,
        message: Message,
        matcher: F,
    ) -> Result<Did>
    where
        F: Fn(&Message) -> Option<Did>,
    {
        for attempt in 0..JOIN_RETRIES {
            if attempt > 0 {
                tracing::warn!(
                    "node {}: resolution via {} timed out, retrying",
                    self.ring.did(),
                    target
                );
            }
            self.send_to(target, message.clone()).await?;
            if let Some(resolved) = self.wait_for_reply(&matcher).await {
                return Ok(resolved);
            }
        }
        Err(Error::JoinTimeout(target))
    }

    async fn wait_for_reply<F>(&mut self, matcher: &F) -> Option<Did>
    where F: Fn(&Message) -> Option<Did> {
        loop {
            let received = {
                let mailbox = self.mailbox.recv().fuse();
                let timeout = Delay::new(Duration::from_millis(JOIN_WAIT_TIMEOUT_MS)).fuse();
                pin_mut!(mailbox, timeout);
                select! {
                    env = mailbox => env.ok(),
                    _ = timeout => None,
                }
            };
            let env = received?;
            if let Some(resolved) = matcher(&env.message) {
                return Some(resolved);
            }
            // Out of turn; keep it for the main loop.
            self.pending.push_back(env);
        }
    }

    // ---- maintenance ----

    async fn maintenance(&mut self) {
        if self.ring.take_refresh_needed() {
            self.refresh_fingers().await;
        }
    }

    // Sweep fingers 1..FINGER_COUNT. Entries covered by the successor
    // interval are fixed in place; the rest resolve through the ring and
    // land asynchronously as tagged replies.
    async fn refresh_fingers(&mut self) {
        let successor = self.ring.successor();
        if successor == self.ring.did() {
            return;
        }
        tracing::debug!("node {}: refreshing fingers", self.ring.did());
        for fix in self.ring.refresh_plan() {
            match fix {
                FingerFix::Set { index, owner } => self.ring.set_finger(index, owner),
                FingerFix::Resolve { index, start } => {
                    let message = Message::FindPredecessor(FindPredecessor {
                        target: start,
                        then: ResolveThen::Finger { index },
                    });
                    if let Err(e) = self.send_to(successor, message).await {
                        tracing::debug!(
                            "node {}: finger resolve via {} failed: {}",
                            self.ring.did(),
                            successor,
                            e
                        );
                    }
                }
            }
        }
    }

    // ---- driver commands ----

    async fn handle_control(&mut self, ctrl: Control) {
        match ctrl {
            Control::Get { key } => self.client_get(key).await,
            Control::Set { key, value } => self.client_set(key, value).await,
            Control::Leave => {
                let leave = Envelope::new(
                    Message::LeaveNetwork(LeaveNetwork {}),
                    self.ring.did(),
                );
                self.dispatch(leave).await;
            }
            Control::Inspect(reply) => {
                let _ = reply.try_send(self.inspect());
            }
        }
    }

    async fn client_get(&mut self, key: String) {
        let target = hash_key(&key);
        if self.ring.owns(target) {
            let env = Envelope::new(
                Message::GetRequest(GetRequest { key }),
                self.ring.did(),
            );
            self.dispatch(env).await;
            return;
        }
        let hop = self.next_hop(target);
        let message = Message::FindPredecessor(FindPredecessor {
            target,
            then: ResolveThen::Get { key },
        });
        if let Err(e) = self.send_to(hop, message).await {
            tracing::warn!("node {}: could not dispatch lookup: {}", self.ring.did(), e);
        }
    }

    async fn client_set(&mut self, key: String, value: String) {
        let target = hash_key(&key);
        if self.ring.owns(target) {
            let env = Envelope::new(
                Message::SetRequest(SetRequest { key, value }),
                self.ring.did(),
            );
            self.dispatch(env).await;
            return;
        }
        let hop = self.next_hop(target);
        let message = Message::FindPredecessor(FindPredecessor {
            target,
            then: ResolveThen::Set { key, value },
        });
        if let Err(e) = self.send_to(hop, message).await {
            tracing::warn!("node {}: could not dispatch lookup: {}", self.ring.did(), e);
        }
    }

    // ---- shared plumbing for handlers ----

    pub(crate) fn next_hop(&mut self, target: Did) -> Did {
        let directory = self.directory.clone();
        self.ring.next_hop(target, |did| directory.contains(did))
    }

    pub(crate) async fn send_to(&self, to: Did, message: Message) -> Result<()> {
        let env = Envelope::new(message, self.ring.did());
        self.directory.send(to, env).await
    }

    pub(crate) async fn forward_to(&self, hop: Did, env: &Envelope) -> Result<()> {
        self.directory.send(hop, env.forward(self.ring.did())).await
    }

    pub(crate) fn emit(&self, event: ClientEvent) {
        if let Some(events) = &self.events {
            let _ = events.try_send(event);
        }
    }

    fn inspect(&self) -> NodeInspect {
        NodeInspect {
            did: self.ring.did(),
            predecessor: self.ring.predecessor(),
            successor: self.ring.successor(),
            fingers: self
                .ring
                .fingers()
                .iter()
                .map(|f| FingerInspect {
                    start: f.start,
                    owner: f.owner,
                })
                .collect(),
            store: self
                .store
                .iter()
                .map(|(key, value)| StoreEntryInspect {
                    key: *key,
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

impl NodeHandle {
    /// The did of the node behind this handle.
    pub fn did(&self) -> Did {
        self.did
    }

    /// Issue a read through this node. The outcome arrives as a
    /// [ClientEvent::Get] on the node's event channel.
    pub async fn get(&self, key: impl Into<String>) -> Result<()> {
        self.send_control(Control::Get { key: key.into() }).await
    }

    /// Issue a write through this node.
    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.send_control(Control::Set {
            key: key.into(),
            value: value.into(),
        })
        .await
    }

    /// Ask the node to leave the ring.
    pub async fn leave(&self) -> Result<()> {
        self.send_control(Control::Leave).await
    }

    /// Snapshot the node's ring pointers, fingers and stored pairs.
    /// Also a convenient readiness probe: it only answers once the node
    /// has finished joining.
    pub async fn inspect(&self) -> Result<NodeInspect> {
        let (tx, rx) = async_channel::bounded(1);
        self.send_control(Control::Inspect(tx)).await?;
        rx.recv().await.map_err(|_| Error::ControlClosed)
    }

    async fn send_control(&self, ctrl: Control) -> Result<()> {
        self.control
            .send(ctrl)
            .await
            .map_err(|_| Error::ControlClosed)
    }
}
