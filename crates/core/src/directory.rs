//! Directory of live nodes.
//!
//! Maps a registered identifier to the sending half of that node's
//! mailbox, standing in for network addressing. It is the only structure
//! shared between node actors, so registration and removal must be
//! atomic; everything else about a node stays inside its own task.

use async_channel::Receiver;
use async_channel::Sender;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use dashmap::DashSet;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::consts::MAILBOX_CAPACITY;
use crate::consts::RING_SIZE;
use crate::dht::Did;
use crate::error::Error;
use crate::error::Result;
use crate::message::Envelope;

/// Registry of node mailboxes, plus the subset of nodes that have
/// finished joining and may serve as bootstrap contacts.
#[derive(Debug, Default)]
pub struct Directory {
    mailboxes: DashMap<Did, Sender<Envelope>>,
    active: DashSet<Did>,
}

impl Directory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `did` and create its mailbox. Fails if the identifier is
    /// already registered.
    pub fn register(&self, did: Did) -> Result<Receiver<Envelope>> {
        match self.mailboxes.entry(did) {
            Entry::Occupied(_) => Err(Error::IdTaken(did)),
            Entry::Vacant(slot) => {
                let (tx, rx) = async_channel::bounded(MAILBOX_CAPACITY);
                slot.insert(tx);
                tracing::debug!("directory: registered {}", did);
                Ok(rx)
            }
        }
    }

    /// Claim a free identifier, resampling on collision.
    pub fn register_free(&self) -> Result<(Did, Receiver<Envelope>)> {
        let mut rng = rand::thread_rng();
        for _ in 0..RING_SIZE {
            let did = Did::from(rng.gen::<u8>());
            if let Ok(rx) = self.register(did) {
                return Ok((did, rx));
            }
        }
        // Unlucky sampling on a crowded ring; fall back to a scan.
        for raw in 0..=u8::MAX {
            if let Ok(rx) = self.register(Did::from(raw)) {
                return Ok((Did::from(raw), rx));
            }
        }
        Err(Error::RingFull)
    }

    /// Remove a node. Its mailbox sender is dropped and later sends to it
    /// fail as unreachable.
    pub fn deregister(&self, did: Did) {
        self.active.remove(&did);
        self.mailboxes.remove(&did);
        tracing::debug!("directory: deregistered {}", did);
    }

    /// Mark a node as fully joined, making it eligible as a bootstrap
    /// contact.
    pub fn activate(&self, did: Did) {
        self.active.insert(did);
    }

    /// Whether `did` currently has a mailbox.
    pub fn contains(&self, did: Did) -> bool {
        self.mailboxes.contains_key(&did)
    }

    /// The mailbox sender of `did`, if registered.
    pub fn lookup(&self, did: Did) -> Option<Sender<Envelope>> {
        self.mailboxes.get(&did).map(|e| e.value().clone())
    }

    /// All registered identifiers, in ring order from zero.
    pub fn all_ids(&self) -> Vec<Did> {
        let mut ids: Vec<Did> = self.mailboxes.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }

    /// A random active node other than `excluding`, if any. Joining nodes
    /// use this to pick a bootstrap contact.
    pub fn random_contact(&self, excluding: Did) -> Option<Did> {
        let candidates: Vec<Did> = self
            .active
            .iter()
            .map(|e| *e.key())
            .filter(|d| *d != excluding)
            .collect();
        candidates.choose(&mut rand::thread_rng()).copied()
    }

    /// Deliver an envelope to the mailbox of `to`.
    pub async fn send(&self, to: Did, envelope: Envelope) -> Result<()> {
        let sender = self.lookup(to).ok_or(Error::Unreachable(to))?;
        sender
            .send(envelope)
            .await
            .map_err(|_| Error::MailboxClosed(to))
    }
}
