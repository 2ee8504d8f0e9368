//! Error of ringlet_core

use crate::dht::Did;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors collections in ringlet-core.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Identifier {0} is already registered")]
    IdTaken(Did),

    #[error("No free identifier left on the ring")]
    RingFull,

    #[error("No mailbox registered for {0}")]
    Unreachable(Did),

    #[error("Mailbox of {0} is closed")]
    MailboxClosed(Did),

    #[error("Timed out resolving ring position through {0}")]
    JoinTimeout(Did),

    #[error("Control channel closed")]
    ControlClosed,
}
