//! Message and message handlers.

mod payload;
pub use payload::Envelope;

pub mod types;
pub use types::Message;
pub use types::ResolveThen;

pub mod handlers;
pub use handlers::HandleMsg;
