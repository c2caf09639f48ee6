//! Push channel: a persistent WebSocket delivering replies by correlation id.

pub mod channel;
pub mod events;

pub use channel::{PendingReply, PushChannel};
pub use events::{PushFrame, PushStatus};
