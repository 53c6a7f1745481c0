//! Cross-messenger abstractions (Telegram is the only adapter today).

pub mod pacing;
pub mod port;
pub mod types;
