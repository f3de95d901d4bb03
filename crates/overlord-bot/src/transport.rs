//! Chat transport halves.
//!
//! A transport is split into an inbound [`ChatSource`] owned by the runtime
//! loop and an outbound [`ChatSink`] owned by the emission writer.

use crate::error::BotResult;
use async_trait::async_trait;
use overlord_common::ChatMessage;

/// Inbound chat lines.
#[async_trait]
pub trait ChatSource: Send {
    /// The next chat message, or `None` once the source is exhausted.
    ///
    /// Must be cancel safe: the runtime polls it inside `select!`.
    async fn recv(&mut self) -> BotResult<Option<ChatMessage>>;
}

/// Outbound chat lines.
#[async_trait]
pub trait ChatSink: Send {
    /// Sends one line to the channel.
    async fn send(&mut self, text: &str) -> BotResult<()>;
}
