//! Local console transport for running without Twitch credentials.
//!
//! Input lines look like `name: text` or `name@tier: text`; replies go to
//! standard output prefixed with the bot name.

use crate::error::BotResult;
use crate::transport::{ChatSink, ChatSource};
use async_trait::async_trait;
use overlord_common::{ChatMessage, PermissionTier};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::warn;

/// Parses one console line.
///
/// Returns `None` for blank lines and lines without a `name:` prefix. An
/// unknown tier falls back to `everyone`.
pub fn parse_console_line(line: &str) -> Option<ChatMessage> {
    let (speaker, text) = line.split_once(':')?;
    let text = text.trim();
    let (login, tier) = match speaker.trim().split_once('@') {
        Some((login, tier)) => (
            login.trim(),
            tier.parse::<PermissionTier>().unwrap_or_else(|_| {
                warn!("Unknown tier '{}', using everyone", tier.trim());
                PermissionTier::Everyone
            }),
        ),
        None => (speaker.trim(), PermissionTier::Everyone),
    };
    if login.is_empty() || text.is_empty() || login.contains(char::is_whitespace) {
        return None;
    }
    let login = login.to_lowercase();
    Some(ChatMessage::new(format!("console:{login}"), login, tier, text))
}

/// Reads chat lines from any buffered reader, normally stdin.
pub struct ConsoleSource<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin + Send> ConsoleSource<R> {
    /// Wraps a reader.
    pub fn new(reader: R) -> Self {
        Self { lines: reader.lines() }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> ChatSource for ConsoleSource<R> {
    async fn recv(&mut self) -> BotResult<Option<ChatMessage>> {
        while let Some(line) = self.lines.next_line().await? {
            if let Some(message) = parse_console_line(&line) {
                return Ok(Some(message));
            }
            if !line.trim().is_empty() {
                warn!("Ignoring console line without 'name:' prefix");
            }
        }
        Ok(None)
    }
}

/// Writes replies to any writer, normally stdout.
pub struct ConsoleSink<W> {
    writer: W,
    bot_name: String,
}

impl<W: AsyncWrite + Unpin + Send> ConsoleSink<W> {
    /// Wraps a writer; replies are labelled with `bot_name`.
    pub fn new(writer: W, bot_name: impl Into<String>) -> Self {
        Self {
            writer,
            bot_name: bot_name.into(),
        }
    }

    /// The wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ChatSink for ConsoleSink<W> {
    async fn send(&mut self, text: &str) -> BotResult<()> {
        let line = format!("{}: {}\n", self.bot_name, text);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
