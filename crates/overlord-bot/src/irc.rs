//! Twitch chat over IRC.

use crate::error::{BotError, BotResult};
use crate::transport::{ChatSink, ChatSource};
use async_trait::async_trait;
use chrono::Utc;
use overlord_common::{ChatMessage, PermissionTier, UserId};
use overlord_config::TwitchConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines, ReadHalf, WriteHalf,
};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One parsed server line, reduced to what the bot acts on.
#[derive(Debug, Clone, PartialEq)]
pub enum IrcEvent {
    /// Keep-alive; answer with the same token.
    Ping(String),
    /// A chat message in the joined channel.
    Message(ChatMessage),
    /// The server asked clients to reconnect.
    Reconnect,
    /// Authentication was refused.
    LoginFailed(String),
    /// Anything else.
    Other,
}

fn parse_tags(raw: &str) -> HashMap<&str, String> {
    raw.split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| (key, unescape_tag(value)))
        .collect()
}

fn unescape_tag(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Highest tier named by a `badges` tag, also honouring the `mod` flag.
pub fn tier_from_tags(badges: &str, mod_flag: bool) -> PermissionTier {
    let names: Vec<&str> = badges
        .split(',')
        .filter_map(|badge| badge.split('/').next())
        .collect();
    if names.contains(&"broadcaster") {
        PermissionTier::Broadcaster
    } else if mod_flag || names.contains(&"moderator") {
        PermissionTier::Moderator
    } else if names.contains(&"subscriber") || names.contains(&"founder") {
        PermissionTier::Subscriber
    } else {
        PermissionTier::Everyone
    }
}

/// Parses one line from the chat server.
pub fn parse_line(line: &str) -> IrcEvent {
    let line = line.trim_end_matches(['\r', '\n']);
    let (tags, rest) = match line.strip_prefix('@') {
        Some(tagged) => match tagged.split_once(' ') {
            Some((tags, rest)) => (parse_tags(tags), rest),
            None => return IrcEvent::Other,
        },
        None => (HashMap::new(), line),
    };

    let (prefix, rest) = match rest.strip_prefix(':') {
        Some(prefixed) => match prefixed.split_once(' ') {
            Some((prefix, rest)) => (prefix, rest),
            None => return IrcEvent::Other,
        },
        None => ("", rest),
    };

    let (command, params) = rest.split_once(' ').unwrap_or((rest, ""));
    match command {
        "PING" => IrcEvent::Ping(params.trim_start_matches(':').to_string()),
        "RECONNECT" => IrcEvent::Reconnect,
        "NOTICE"
            if params.contains("Login authentication failed")
                || params.contains("Improperly formatted auth") =>
        {
            let reason = params.split_once(" :").map_or(params, |(_, text)| text);
            IrcEvent::LoginFailed(reason.to_string())
        }
        "PRIVMSG" => {
            let Some((_, text)) = params.split_once(" :") else {
                return IrcEvent::Other;
            };
            let login = prefix.split('!').next().unwrap_or_default().to_lowercase();
            if login.is_empty() {
                return IrcEvent::Other;
            }
            let user_id = tags
                .get("user-id")
                .filter(|id| !id.is_empty())
                .cloned()
                .unwrap_or_else(|| login.clone());
            let display_name = tags
                .get("display-name")
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| login.clone());
            let tier = tier_from_tags(
                tags.get("badges").map_or("", String::as_str),
                tags.get("mod").is_some_and(|flag| flag == "1"),
            );
            IrcEvent::Message(ChatMessage {
                user_id: UserId::new(user_id),
                login,
                display_name,
                tier,
                text: text.to_string(),
                timestamp: Utc::now(),
            })
        }
        _ => IrcEvent::Other,
    }
}

type SharedWriter<W> = Arc<Mutex<W>>;

async fn write_line<W: AsyncWrite + Unpin>(writer: &SharedWriter<W>, line: &str) -> BotResult<()> {
    let mut writer = writer.lock().await;
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Inbound half; answers keep-alives itself.
pub struct IrcSource<R, W> {
    lines: Lines<BufReader<R>>,
    writer: SharedWriter<W>,
}

#[async_trait]
impl<R, W> ChatSource for IrcSource<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> BotResult<Option<ChatMessage>> {
        while let Some(line) = self.lines.next_line().await? {
            match parse_line(&line) {
                IrcEvent::Message(message) => return Ok(Some(message)),
                IrcEvent::Ping(token) => {
                    debug!("PING");
                    write_line(&self.writer, &format!("PONG :{token}")).await?;
                }
                IrcEvent::Reconnect => {
                    return Err(BotError::Connection("server requested a reconnect".to_string()));
                }
                IrcEvent::LoginFailed(reason) => {
                    return Err(BotError::Connection(format!("login failed: {reason}")));
                }
                IrcEvent::Other => {}
            }
        }
        info!("Chat server closed the connection");
        Ok(None)
    }
}

/// Outbound half; writes `PRIVMSG` lines to the joined channel.
pub struct IrcSink<W> {
    writer: SharedWriter<W>,
    channel: String,
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> ChatSink for IrcSink<W> {
    async fn send(&mut self, text: &str) -> BotResult<()> {
        let text = text.replace(['\r', '\n'], " ");
        write_line(&self.writer, &format!("PRIVMSG #{} :{}", self.channel, text)).await
    }
}

/// Logs in, requests tags and joins the configured channel over `stream`.
pub async fn open<S>(
    stream: S,
    config: &TwitchConfig,
) -> BotResult<(IrcSource<ReadHalf<S>, WriteHalf<S>>, IrcSink<WriteHalf<S>>)>
where
    S: AsyncRead + AsyncWrite + Send,
{
    let (reader, writer) = tokio::io::split(stream);
    let writer = Arc::new(Mutex::new(writer));
    let channel = config.channel.trim_start_matches('#').to_lowercase();
    let token = if config.oauth_token.starts_with("oauth:") {
        config.oauth_token.clone()
    } else {
        format!("oauth:{}", config.oauth_token)
    };

    write_line(&writer, &format!("PASS {token}")).await?;
    write_line(&writer, &format!("NICK {}", config.bot_name.to_lowercase())).await?;
    write_line(&writer, "CAP REQ :twitch.tv/tags twitch.tv/commands").await?;
    write_line(&writer, &format!("JOIN #{channel}")).await?;
    info!(%channel, "Joined chat");

    Ok((
        IrcSource {
            lines: BufReader::new(reader).lines(),
            writer: writer.clone(),
        },
        IrcSink { writer, channel },
    ))
}

/// Connects to the configured chat server.
pub async fn connect(
    config: &TwitchConfig,
) -> BotResult<(
    IrcSource<ReadHalf<TcpStream>, WriteHalf<TcpStream>>,
    IrcSink<WriteHalf<TcpStream>>,
)> {
    info!(host = %config.irc_host, port = config.irc_port, "Connecting to chat");
    let stream = TcpStream::connect((config.irc_host.as_str(), config.irc_port))
        .await
        .map_err(|e| {
            warn!("Chat connection failed: {}", e);
            BotError::Connection(format!(
                "cannot reach {}:{}: {e}",
                config.irc_host, config.irc_port
            ))
        })?;
    open(stream, config).await
}
