//! Per-invocation context and command-line tokenizing.

use chrono::{DateTime, Utc};
use overlord_common::{ChatMessage, InvocationId, PermissionTier, UserId};

/// A prefixed chat line split into its command token and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// First token after the prefix, lowercased.
    pub token: String,
    /// Everything after the token, trimmed, with inner spacing preserved.
    pub arg_text: String,
    /// `arg_text` split on whitespace.
    pub args: Vec<String>,
}

/// Splits `text` into a command token and arguments.
///
/// Returns `None` when the text does not start with `prefix` or the prefix is
/// followed by whitespace or nothing.
pub fn parse_command(text: &str, prefix: &str) -> Option<ParsedCommand> {
    let rest = text.trim_start().strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        return None;
    }
    let (token, arg_text) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(t, a)| (t, a.trim()));
    Some(ParsedCommand {
        token: token.to_lowercase(),
        arg_text: arg_text.to_string(),
        args: arg_text.split_whitespace().map(str::to_string).collect(),
    })
}

/// Everything a handler knows about the invocation it is serving.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationContext {
    /// Tracing id.
    pub id: InvocationId,
    /// Invoker.
    pub user_id: UserId,
    /// Invoker login.
    pub login: String,
    /// Invoker display name.
    pub display_name: String,
    /// Invoker tier.
    pub tier: PermissionTier,
    /// Raw chat line.
    pub raw_text: String,
    /// Receive time; cooldowns are computed against it.
    pub timestamp: DateTime<Utc>,
    /// Canonical command name.
    pub command: String,
    /// Token the user actually typed.
    pub invoked_as: String,
    /// Whitespace-separated arguments.
    pub args: Vec<String>,
    /// Argument text with inner spacing preserved.
    pub arg_text: String,
}

impl InvocationContext {
    /// Builds the context for a resolved command.
    pub fn new(message: &ChatMessage, parsed: ParsedCommand, command: impl Into<String>) -> Self {
        Self {
            id: InvocationId::new(),
            user_id: message.user_id.clone(),
            login: message.login.clone(),
            display_name: message.display_name.clone(),
            tier: message.tier,
            raw_text: message.text.clone(),
            timestamp: message.timestamp,
            command: command.into(),
            invoked_as: parsed.token,
            args: parsed.args,
            arg_text: parsed.arg_text,
        }
    }

    /// Argument text after the first `n` arguments, inner spacing preserved.
    pub fn rest_after(&self, n: usize) -> &str {
        let mut rest = self.arg_text.as_str();
        for _ in 0..n {
            rest = rest.trim_start();
            rest = rest
                .find(char::is_whitespace)
                .map_or("", |idx| &rest[idx..]);
        }
        rest.trim()
    }
}

/// Stream metadata shown by templates and changed by channel commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    /// Channel login.
    pub channel: String,
    /// Stream title.
    pub title: String,
    /// Stream category.
    pub game: String,
    /// When the bot came online.
    pub started_at: DateTime<Utc>,
}

impl ChannelState {
    /// Fresh state for a channel.
    pub fn new(channel: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            channel: channel.into(),
            title: String::new(),
            game: String::new(),
            started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlord_common::test_utils::chat_fixtures::viewer_message;

    #[test]
    fn test_parse_command() {
        let parsed = parse_command("  !Weather  KSEA   now ", "!").unwrap();
        assert_eq!(parsed.token, "weather");
        assert_eq!(parsed.arg_text, "KSEA   now");
        assert_eq!(parsed.args, vec!["KSEA", "now"]);

        let bare = parse_command("!status", "!").unwrap();
        assert_eq!(bare.token, "status");
        assert!(bare.args.is_empty());
    }

    #[test]
    fn test_not_a_command() {
        assert_eq!(parse_command("hello !status", "!"), None);
        assert_eq!(parse_command("!", "!"), None);
        assert_eq!(parse_command("! status", "!"), None);
        assert_eq!(parse_command("?status", "!"), None);
        assert!(parse_command("~~status", "~~").is_some());
    }

    #[test]
    fn test_rest_after() {
        let message = viewer_message("alice", "!addcom !hype \"LET'S  GO\"");
        let parsed = parse_command(&message.text, "!").unwrap();
        let ctx = InvocationContext::new(&message, parsed, "addcom");
        assert_eq!(ctx.rest_after(0), "!hype \"LET'S  GO\"");
        assert_eq!(ctx.rest_after(1), "\"LET'S  GO\"");
        assert_eq!(ctx.rest_after(3), "");
    }
}
