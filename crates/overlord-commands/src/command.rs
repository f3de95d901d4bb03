//! Command definitions: the closed set of built-ins, custom templates, and
//! the persisted record form.

use overlord_common::PermissionTier;
use overlord_config::CommandOverride;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a command ships with the bot or was created from chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    /// Native handler compiled into the bot.
    Builtin,
    /// Template reply created with `!addcom`.
    Custom,
}

/// Every native command the bot knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinCommand {
    /// Full flight report.
    Status,
    /// One-line flight summary.
    Brief,
    /// Wind and pressure.
    Weather,
    /// Airport lookup by identifier.
    Airport,
    /// Decoded METAR for a station.
    Metar,
    /// Aircraft coordinates.
    Location,
    /// Bot statistics.
    Stats,
    /// Play a saved alert.
    Alert,
    /// Save an alert.
    AddAlert,
    /// Echo and speak a message.
    Say,
    /// Command list and descriptions.
    Help,
    /// Adjust voice parameters.
    Tts,
    /// Show voice parameters.
    TtsStatus,
    /// Manage pending speech.
    TtsQueue,
    /// Aviation fact from the language model.
    Fact,
    /// Create a custom command.
    AddCom,
    /// Delete a custom command.
    DelCom,
    /// Replace a custom command's response.
    EditCom,
    /// Add an alias to any command.
    Alias,
    /// Change the stream title.
    SetTitle,
    /// Change the stream category.
    SetGame,
    /// Time a chatter out.
    Timeout,
    /// Clear the chat.
    ClearChat,
}

impl BuiltinCommand {
    /// All built-ins, in help order.
    pub const ALL: [Self; 23] = [
        Self::Status,
        Self::Brief,
        Self::Weather,
        Self::Airport,
        Self::Metar,
        Self::Location,
        Self::Stats,
        Self::Alert,
        Self::Say,
        Self::Help,
        Self::Tts,
        Self::TtsStatus,
        Self::TtsQueue,
        Self::Fact,
        Self::AddCom,
        Self::DelCom,
        Self::EditCom,
        Self::Alias,
        Self::AddAlert,
        Self::SetTitle,
        Self::SetGame,
        Self::Timeout,
        Self::ClearChat,
    ];

    /// Canonical chat name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Brief => "brief",
            Self::Weather => "weather",
            Self::Airport => "airport",
            Self::Metar => "metar",
            Self::Location => "location",
            Self::Stats => "stats",
            Self::Alert => "alert",
            Self::AddAlert => "addalert",
            Self::Say => "say",
            Self::Help => "help",
            Self::Tts => "tts",
            Self::TtsStatus => "ttsstatus",
            Self::TtsQueue => "ttsqueue",
            Self::Fact => "fact",
            Self::AddCom => "addcom",
            Self::DelCom => "delcom",
            Self::EditCom => "editcom",
            Self::Alias => "alias",
            Self::SetTitle => "settitle",
            Self::SetGame => "setgame",
            Self::Timeout => "timeout",
            Self::ClearChat => "clearchat",
        }
    }

    /// Looks a built-in up by canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == name)
    }

    /// Alias tokens that ship with the bot.
    pub fn default_aliases(self) -> &'static [&'static str] {
        match self {
            Self::Status => &["flightstatus"],
            _ => &[],
        }
    }

    /// Tier required unless configuration overrides it.
    pub fn default_permission(self) -> PermissionTier {
        match self {
            Self::AddCom
            | Self::DelCom
            | Self::EditCom
            | Self::Alias
            | Self::AddAlert
            | Self::SetTitle
            | Self::SetGame
            | Self::Timeout
            | Self::ClearChat => PermissionTier::Moderator,
            _ => PermissionTier::Everyone,
        }
    }

    /// Per-user cooldown unless configuration overrides it.
    pub fn default_user_cooldown_secs(self) -> u64 {
        match self {
            Self::Stats => 10,
            Self::Fact => 30,
            s if s.default_permission() == PermissionTier::Moderator => 30,
            _ => 5,
        }
    }

    /// Usage line shown by `!help <command>` and on bad arguments.
    pub fn usage(self) -> &'static str {
        match self {
            Self::Status => "!status: current flight status report",
            Self::Brief => "!brief: short flight status update",
            Self::Weather => "!weather: current wind and pressure",
            Self::Airport => "Usage: !airport <ICAO>. Provide airport identifier.",
            Self::Metar => "Usage: !metar <ICAO_CODE>",
            Self::Location => "!location: current aircraft position",
            Self::Stats => "!stats: bot and command statistics",
            Self::Alert => "Usage: !alert <name>. Specify alert designation.",
            Self::AddAlert => "Usage: !addalert <name> <message>. Follow protocol.",
            Self::Say => "Usage: !say <message>. Provide message content.",
            Self::Help => "Usage: !help [command]",
            Self::Tts => "Usage: !tts [voice|speed|volume] [value]. Follow the format.",
            Self::TtsStatus => "!ttsstatus: current voice settings",
            Self::TtsQueue => "Usage: !ttsqueue clear",
            Self::Fact => "!fact: an aviation fact",
            Self::AddCom => "Usage: !addcom [command] [response]. Follow protocol.",
            Self::DelCom => "Usage: !delcom [command]. Specify target command.",
            Self::EditCom => "Usage: !editcom [command] [new response]. Follow protocol.",
            Self::Alias => "Usage: !alias [new command] [existing command]. Follow protocol.",
            Self::SetTitle => "Usage: !settitle <title>. Provide proper parameters.",
            Self::SetGame => "Usage: !setgame <game>. Provide proper parameters.",
            Self::Timeout => "Usage: !timeout <username> <duration_in_seconds>. Provide proper parameters.",
            Self::ClearChat => "!clearchat: clear chat messages",
        }
    }
}

impl fmt::Display for BuiltinCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a command produces its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Render a response template.
    Template(String),
    /// Run native code.
    Native(BuiltinCommand),
}

/// A resolved catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Unique canonical name, lowercase, without prefix.
    pub name: String,
    /// Reply producer.
    pub handler: Handler,
    /// Minimum tier allowed to invoke.
    pub permission: PermissionTier,
    /// Per-user cooldown; 0 disables.
    pub user_cooldown_secs: u64,
    /// Channel-wide cooldown; 0 disables.
    pub global_cooldown_secs: u64,
    /// Alternate tokens resolving to this command.
    pub aliases: Vec<String>,
}

impl Command {
    /// The default definition of a built-in.
    pub fn builtin(builtin: BuiltinCommand) -> Self {
        Self {
            name: builtin.name().to_string(),
            handler: Handler::Native(builtin),
            permission: builtin.default_permission(),
            user_cooldown_secs: builtin.default_user_cooldown_secs(),
            global_cooldown_secs: 0,
            aliases: builtin
                .default_aliases()
                .iter()
                .map(|a| (*a).to_string())
                .collect(),
        }
    }

    /// A new custom command available to everyone.
    pub fn custom(
        name: impl Into<String>,
        template: impl Into<String>,
        user_cooldown_secs: u64,
        global_cooldown_secs: u64,
    ) -> Self {
        Self {
            name: name.into(),
            handler: Handler::Template(template.into()),
            permission: PermissionTier::Everyone,
            user_cooldown_secs,
            global_cooldown_secs,
            aliases: Vec::new(),
        }
    }

    /// Builtin or custom.
    pub fn kind(&self) -> CommandKind {
        match self.handler {
            Handler::Template(_) => CommandKind::Custom,
            Handler::Native(_) => CommandKind::Builtin,
        }
    }

    /// Applies a configuration override, returning the effective definition.
    #[must_use]
    pub fn with_override(mut self, over: Option<&CommandOverride>) -> Self {
        if let Some(over) = over {
            if let Some(permission) = over.permission {
                self.permission = permission;
            }
            if let Some(secs) = over.user_cooldown_secs {
                self.user_cooldown_secs = secs;
            }
            if let Some(secs) = over.global_cooldown_secs {
                self.global_cooldown_secs = secs;
            }
        }
        self
    }

    /// Persisted form. Built-ins persist only the aliases added at runtime.
    pub fn to_record(&self) -> CommandRecord {
        match &self.handler {
            Handler::Template(template) => CommandRecord {
                name: self.name.clone(),
                kind: CommandKind::Custom,
                response: Some(template.clone()),
                permission: self.permission,
                user_cooldown_secs: self.user_cooldown_secs,
                global_cooldown_secs: self.global_cooldown_secs,
                aliases: self.aliases.clone(),
            },
            Handler::Native(builtin) => CommandRecord {
                name: self.name.clone(),
                kind: CommandKind::Builtin,
                response: None,
                permission: builtin.default_permission(),
                user_cooldown_secs: builtin.default_user_cooldown_secs(),
                global_cooldown_secs: 0,
                aliases: self
                    .aliases
                    .iter()
                    .filter(|a| !builtin.default_aliases().contains(&a.as_str()))
                    .cloned()
                    .collect(),
            },
        }
    }
}

/// A command as written to the command store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    /// Canonical name.
    pub name: String,
    /// Builtin records carry only runtime aliases.
    pub kind: CommandKind,
    /// Template for custom commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Required tier.
    #[serde(default)]
    pub permission: PermissionTier,
    /// Per-user cooldown.
    #[serde(default)]
    pub user_cooldown_secs: u64,
    /// Global cooldown.
    #[serde(default)]
    pub global_cooldown_secs: u64,
    /// Aliases.
    #[serde(default)]
    pub aliases: Vec<String>,
}
