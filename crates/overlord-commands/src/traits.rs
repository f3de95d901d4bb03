//! Collaborator interfaces and the data they exchange with the engine.
//!
//! Everything slow, remote or persistent sits behind one of these traits so
//! the engine can be driven by in-memory fakes in tests.

use crate::command::CommandRecord;
use crate::error::{FailureKind, ServiceError};
use crate::loyalty::LoyaltyProfile;
use crate::metrics::{MetricsSnapshot, RejectionKind};
use async_trait::async_trait;
use overlord_common::{ChatMessage, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Aircraft position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    #[serde(default)]
    pub lat: f64,
    /// Longitude in degrees.
    #[serde(default)]
    pub lon: f64,
}

/// One reading from the flight simulator, in the simulator's native units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightSnapshot {
    /// Whether a flight is loaded.
    pub active: bool,
    /// Indicated altitude, feet.
    pub indicated_altitude: f64,
    /// Height above ground, metres.
    pub altitude_above_ground: f64,
    /// Ground speed, m/s.
    pub ground_speed: f64,
    /// True airspeed, m/s.
    pub true_airspeed: f64,
    /// True heading, degrees.
    pub heading: f64,
    /// Vertical speed, m/s.
    pub vertical_speed: f64,
    /// Wind direction, degrees.
    pub wind_direction: f64,
    /// Wind speed, m/s.
    pub wind_speed: f64,
    /// Sea level pressure, hPa.
    pub sea_level_pressure: f64,
    /// Aircraft position.
    pub position: Option<Position>,
}

/// A runway at an airport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Runway {
    /// Runway designator, for example `09L/27R`.
    pub designator: String,
    /// Surface type.
    pub surface: String,
    /// Length in feet.
    pub length: f64,
    /// Heading of the longest direction.
    pub longest_runway_heading: f64,
}

/// Airport details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AirportInfo {
    /// ICAO identifier.
    pub ident: String,
    /// Airport name.
    pub name: String,
    /// Elevation in feet.
    pub elevation: f64,
    /// Runways.
    pub runways: Vec<Runway>,
    /// Radio frequencies keyed by label (`ATIS:`, `Tower:`).
    pub com: HashMap<String, String>,
}

/// A raw METAR observation for one station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetarReport {
    /// Reporting station.
    pub icao: String,
    /// Undecoded report text.
    pub raw_text: String,
}

/// Voice settings sent with each speech request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    /// Voice name.
    pub voice: String,
    /// Speed multiplier.
    pub speed: f32,
    /// Volume, 0.0 to 1.0.
    pub volume: f32,
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self {
            voice: "default".to_string(),
            speed: 1.0,
            volume: 1.0,
        }
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    /// A chatter.
    User,
    /// The bot.
    Assistant,
}

/// One turn of conversation history given to the language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Speaker.
    pub role: TurnRole,
    /// Text.
    pub content: String,
}

/// Persistent storage of custom commands and runtime aliases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Reads every stored record.
    async fn load(&self) -> Result<Vec<CommandRecord>, ServiceError>;
    /// Inserts or replaces the record with the same name.
    async fn persist(&self, record: &CommandRecord) -> Result<(), ServiceError>;
    /// Removes the record with this name, if any.
    async fn remove(&self, name: &str) -> Result<(), ServiceError>;
}

/// Live flight simulator data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlightDataProvider: Send + Sync {
    /// Current simulator state.
    async fn fetch(&self) -> Result<FlightSnapshot, ServiceError>;
    /// Airport lookup by identifier.
    async fn airport(&self, ident: &str) -> Result<Option<AirportInfo>, ServiceError>;
}

/// Aviation weather observations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetarProvider: Send + Sync {
    /// Latest METAR for a station; `None` when the station has no report.
    async fn metar(&self, icao: &str) -> Result<Option<MetarReport>, ServiceError>;
}

/// Text generation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a reply to `prompt` given prior turns.
    async fn generate(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, ServiceError>;
}

/// Text-to-speech output.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Speaks `text` with the given voice.
    async fn speak(&self, text: &str, voice: &VoiceParams) -> Result<(), ServiceError>;
    /// Drops speech that is queued but not yet spoken.
    async fn clear_queue(&self) -> Result<(), ServiceError>;
}

/// Channel management actions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChannelActions: Send + Sync {
    /// Changes the stream title.
    async fn set_title(&self, title: &str) -> Result<(), ServiceError>;
    /// Changes the stream category and returns its canonical name.
    async fn set_category(&self, name: &str) -> Result<String, ServiceError>;
    /// Times a chatter out by login.
    async fn timeout_user(&self, login: &str, seconds: u64, reason: &str) -> Result<(), ServiceError>;
    /// Clears the chat.
    async fn clear_chat(&self) -> Result<(), ServiceError>;
}

/// Saved alert messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertStore: Send + Sync {
    /// Saves or replaces an alert.
    async fn save_alert(&self, name: &str, message: &str) -> Result<(), ServiceError>;
    /// Looks an alert up.
    async fn get_alert(&self, name: &str) -> Result<Option<String>, ServiceError>;
}

/// Loyalty point accounting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoyaltyStore: Send + Sync {
    /// Adds `delta` points and returns the updated profile.
    async fn increment_loyalty(&self, user_id: &UserId, delta: i64) -> Result<LoyaltyProfile, ServiceError>;
    /// Current profile; unknown users start at zero.
    async fn profile(&self, user_id: &UserId) -> Result<LoyaltyProfile, ServiceError>;
}

/// Counters for dispatch outcomes.
#[cfg_attr(test, mockall::automock)]
pub trait MetricsSink: Send + Sync {
    /// A command completed and produced its reply.
    fn increment_invocation(&self, command: &str);
    /// A command failed to produce its reply.
    fn record_failure(&self, command: &str, kind: FailureKind);
    /// A message was dropped before execution.
    fn record_rejection(&self, kind: RejectionKind);
    /// Point-in-time copy of all counters.
    fn snapshot(&self) -> MetricsSnapshot;
}

/// Free-form chat responder for messages that are not commands.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatEngagement: Send + Sync {
    /// A reply, when the message calls for one.
    async fn engage(&self, message: &ChatMessage) -> Option<String>;
}
