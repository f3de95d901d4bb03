//! # Overlord Services
//!
//! HTTP adapters behind the command engine's collaborator traits: Little
//! Navmap flight data, CheckWX METAR reports, an OpenAI-compatible language
//! model, Streamer.bot speech and Twitch Helix channel management.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod checkwx;
pub mod helix;
pub mod http;
pub mod littlenavmap;
pub mod openai;
pub mod streamerbot;

pub use checkwx::*;
pub use helix::*;
pub use http::*;
pub use littlenavmap::*;
pub use openai::*;
pub use streamerbot::*;

use overlord_common::Result;
use overlord_config::Config;
use std::sync::Arc;

/// Every remote adapter, built from one configuration.
#[derive(Clone)]
pub struct RemoteServices {
    /// Flight simulator data.
    pub flight: Arc<LittleNavmapClient>,
    /// Airport weather reports.
    pub metar: Arc<CheckWxClient>,
    /// Language model.
    pub language: Arc<OpenAiClient>,
    /// Text-to-speech bridge.
    pub speech: Arc<StreamerBotSpeech>,
    /// Channel management.
    pub channel: Arc<HelixClient>,
}

impl RemoteServices {
    /// Builds the adapters. Fails only on invalid URLs or client setup.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            flight: Arc::new(LittleNavmapClient::new(&config.littlenavmap)?),
            metar: Arc::new(CheckWxClient::new(&config.checkwx)?),
            language: Arc::new(OpenAiClient::new(&config.openai)?),
            speech: Arc::new(StreamerBotSpeech::new(&config.speech)?),
            channel: Arc::new(HelixClient::new(&config.twitch)?),
        })
    }
}
