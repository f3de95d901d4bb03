//! Twitch Helix channel management.

use crate::http::{HttpService, HttpSettings};
use async_trait::async_trait;
use overlord_commands::{ChannelActions, ServiceError};
use overlord_common::Result;
use overlord_config::TwitchConfig;
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument};

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Game {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
}

#[derive(Debug, Serialize)]
struct Ban<'a> {
    user_id: &'a str,
    duration: u64,
    reason: &'a str,
}

/// Channel actions performed through the Helix API as the bot account.
#[derive(Clone)]
pub struct HelixClient {
    http: HttpService,
    client_id: String,
    token: String,
    broadcaster_id: String,
    moderator_id: String,
}

impl HelixClient {
    /// Creates a client from the Twitch settings.
    pub fn new(config: &TwitchConfig) -> Result<Self> {
        let http = HttpService::new(&HttpSettings::new(&config.helix_url))?;
        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            token: config
                .oauth_token
                .trim()
                .trim_start_matches("oauth:")
                .to_string(),
            broadcaster_id: config.broadcaster_id.clone(),
            moderator_id: config.bot_user_id.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> std::result::Result<RequestBuilder, ServiceError> {
        Ok(self
            .http
            .client()
            .request(method, self.http.url(path)?)
            .header("Client-Id", &self.client_id)
            .bearer_auth(&self.token))
    }

    fn moderation(&self, method: Method, path: &str) -> std::result::Result<RequestBuilder, ServiceError> {
        Ok(self.request(method, path)?.query(&[
            ("broadcaster_id", self.broadcaster_id.as_str()),
            ("moderator_id", self.moderator_id.as_str()),
        ]))
    }

    async fn update_channel(&self, body: serde_json::Value) -> std::result::Result<(), ServiceError> {
        let request = self
            .request(Method::PATCH, "channels")?
            .query(&[("broadcaster_id", &self.broadcaster_id)])
            .json(&body);
        self.http.send(request).await?;
        Ok(())
    }

    async fn find_game(&self, name: &str) -> std::result::Result<Game, ServiceError> {
        let request = self.request(Method::GET, "games")?.query(&[("name", name)]);
        let page: Page<Game> = self.http.json(request).await?;
        page.data
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Rejected(format!("no category named '{name}'")))
    }

    async fn find_user(&self, login: &str) -> std::result::Result<User, ServiceError> {
        let request = self.request(Method::GET, "users")?.query(&[("login", login)]);
        let page: Page<User> = self.http.json(request).await?;
        page.data
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Rejected(format!("no user named '{login}'")))
    }
}

#[async_trait]
impl ChannelActions for HelixClient {
    #[instrument(skip(self))]
    async fn set_title(&self, title: &str) -> std::result::Result<(), ServiceError> {
        self.update_channel(json!({ "title": title })).await?;
        info!("Stream title updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_category(&self, name: &str) -> std::result::Result<String, ServiceError> {
        let game = self.find_game(name).await?;
        self.update_channel(json!({ "game_id": game.id })).await?;
        info!(category = %game.name, "Stream category updated");
        Ok(game.name)
    }

    #[instrument(skip(self, reason))]
    async fn timeout_user(&self, login: &str, seconds: u64, reason: &str) -> std::result::Result<(), ServiceError> {
        let user = self.find_user(login).await?;
        let ban = Ban {
            user_id: &user.id,
            duration: seconds,
            reason,
        };
        let request = self
            .moderation(Method::POST, "moderation/bans")?
            .json(&json!({ "data": ban }));
        self.http.send(request).await?;
        info!("User timed out");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear_chat(&self) -> std::result::Result<(), ServiceError> {
        let request = self.moderation(Method::DELETE, "moderation/chat")?;
        self.http.send(request).await?;
        info!("Chat cleared");
        Ok(())
    }
}
