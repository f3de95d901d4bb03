//! Channel management: `!settitle`, `!setgame`, `!timeout` and `!clearchat`.

use super::{prefix, HandlerResult};
use crate::command::BuiltinCommand;
use crate::context::InvocationContext;
use crate::error::ServiceError;
use crate::executor::ExecutionEnv;
use tracing::{info, warn};

/// A refusal from the platform is reported in chat; anything else propagates.
fn refused(result: Result<(), ServiceError>, action: &str) -> Result<Option<String>, ServiceError> {
    match result {
        Ok(()) => Ok(None),
        Err(ServiceError::Rejected(reason)) => {
            warn!(action, %reason, "Channel action refused");
            Ok(Some(format!("{action} failed: {reason}.")))
        }
        Err(e) => Err(e),
    }
}

pub(super) async fn set_title(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    if ctx.arg_text.is_empty() {
        return Ok(BuiltinCommand::SetTitle.usage().replace('!', &prefix(env)));
    }
    let title = ctx.arg_text.as_str();
    if let Some(reply) = refused(env.services.channel.set_title(title).await, "Title update")? {
        return Ok(reply);
    }
    env.channel_state.write().title = title.to_string();
    info!(user = %ctx.login, %title, "Stream title changed");
    Ok(format!("Stream title updated to: {title}. Compliance acknowledged."))
}

pub(super) async fn set_game(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    if ctx.arg_text.is_empty() {
        return Ok(BuiltinCommand::SetGame.usage().replace('!', &prefix(env)));
    }
    let game = match env.services.channel.set_category(&ctx.arg_text).await {
        Ok(game) => game,
        Err(ServiceError::Rejected(reason)) => {
            warn!(action = "Category update", %reason, "Channel action refused");
            return Ok(format!("Category update failed: {reason}."));
        }
        Err(e) => return Err(e),
    };
    env.channel_state.write().game.clone_from(&game);
    info!(user = %ctx.login, %game, "Stream category changed");
    Ok(format!("Game category set to: {game}. Adjustment recorded."))
}

pub(super) async fn timeout(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let [target, duration, ..] = ctx.args.as_slice() else {
        return Ok(BuiltinCommand::Timeout.usage().replace('!', &prefix(env)));
    };
    let login = target.trim_start_matches('@').to_lowercase();
    let Ok(seconds) = duration.parse::<u64>() else {
        return Ok("Invalid duration specified. Provide a valid number of seconds.".to_string());
    };
    if seconds == 0 {
        return Ok("Invalid duration specified. Provide a valid number of seconds.".to_string());
    }
    let reason = match ctx.rest_after(2) {
        "" => format!("Timed out by {}", ctx.login),
        reason => reason.to_string(),
    };
    let result = env.services.channel.timeout_user(&login, seconds, &reason).await;
    if let Some(reply) = refused(result, "Timeout")? {
        return Ok(reply);
    }
    info!(moderator = %ctx.login, target = %login, seconds, "User timed out");
    Ok(format!("User {login} has been silenced for {seconds} seconds."))
}

pub(super) async fn clear_chat(env: &ExecutionEnv) -> HandlerResult {
    if let Some(reply) = refused(env.services.channel.clear_chat().await, "Chat purge")? {
        return Ok(reply);
    }
    Ok("Chat purge initiated. Cleansing complete.".to_string())
}

#[cfg(test)]
mod tests {
    use crate::error::{ExecutionError, ServiceError};
    use crate::test_support::TestHarness;
    use overlord_common::test_utils::chat_fixtures::moderator_message;

    async fn reply(harness: &TestHarness, text: &str) -> String {
        harness.run(&moderator_message("mod", text)).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_title_updates_state() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!settitle Crossing the  Atlantic").await,
            "Stream title updated to: Crossing the  Atlantic. Compliance acknowledged."
        );
        assert_eq!(harness.env.channel_state.read().title, "Crossing the  Atlantic");
        assert_eq!(harness.channel.actions(), vec!["title:Crossing the  Atlantic"]);

        harness.registry.add_command("t", "Now: {title}", 5, 0).await.unwrap();
        assert_eq!(reply(&harness, "!t").await, "Now: Crossing the  Atlantic");
    }

    #[tokio::test]
    async fn test_set_game() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!setgame Microsoft Flight Simulator").await,
            "Game category set to: Microsoft Flight Simulator. Adjustment recorded."
        );
        assert_eq!(harness.env.channel_state.read().game, "Microsoft Flight Simulator");
        assert_eq!(
            reply(&harness, "!setgame").await,
            "Usage: !setgame <game>. Provide proper parameters."
        );
    }

    #[tokio::test]
    async fn test_timeout() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!timeout @Spammer 600 link spam").await,
            "User spammer has been silenced for 600 seconds."
        );
        assert_eq!(
            reply(&harness, "!timeout other 60").await,
            "User other has been silenced for 60 seconds."
        );
        assert_eq!(
            harness.channel.actions(),
            vec!["timeout:spammer:600:link spam", "timeout:other:60:Timed out by mod"]
        );
        assert_eq!(
            reply(&harness, "!timeout other soon").await,
            "Invalid duration specified. Provide a valid number of seconds."
        );
        assert_eq!(
            reply(&harness, "!timeout other").await,
            "Usage: !timeout <username> <duration_in_seconds>. Provide proper parameters."
        );
    }

    #[tokio::test]
    async fn test_rejection_becomes_reply() {
        let harness = TestHarness::new().await;
        harness.channel.reject_with("missing scope moderator:manage:chat_messages");
        assert_eq!(
            reply(&harness, "!clearchat").await,
            "Chat purge failed: missing scope moderator:manage:chat_messages."
        );
        assert_eq!(harness.env.channel_state.read().title, "");
        reply(&harness, "!settitle new").await;
        assert_eq!(harness.env.channel_state.read().title, "");
    }

    #[tokio::test]
    async fn test_clear_chat() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!clearchat").await,
            "Chat purge initiated. Cleansing complete."
        );
        assert_eq!(harness.channel.actions(), vec!["clear"]);
    }

    #[tokio::test]
    async fn test_unavailable_platform_is_an_error() {
        struct Down;

        #[async_trait::async_trait]
        impl crate::traits::ChannelActions for Down {
            async fn set_title(&self, _: &str) -> Result<(), ServiceError> {
                Err(ServiceError::Unavailable("503".to_string()))
            }
            async fn set_category(&self, _: &str) -> Result<String, ServiceError> {
                Err(ServiceError::Unavailable("503".to_string()))
            }
            async fn timeout_user(&self, _: &str, _: u64, _: &str) -> Result<(), ServiceError> {
                Err(ServiceError::Unavailable("503".to_string()))
            }
            async fn clear_chat(&self) -> Result<(), ServiceError> {
                Err(ServiceError::Unavailable("503".to_string()))
            }
        }

        let harness = TestHarness::new().await;
        let mut services = harness.env.services.clone();
        services.channel = std::sync::Arc::new(Down);
        let env = crate::executor::ExecutionEnv {
            config: harness.config.clone(),
            registry: harness.registry.clone(),
            services,
            channel_state: parking_lot::RwLock::new(harness.env.channel_state.read().clone()),
            voice: parking_lot::RwLock::new(crate::traits::VoiceParams::default()),
        };
        let executor = crate::executor::Executor::new(std::sync::Arc::new(env));
        let ctx = harness.context(&moderator_message("mod", "!clearchat")).unwrap();
        let command = harness.registry.get("clearchat").unwrap();
        let err = executor.execute(&command, &ctx).await.unwrap_err();
        assert!(matches!(err, ExecutionError::UpstreamFailure(ServiceError::Unavailable(_))));
    }
}
