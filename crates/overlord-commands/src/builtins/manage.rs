//! Catalog and alert management: `!addcom`, `!editcom`, `!delcom`, `!alias`,
//! `!alert` and `!addalert`.

use super::{bare_name, prefix, HandlerResult};
use crate::command::BuiltinCommand;
use crate::context::InvocationContext;
use crate::error::RegistryError;
use crate::executor::ExecutionEnv;
use overlord_common::strip_wrapping_quotes;
use tracing::warn;

/// Turns a refused catalog change into a chat reply. Store failures stay errors.
fn refusal(err: RegistryError, prefix: &str, login: &str) -> HandlerResult {
    match err {
        RegistryError::DuplicateName(name) => Ok(format!(
            "Command {prefix}{name} already exists. Use {prefix}editcom to modify it."
        )),
        RegistryError::ProtectedCommand(name) => {
            warn!(user = %login, command = %name, "Attempt to change a built-in command");
            Ok("Cannot override built-in commands. Your attempt has been logged.".to_string())
        }
        RegistryError::NotFound(name) => Ok(format!(
            "Command {prefix}{name} not found in database. Verify and retry."
        )),
        RegistryError::InvalidName(name) => Ok(format!(
            "'{name}' is not a valid command name. Names cannot contain spaces."
        )),
        RegistryError::InvalidTemplate(e) => Ok(format!("Response rejected: {e}. Fix the template.")),
        RegistryError::Store(e) => Err(e),
    }
}

fn usage(builtin: BuiltinCommand, prefix: &str) -> String {
    builtin.usage().replace('!', prefix)
}

pub(super) async fn add_command(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let prefix = prefix(env);
    let response = strip_wrapping_quotes(ctx.rest_after(1));
    let (Some(name), false) = (ctx.args.first(), response.is_empty()) else {
        return Ok(usage(BuiltinCommand::AddCom, &prefix));
    };
    let dispatch = env.config.get().dispatch.clone();
    match env
        .registry
        .add_command(
            bare_name(name, &prefix),
            response,
            dispatch.custom_user_cooldown_secs,
            dispatch.custom_global_cooldown_secs,
        )
        .await
    {
        Ok(command) => Ok(format!(
            "Command {prefix}{} added to database. New protocol established.",
            command.name
        )),
        Err(e) => refusal(e, &prefix, &ctx.login),
    }
}

pub(super) async fn edit_command(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let prefix = prefix(env);
    let response = strip_wrapping_quotes(ctx.rest_after(1));
    let (Some(name), false) = (ctx.args.first(), response.is_empty()) else {
        return Ok(usage(BuiltinCommand::EditCom, &prefix));
    };
    match env.registry.edit_command(bare_name(name, &prefix), response).await {
        Ok(command) => Ok(format!(
            "Command {prefix}{} updated. Protocol modification complete.",
            command.name
        )),
        Err(e) => refusal(e, &prefix, &ctx.login),
    }
}

pub(super) async fn delete_command(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let prefix = prefix(env);
    let Some(name) = ctx.args.first() else {
        return Ok(usage(BuiltinCommand::DelCom, &prefix));
    };
    match env.registry.delete_command(bare_name(name, &prefix)).await {
        Ok(command) => Ok(format!(
            "Command {prefix}{} purged from database. Protocol terminated.",
            command.name
        )),
        Err(e) => refusal(e, &prefix, &ctx.login),
    }
}

pub(super) async fn add_alias(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let prefix = prefix(env);
    let [alias, target, ..] = ctx.args.as_slice() else {
        return Ok(usage(BuiltinCommand::Alias, &prefix));
    };
    let alias = bare_name(alias, &prefix);
    match env.registry.add_alias(alias, bare_name(target, &prefix)).await {
        Ok(canonical) => Ok(format!(
            "Alias {prefix}{} -> {prefix}{canonical} established. Protocol updated.",
            alias.to_lowercase()
        )),
        Err(e) => refusal(e, &prefix, &ctx.login),
    }
}

pub(super) async fn alert(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let Some(name) = ctx.args.first().map(|a| a.to_lowercase()) else {
        return Ok(usage(BuiltinCommand::Alert, &prefix(env)));
    };
    match env.services.alerts.get_alert(&name).await? {
        Some(message) => {
            env.speak_best_effort(&message).await;
            Ok(message)
        }
        None => Ok(format!("Alert '{name}' not found in database. Verify and retry.")),
    }
}

pub(super) async fn add_alert(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let message = ctx.rest_after(1);
    let (Some(name), false) = (ctx.args.first().map(|a| a.to_lowercase()), message.is_empty()) else {
        return Ok(usage(BuiltinCommand::AddAlert, &prefix(env)));
    };
    env.services.alerts.save_alert(&name, message).await?;
    Ok(format!("Alert '{name}' has been added to the database. Protocol updated."))
}

#[cfg(test)]
mod tests {
    use crate::command::CommandKind;
    use crate::error::{ExecutionError, ServiceError};
    use crate::test_support::TestHarness;
    use overlord_common::test_utils::chat_fixtures::moderator_message;
    use overlord_config::Config;

    async fn reply(harness: &TestHarness, text: &str) -> String {
        harness.run(&moderator_message("mod", text)).await.unwrap()
    }

    #[tokio::test]
    async fn test_addcom_then_invoke() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!addcom !hype \"LET'S GO\"").await,
            "Command !hype added to database. New protocol established."
        );
        assert_eq!(reply(&harness, "!hype").await, "LET'S GO");

        let command = harness.registry.get("hype").unwrap();
        assert_eq!(command.kind(), CommandKind::Custom);
        assert_eq!(command.user_cooldown_secs, 5);
        assert_eq!(harness.store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_addcom_uses_configured_cooldowns() {
        let mut config = Config::default();
        config.dispatch.custom_user_cooldown_secs = 12;
        config.dispatch.custom_global_cooldown_secs = 3;
        let harness = TestHarness::with_config(config).await;
        reply(&harness, "!addcom gg good game {user}").await;
        let command = harness.registry.get("gg").unwrap();
        assert_eq!((command.user_cooldown_secs, command.global_cooldown_secs), (12, 3));
    }

    #[tokio::test]
    async fn test_addcom_refusals() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!addcom").await,
            "Usage: !addcom [command] [response]. Follow protocol."
        );
        assert_eq!(
            reply(&harness, "!addcom !hype").await,
            "Usage: !addcom [command] [response]. Follow protocol."
        );
        assert_eq!(
            reply(&harness, "!addcom !status hijacked").await,
            "Cannot override built-in commands. Your attempt has been logged."
        );
        reply(&harness, "!addcom hype one").await;
        assert_eq!(
            reply(&harness, "!addcom HYPE two").await,
            "Command !hype already exists. Use !editcom to modify it."
        );
        assert!(reply(&harness, "!addcom bad {nope}")
            .await
            .starts_with("Response rejected: unknown placeholder {nope}"));
    }

    #[tokio::test]
    async fn test_store_failure_is_an_upstream_error() {
        let harness = TestHarness::new().await;
        harness.store.set_fail_writes(true);
        let err = harness
            .run(&moderator_message("mod", "!addcom hype go"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::UpstreamFailure(ServiceError::Storage(_))));
        assert!(harness.registry.get("hype").is_none());
    }

    #[tokio::test]
    async fn test_edit_and_delete() {
        let harness = TestHarness::new().await;
        reply(&harness, "!addcom hype one").await;
        reply(&harness, "!alias h hype").await;
        assert_eq!(
            reply(&harness, "!editcom !hype 'two  spaced'").await,
            "Command !hype updated. Protocol modification complete."
        );
        assert_eq!(reply(&harness, "!h").await, "two  spaced");

        assert_eq!(
            reply(&harness, "!delcom hype").await,
            "Command !hype purged from database. Protocol terminated."
        );
        assert!(harness.registry.resolve("h").is_none());
        assert_eq!(
            reply(&harness, "!delcom hype").await,
            "Command !hype not found in database. Verify and retry."
        );
        assert_eq!(
            reply(&harness, "!delcom status").await,
            "Cannot override built-in commands. Your attempt has been logged."
        );
    }

    #[tokio::test]
    async fn test_alias() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!alias !wx weather").await,
            "Alias !wx -> !weather established. Protocol updated."
        );
        assert_eq!(harness.registry.resolve("wx").as_deref(), Some("weather"));
        assert_eq!(
            reply(&harness, "!alias wx status").await,
            "Command !wx already exists. Use !editcom to modify it."
        );
        assert_eq!(
            reply(&harness, "!alias x missing").await,
            "Command !missing not found in database. Verify and retry."
        );
        assert_eq!(
            reply(&harness, "!alias only").await,
            "Usage: !alias [new command] [existing command]. Follow protocol."
        );
    }

    #[tokio::test]
    async fn test_alerts() {
        let harness = TestHarness::new().await;
        assert_eq!(
            reply(&harness, "!alert TAKEOFF").await,
            "Initiating takeoff sequence. All systems nominal."
        );
        assert_eq!(
            reply(&harness, "!addalert gear Gear down and  locked.").await,
            "Alert 'gear' has been added to the database. Protocol updated."
        );
        assert_eq!(reply(&harness, "!alert gear").await, "Gear down and  locked.");
        assert_eq!(
            reply(&harness, "!alert nope").await,
            "Alert 'nope' not found in database. Verify and retry."
        );
        assert_eq!(
            reply(&harness, "!addalert gear").await,
            "Usage: !addalert <name> <message>. Follow protocol."
        );
    }
}
