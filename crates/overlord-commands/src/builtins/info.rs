//! `!stats`, `!help` and `!fact`.

use super::{bare_name, prefix, HandlerResult};
use crate::command::Handler;
use crate::context::InvocationContext;
use crate::executor::ExecutionEnv;
use overlord_common::format_uptime;
use tracing::debug;

use super::flight::{group_thousands, MS_TO_KNOTS};

const FACT_PROMPT: &str = "Tell me a concise and interesting fact related to aviation or airplanes.";

pub(super) async fn stats(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let metrics = env.services.metrics.snapshot();
    let counts = env.registry.counts();
    let uptime = format_uptime(ctx.timestamp - env.channel_state.read().started_at);

    // Stats stay available when the simulator is down.
    let flight = match env.services.flight.fetch().await {
        Ok(snapshot) if snapshot.active => Some(snapshot),
        Ok(_) => None,
        Err(e) => {
            debug!("Flight data unavailable for stats: {}", e);
            None
        }
    };

    let mut report = format!(
        "System Statistics Report: Total Commands Processed: {}. Most Used Command: {}. \
         Custom Commands: {}. Command Aliases: {}. Flight Simulation: {}. Uptime: {}.",
        metrics.total_invocations,
        metrics.most_used().unwrap_or("None"),
        counts.custom,
        counts.aliases,
        if flight.is_some() { "Active" } else { "Inactive" },
        uptime,
    );
    if let Some(snapshot) = &flight {
        #[allow(clippy::cast_possible_truncation)]
        let altitude = snapshot.indicated_altitude.round() as i64;
        #[allow(clippy::cast_possible_truncation)]
        let ground_speed = (snapshot.ground_speed * MS_TO_KNOTS).round() as i64;
        report.push_str(&format!(
            " Current Altitude: {} ft. Ground Speed: {} kts.",
            group_thousands(altitude),
            ground_speed
        ));
    }

    let brief = format!(
        "System status: {} commands processed. Flight systems {}.",
        metrics.total_invocations,
        if flight.is_some() { "active" } else { "inactive" }
    );
    env.speak_best_effort(&brief).await;
    Ok(report)
}

pub(super) fn help(env: &ExecutionEnv, ctx: &InvocationContext) -> String {
    let prefix = prefix(env);
    let Some(requested) = ctx.args.first() else {
        let names: Vec<String> = env
            .registry
            .list()
            .into_iter()
            .map(|name| format!("{prefix}{name}"))
            .collect();
        return format!(
            "Available commands: {}. Use {prefix}help <command> for details. Use them wisely, minions.",
            names.join(", ")
        );
    };

    let token = bare_name(requested, &prefix).to_lowercase();
    match env.registry.lookup(&token) {
        Some(command) => match &command.handler {
            Handler::Native(builtin) => {
                format!("Command {prefix}{}: {}", command.name, builtin.usage().replace('!', &prefix))
            }
            Handler::Template(template) => {
                format!("Custom command {prefix}{} response: {template}", command.name)
            }
        },
        None => format!("Command {prefix}{token} not found. Verify and retry."),
    }
}

pub(super) async fn fact(env: &ExecutionEnv) -> HandlerResult {
    let fact = env.services.language.generate(FACT_PROMPT, &[]).await?;
    let fact = fact.trim().to_string();
    env.speak_best_effort(&fact).await;
    Ok(fact)
}

#[cfg(test)]
mod tests {
    use crate::command::BuiltinCommand;
    use crate::error::{ExecutionError, ServiceError};
    use crate::test_support::TestHarness;
    use crate::traits::{FlightSnapshot, MetricsSink};
    use overlord_common::test_utils::at_secs;
    use overlord_common::test_utils::chat_fixtures::{moderator_message, viewer_message};

    #[tokio::test]
    async fn test_help_lists_every_command() {
        let harness = TestHarness::new().await;
        let reply = harness.run(&viewer_message("alice", "!help")).await.unwrap();
        assert!(reply.starts_with("Available commands: !addalert, !addcom, !airport"));
        for builtin in BuiltinCommand::ALL {
            assert!(reply.contains(&format!("!{}", builtin.name())));
        }
    }

    #[tokio::test]
    async fn test_help_for_one_command() {
        let harness = TestHarness::new().await;
        harness
            .registry
            .add_command("hype", "LET'S GO", 5, 0)
            .await
            .unwrap();

        let builtin = harness.run(&viewer_message("a", "!help flightstatus")).await.unwrap();
        assert_eq!(builtin, "Command !status: !status: current flight status report");

        let custom = harness.run(&viewer_message("a", "!help !hype")).await.unwrap();
        assert_eq!(custom, "Custom command !hype response: LET'S GO");

        let missing = harness.run(&viewer_message("a", "!help nothing")).await.unwrap();
        assert_eq!(missing, "Command !nothing not found. Verify and retry.");
    }

    #[tokio::test]
    async fn test_stats_report() {
        let harness = TestHarness::new().await;
        harness.metrics.increment_invocation("status");
        harness.metrics.increment_invocation("status");
        harness.metrics.increment_invocation("fact");
        harness.registry.add_command("hype", "go", 5, 0).await.unwrap();
        harness.registry.add_alias("h", "hype").await.unwrap();

        let message = viewer_message("a", "!stats").at(at_secs(3_725));
        let reply = harness.run(&message).await.unwrap();
        assert_eq!(
            reply,
            "System Statistics Report: Total Commands Processed: 3. Most Used Command: status. \
             Custom Commands: 1. Command Aliases: 2. Flight Simulation: Inactive. Uptime: 0d 1h 2m 5s."
        );
    }

    #[tokio::test]
    async fn test_stats_survives_flight_outage() {
        let harness = TestHarness::new().await;
        harness.flight.fail_next(ServiceError::Rejected("bad request".to_string()));
        let reply = harness.run(&viewer_message("a", "!stats")).await.unwrap();
        assert!(reply.contains("Flight Simulation: Inactive."));
    }

    #[tokio::test]
    async fn test_stats_with_active_flight() {
        let harness = TestHarness::new().await;
        harness.flight.set_snapshot(FlightSnapshot {
            active: true,
            indicated_altitude: 12_000.0,
            ground_speed: 100.0,
            ..FlightSnapshot::default()
        });
        let reply = harness.run(&moderator_message("m", "!stats")).await.unwrap();
        assert!(reply.contains("Flight Simulation: Active."));
        assert!(reply.ends_with("Current Altitude: 12,000 ft. Ground Speed: 194 kts."));
    }

    #[tokio::test]
    async fn test_fact() {
        let harness = TestHarness::new().await;
        let reply = harness.run(&viewer_message("a", "!fact")).await.unwrap();
        assert_eq!(reply, "Aircraft wings are designed to flex in turbulence.");
        let prompts = harness.language.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].0.contains("aviation"));
        assert!(prompts[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_fact_model_failure_surfaces() {
        let harness = TestHarness::new().await;
        harness.language.set_failure(ServiceError::Rejected("quota".to_string()));
        let err = harness.run(&viewer_message("a", "!fact")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::UpstreamFailure(ServiceError::Rejected(_))));
    }
}
