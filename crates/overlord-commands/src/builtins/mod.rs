//! Native handlers for the built-in commands.
//!
//! Each handler returns the reply text. Usage mistakes and refused registry
//! changes are ordinary replies; only collaborator failures surface as
//! [`ServiceError`] so the execution shell can retry or fall back.

mod channel;
mod flight;
mod info;
mod manage;
mod metar;
mod voice;

pub use flight::{
    flight_phase, format_airport, format_brief, format_location, format_status, format_weather,
    group_thousands, FlightPhase, HPA_PER_INHG, METERS_TO_FEET, MS_TO_FPM, MS_TO_KNOTS,
};
pub use metar::format_metar;

use crate::command::BuiltinCommand;
use crate::context::InvocationContext;
use crate::error::ServiceError;
use crate::executor::ExecutionEnv;
use tracing::instrument;

/// Result of a native handler.
pub type HandlerResult = Result<String, ServiceError>;

/// Runs one built-in.
#[instrument(skip(env, ctx), fields(invocation = %ctx.id, user = %ctx.login))]
pub async fn run(builtin: BuiltinCommand, env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    match builtin {
        BuiltinCommand::Status => flight::status(env).await,
        BuiltinCommand::Brief => flight::brief(env).await,
        BuiltinCommand::Weather => flight::weather(env).await,
        BuiltinCommand::Airport => flight::airport(env, ctx).await,
        BuiltinCommand::Metar => metar::metar(env, ctx).await,
        BuiltinCommand::Location => flight::location(env).await,
        BuiltinCommand::Stats => info::stats(env, ctx).await,
        BuiltinCommand::Help => Ok(info::help(env, ctx)),
        BuiltinCommand::Fact => info::fact(env).await,
        BuiltinCommand::Alert => manage::alert(env, ctx).await,
        BuiltinCommand::AddAlert => manage::add_alert(env, ctx).await,
        BuiltinCommand::AddCom => manage::add_command(env, ctx).await,
        BuiltinCommand::DelCom => manage::delete_command(env, ctx).await,
        BuiltinCommand::EditCom => manage::edit_command(env, ctx).await,
        BuiltinCommand::Alias => manage::add_alias(env, ctx).await,
        BuiltinCommand::Say => voice::say(env, ctx).await,
        BuiltinCommand::Tts => Ok(voice::tts(env, ctx)),
        BuiltinCommand::TtsStatus => Ok(voice::tts_status(env)),
        BuiltinCommand::TtsQueue => voice::tts_queue(env, ctx).await,
        BuiltinCommand::SetTitle => channel::set_title(env, ctx).await,
        BuiltinCommand::SetGame => channel::set_game(env, ctx).await,
        BuiltinCommand::Timeout => channel::timeout(env, ctx).await,
        BuiltinCommand::ClearChat => channel::clear_chat(env).await,
    }
}

/// Configured command prefix.
fn prefix(env: &ExecutionEnv) -> String {
    env.config.get().chat.prefix.clone()
}

/// Strips the command prefix from a name typed as an argument.
fn bare_name<'a>(name: &'a str, prefix: &str) -> &'a str {
    name.strip_prefix(prefix).unwrap_or(name)
}
