//! Speech commands: `!say`, `!tts`, `!ttsstatus` and `!ttsqueue`.

use super::{prefix, HandlerResult};
use crate::command::BuiltinCommand;
use crate::context::InvocationContext;
use crate::executor::ExecutionEnv;
use tracing::{info, warn};

const SPEED_RANGE: std::ops::RangeInclusive<f32> = 0.25..=3.0;
const VOLUME_RANGE: std::ops::RangeInclusive<f32> = 0.0..=1.0;

pub(super) async fn say(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    if ctx.arg_text.is_empty() {
        return Ok(BuiltinCommand::Say.usage().replace('!', &prefix(env)));
    }
    env.speak_best_effort(&ctx.arg_text).await;
    Ok(ctx.arg_text.clone())
}

pub(super) fn tts(env: &ExecutionEnv, ctx: &InvocationContext) -> String {
    let usage = || BuiltinCommand::Tts.usage().replace('!', &prefix(env));
    let [setting, value, ..] = ctx.args.as_slice() else {
        return usage();
    };
    let setting = setting.to_lowercase();
    let mut voice = env.voice.write();
    match setting.as_str() {
        "voice" => voice.voice.clone_from(value),
        "speed" => match value.parse::<f32>() {
            Ok(speed) if SPEED_RANGE.contains(&speed) => voice.speed = speed,
            _ => {
                return format!(
                    "TTS update failed. Speed must be between {} and {}.",
                    SPEED_RANGE.start(),
                    SPEED_RANGE.end()
                )
            }
        },
        "volume" => match value.parse::<f32>() {
            Ok(volume) if VOLUME_RANGE.contains(&volume) => voice.volume = volume,
            _ => return "TTS update failed. Volume must be between 0 and 1.".to_string(),
        },
        _ => {
            drop(voice);
            return usage();
        }
    }
    info!(user = %ctx.login, %setting, %value, "Voice settings changed");
    format!("TTS {setting} updated to {value}. Adjustments complete.")
}

pub(super) fn tts_status(env: &ExecutionEnv) -> String {
    let enabled = env.config.get().speech.enabled;
    let voice = env.voice.read();
    format!(
        "TTS Status: {}. Current Voice: {}. Speed: {}. Volume: {}.",
        if enabled { "Enabled" } else { "Disabled" },
        voice.voice,
        voice.speed,
        voice.volume
    )
}

pub(super) async fn tts_queue(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    match ctx.args.first().map(|a| a.to_lowercase()).as_deref() {
        Some("clear") => match env.services.speech.clear_queue().await {
            Ok(()) => {
                info!(user = %ctx.login, "Speech queue cleared");
                Ok("TTS queue cleared.".to_string())
            }
            Err(e) => {
                warn!("Failed to clear speech queue: {}", e);
                Ok("Failed to clear TTS queue.".to_string())
            }
        },
        _ => Ok(BuiltinCommand::TtsQueue.usage().replace('!', &prefix(env))),
    }
}
