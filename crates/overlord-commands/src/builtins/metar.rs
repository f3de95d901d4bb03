//! `!metar`: spoken decoding of a station's current METAR.

use super::{prefix, HandlerResult};
use crate::command::BuiltinCommand;
use crate::context::InvocationContext;
use crate::executor::ExecutionEnv;
use crate::traits::MetarReport;
use regex::Regex;
use std::sync::LazyLock;

static OBSERVATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{6}Z)\b").expect("valid observation regex"));

static WIND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{3}|VRB)(\d{2,3})(?:G(\d{2,3}))?KT\b").expect("valid wind regex")
});

static VISIBILITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("valid visibility regex"));

static ALTIMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bQ(\d{4})\b").expect("valid altimeter regex"));

static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(M?\d{2})/(M?\d{2})\b").expect("valid temperature regex")
});

const UNKNOWN: &str = "Unknown";

/// Reads a raw METAR aloud field by field. Groups missing from the report
/// read as "Unknown".
pub fn format_metar(report: &MetarReport) -> String {
    let raw = report.raw_text.as_str();
    let observation = capture(&OBSERVATION, raw, 1).unwrap_or_else(|| UNKNOWN.to_string());
    let (direction, speed, gust) = match WIND.captures(raw) {
        Some(caps) => (
            caps[1].to_string(),
            caps[2].to_string(),
            caps.get(3).map_or_else(|| "N/A".to_string(), |m| m.as_str().to_string()),
        ),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string(), "N/A".to_string()),
    };
    let visibility = capture(&VISIBILITY, raw, 1).unwrap_or_else(|| UNKNOWN.to_string());
    let altimeter = capture(&ALTIMETER, raw, 1).unwrap_or_else(|| UNKNOWN.to_string());
    let temperature = capture(&TEMPERATURE, raw, 1).map_or_else(|| UNKNOWN.to_string(), |t| celsius(&t));
    let dewpoint = capture(&TEMPERATURE, raw, 2).map_or_else(|| UNKNOWN.to_string(), |t| celsius(&t));

    let spoken_icao = report
        .icao
        .chars()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "METAR for {spoken_icao} at {observation} Zulu. : \
         Wind {direction} degrees at {speed} knots, gusts to {gust} knots. : \
         Visibility {visibility} meters. : \
         Altimeter {altimeter} hectopascals. : \
         Temperature {temperature} degrees Celsius, dewpoint {dewpoint} degrees Celsius."
    )
}

fn capture(re: &Regex, raw: &str, index: usize) -> Option<String> {
    re.captures(raw)
        .and_then(|caps| caps.get(index))
        .map(|m| m.as_str().to_string())
}

/// METAR writes sub-zero temperatures with a leading `M`.
fn celsius(group: &str) -> String {
    let (negative, digits) = match group.strip_prefix('M') {
        Some(digits) => (true, digits),
        None => (false, group),
    };
    match digits.parse::<i32>() {
        Ok(value) if negative && value != 0 => format!("-{value}"),
        Ok(value) => value.to_string(),
        Err(_) => group.to_string(),
    }
}

pub(super) async fn metar(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let Some(icao) = ctx.args.first().map(|a| a.to_uppercase()) else {
        return Ok(BuiltinCommand::Metar.usage().replace('!', &prefix(env)));
    };
    match env.services.metar.metar(&icao).await? {
        Some(report) => {
            let text = format_metar(&report);
            env.speak_best_effort(&text).await;
            Ok(text)
        }
        None => Ok(format!("Could not retrieve METAR for {icao}.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExecutionError, ServiceError};
    use crate::test_support::TestHarness;
    use overlord_common::test_utils::chat_fixtures::viewer_message;
    use overlord_config::Config;

    fn report(icao: &str, raw: &str) -> MetarReport {
        MetarReport {
            icao: icao.to_string(),
            raw_text: raw.to_string(),
        }
    }

    #[test]
    fn test_format_full_report() {
        let text = format_metar(&report(
            "EGLL",
            "EGLL 121450Z 27015G25KT 9999 FEW040 18/09 Q1013 NOSIG",
        ));
        assert_eq!(
            text,
            "METAR for E G L L at 121450Z Zulu. : Wind 270 degrees at 15 knots, gusts to 25 knots. : \
             Visibility 9999 meters. : Altimeter 1013 hectopascals. : \
             Temperature 18 degrees Celsius, dewpoint 9 degrees Celsius."
        );
    }

    #[test]
    fn test_format_negative_temperatures_and_variable_wind() {
        let text = format_metar(&report("ENGM", "ENGM 050920Z VRB03KT 0800 FG M02/M03 Q1021"));
        assert!(text.contains("Wind VRB degrees at 03 knots, gusts to N/A knots."));
        assert!(text.contains("Visibility 0800 meters."));
        assert!(text.contains("Temperature -2 degrees Celsius, dewpoint -3 degrees Celsius."));
    }

    #[test]
    fn test_format_missing_groups_read_unknown() {
        let text = format_metar(&report("KJFK", "KJFK 121451Z 10SM CLR A2992"));
        assert!(text.starts_with("METAR for K J F K at 121451Z Zulu."));
        assert!(text.contains("Wind Unknown degrees at Unknown knots, gusts to N/A knots."));
        assert!(text.contains("Visibility Unknown meters."));
        assert!(text.contains("Altimeter Unknown hectopascals."));
        assert!(text.contains("Temperature Unknown degrees Celsius, dewpoint Unknown degrees Celsius."));
    }

    #[tokio::test]
    async fn test_metar_command_speaks_report() {
        let mut config = Config::default();
        config.speech.enabled = true;
        let harness = TestHarness::with_config(config).await;
        harness
            .metar
            .add_report("EGLL", "EGLL 121450Z 27015KT 9999 18/09 Q1013");

        let reply = harness.run(&viewer_message("a", "!metar egll")).await.unwrap();
        assert!(reply.starts_with("METAR for E G L L at 121450Z Zulu."));
        assert_eq!(harness.metar.requested(), vec!["EGLL".to_string()]);
        assert_eq!(harness.speech.spoken(), vec![reply]);
    }

    #[tokio::test]
    async fn test_metar_unknown_station_and_usage() {
        let harness = TestHarness::new().await;
        assert_eq!(
            harness.run(&viewer_message("a", "!metar zzzz")).await.unwrap(),
            "Could not retrieve METAR for ZZZZ."
        );
        assert_eq!(
            harness.run(&viewer_message("b", "!metar")).await.unwrap(),
            "Usage: !metar <ICAO_CODE>"
        );
    }

    #[tokio::test]
    async fn test_metar_provider_failure_is_retried_once() {
        let harness = TestHarness::new().await;
        harness
            .metar
            .set_failure(ServiceError::Unavailable("checkwx down".to_string()));
        let err = harness.run(&viewer_message("a", "!metar EGLL")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::UpstreamFailure(ServiceError::Unavailable(_))));
        assert_eq!(harness.metar.requested().len(), 2);
    }
}
