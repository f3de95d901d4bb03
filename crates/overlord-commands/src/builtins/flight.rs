//! Flight data commands and report formatting.

use super::HandlerResult;
use crate::executor::ExecutionEnv;
use crate::context::InvocationContext;
use crate::traits::{AirportInfo, FlightSnapshot};
use std::fmt;

/// Metres per second to knots.
pub const MS_TO_KNOTS: f64 = 1.943_844;
/// Metres to feet.
pub const METERS_TO_FEET: f64 = 3.280_84;
/// Metres per second to feet per minute.
pub const MS_TO_FPM: f64 = 196.85;
/// Hectopascals per inch of mercury.
pub const HPA_PER_INHG: f64 = 33.8639;

const INACTIVE: &str = "No active flight simulation detected. Please ensure the simulation is running.";

/// Phase of flight derived from height, vertical speed and ground speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    /// On the ground and stationary.
    Parked,
    /// On the ground and moving.
    Taxiing,
    /// Low and climbing.
    TakingOff,
    /// Low and descending.
    Landing,
    /// Low and level.
    GroundRoll,
    /// Climbing faster than 500 fpm.
    Climbing,
    /// Descending faster than 500 fpm.
    Descending,
    /// Level flight.
    Cruise,
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Parked => "Parked",
            Self::Taxiing => "Taxiing",
            Self::TakingOff => "Taking Off",
            Self::Landing => "Landing",
            Self::GroundRoll => "Ground Roll",
            Self::Climbing => "Climbing",
            Self::Descending => "Descending",
            Self::Cruise => "Cruise",
        };
        f.write_str(label)
    }
}

/// Derives the phase of flight.
pub fn flight_phase(snapshot: &FlightSnapshot) -> FlightPhase {
    let agl_ft = snapshot.altitude_above_ground * METERS_TO_FEET;
    let vs_fpm = snapshot.vertical_speed * MS_TO_FPM;
    let gs_kts = snapshot.ground_speed * MS_TO_KNOTS;

    if agl_ft < 1.0 {
        if gs_kts < 1.0 {
            FlightPhase::Parked
        } else {
            FlightPhase::Taxiing
        }
    } else if agl_ft < 50.0 {
        if vs_fpm > 100.0 {
            FlightPhase::TakingOff
        } else if vs_fpm < -100.0 {
            FlightPhase::Landing
        } else {
            FlightPhase::GroundRoll
        }
    } else if vs_fpm > 500.0 {
        FlightPhase::Climbing
    } else if vs_fpm < -500.0 {
        FlightPhase::Descending
    } else {
        FlightPhase::Cruise
    }
}

/// Formats an integer with comma thousands separators.
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[allow(clippy::cast_possible_truncation)]
fn whole(value: f64) -> i64 {
    value.round() as i64
}

/// Full status report.
pub fn format_status(s: &FlightSnapshot) -> String {
    let position = s.position.unwrap_or_default();
    let vs = whole(s.vertical_speed * MS_TO_FPM);
    let sign = if vs > 0 { "+" } else { "" };
    format!(
        "Flight Status Report: {phase}. Altitude: {alt} ft MSL ({agl} ft AGL). \
         Speed: {gs} knots ground speed, {tas} knots true airspeed. Heading: {hdg:.1}°. \
         Position: {lat:.4}°, {lon:.4}°. Wind: {wdir:.1}° at {wspd} knots. \
         Vertical Speed: {sign}{vs_text} feet per minute.",
        phase = flight_phase(s),
        alt = group_thousands(whole(s.indicated_altitude)),
        agl = group_thousands(whole(s.altitude_above_ground * METERS_TO_FEET)),
        gs = whole(s.ground_speed * MS_TO_KNOTS).max(0),
        tas = whole(s.true_airspeed * MS_TO_KNOTS).max(0),
        hdg = s.heading,
        lat = position.lat,
        lon = position.lon,
        wdir = s.wind_direction,
        wspd = whole(s.wind_speed * MS_TO_KNOTS),
        vs_text = group_thousands(vs),
    )
}

/// One-line status, also used for speech.
pub fn format_brief(s: &FlightSnapshot) -> String {
    format!(
        "{}: {} ft, {} knots",
        flight_phase(s),
        group_thousands(whole(s.indicated_altitude)),
        whole(s.ground_speed * MS_TO_KNOTS).max(0)
    )
}

/// Wind and pressure report.
pub fn format_weather(s: &FlightSnapshot) -> String {
    format!(
        "Weather Report: Wind {:03}° at {} knots. Pressure {:.2} inHg.",
        whole(s.wind_direction).rem_euclid(360),
        whole(s.wind_speed * MS_TO_KNOTS),
        s.sea_level_pressure / HPA_PER_INHG
    )
}

/// Aircraft coordinates, when known.
pub fn format_location(s: &FlightSnapshot) -> String {
    match s.position {
        Some(p) => format!("Current Location: Latitude {:.6}, Longitude {:.6}", p.lat, p.lon),
        None => "Location data not available.".to_string(),
    }
}

/// Airport summary.
pub fn format_airport(a: &AirportInfo) -> String {
    let mut out = format!(
        "Airport {}: {}. Elevation: {} feet.",
        a.ident,
        a.name,
        group_thousands(whole(a.elevation))
    );
    if !a.runways.is_empty() {
        let runways: Vec<String> = a
            .runways
            .iter()
            .map(|r| {
                format!(
                    "{}: {}, {}ft, HDG {}",
                    r.designator,
                    r.surface,
                    group_thousands(whole(r.length)),
                    whole(r.longest_runway_heading)
                )
            })
            .collect();
        out.push_str(&format!(" Runways: {}.", runways.join(", ")));
    }
    if let Some(atis) = a.com.get("ATIS:") {
        out.push_str(&format!(" ATIS {atis}."));
    }
    if let Some(tower) = a.com.get("Tower:") {
        out.push_str(&format!(" Tower {tower}."));
    }
    out
}

async fn active_snapshot(env: &ExecutionEnv) -> Result<Option<FlightSnapshot>, crate::error::ServiceError> {
    let snapshot = env.services.flight.fetch().await?;
    Ok(snapshot.active.then_some(snapshot))
}

pub(super) async fn status(env: &ExecutionEnv) -> HandlerResult {
    let Some(snapshot) = active_snapshot(env).await? else {
        return Ok(INACTIVE.to_string());
    };
    env.speak_best_effort(&format_brief(&snapshot)).await;
    Ok(format_status(&snapshot))
}

pub(super) async fn brief(env: &ExecutionEnv) -> HandlerResult {
    let Some(snapshot) = active_snapshot(env).await? else {
        return Ok("Flight systems inactive. Standby.".to_string());
    };
    let text = format_brief(&snapshot);
    env.speak_best_effort(&text).await;
    Ok(text)
}

pub(super) async fn weather(env: &ExecutionEnv) -> HandlerResult {
    let Some(snapshot) = active_snapshot(env).await? else {
        return Ok("Weather systems offline. Await reactivation.".to_string());
    };
    let text = format_weather(&snapshot);
    env.speak_best_effort(&text).await;
    Ok(text)
}

pub(super) async fn location(env: &ExecutionEnv) -> HandlerResult {
    let Some(snapshot) = active_snapshot(env).await? else {
        return Ok("Flight simulator is not active.".to_string());
    };
    Ok(format_location(&snapshot))
}

pub(super) async fn airport(env: &ExecutionEnv, ctx: &InvocationContext) -> HandlerResult {
    let Some(ident) = ctx.args.first().map(|a| a.to_uppercase()) else {
        return Ok(crate::command::BuiltinCommand::Airport.usage().to_string());
    };
    match env.services.flight.airport(&ident).await? {
        Some(info) => {
            let text = format_airport(&info);
            env.speak_best_effort(&text).await;
            Ok(text)
        }
        None => Ok(format!("No data found for airport {ident}. Verify identifier.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Position, Runway};

    fn snapshot(agl_m: f64, vs_ms: f64, gs_ms: f64) -> FlightSnapshot {
        FlightSnapshot {
            active: true,
            altitude_above_ground: agl_m,
            vertical_speed: vs_ms,
            ground_speed: gs_ms,
            ..FlightSnapshot::default()
        }
    }

    #[test]
    fn test_phases() {
        assert_eq!(flight_phase(&snapshot(0.0, 0.0, 0.0)), FlightPhase::Parked);
        assert_eq!(flight_phase(&snapshot(0.0, 0.0, 5.0)), FlightPhase::Taxiing);
        assert_eq!(flight_phase(&snapshot(5.0, 1.0, 70.0)), FlightPhase::TakingOff);
        assert_eq!(flight_phase(&snapshot(5.0, -1.0, 70.0)), FlightPhase::Landing);
        assert_eq!(flight_phase(&snapshot(5.0, 0.0, 70.0)), FlightPhase::GroundRoll);
        assert_eq!(flight_phase(&snapshot(1000.0, 3.0, 120.0)), FlightPhase::Climbing);
        assert_eq!(flight_phase(&snapshot(1000.0, -3.0, 120.0)), FlightPhase::Descending);
        assert_eq!(flight_phase(&snapshot(1000.0, 1.0, 120.0)), FlightPhase::Cruise);
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(35_000), "35,000");
        assert_eq!(group_thousands(-1_250), "-1,250");
        assert_eq!(group_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_brief() {
        let mut s = snapshot(3000.0, 0.0, 128.6);
        s.indicated_altitude = 35_000.4;
        assert_eq!(format_brief(&s), "Cruise: 35,000 ft, 250 knots");
    }

    #[test]
    fn test_weather() {
        let s = FlightSnapshot {
            wind_direction: 5.0,
            wind_speed: 10.0,
            sea_level_pressure: 1013.25,
            ..FlightSnapshot::default()
        };
        assert_eq!(
            format_weather(&s),
            "Weather Report: Wind 005° at 19 knots. Pressure 29.92 inHg."
        );
    }

    #[test]
    fn test_status_contains_fields() {
        let mut s = snapshot(1000.0, 5.08, 100.0);
        s.indicated_altitude = 4200.0;
        s.heading = 271.26;
        s.position = Some(Position { lat: 47.4502, lon: -122.3088 });
        let text = format_status(&s);
        assert!(text.starts_with("Flight Status Report: Climbing."));
        assert!(text.contains("Altitude: 4,200 ft MSL (3,281 ft AGL)"));
        assert!(text.contains("Heading: 271.3°"));
        assert!(text.contains("Position: 47.4502°, -122.3088°"));
        assert!(text.contains("Vertical Speed: +1,000 feet per minute."));
    }

    #[test]
    fn test_location() {
        let mut s = FlightSnapshot::default();
        assert_eq!(format_location(&s), "Location data not available.");
        s.position = Some(Position { lat: 1.5, lon: -2.25 });
        assert_eq!(
            format_location(&s),
            "Current Location: Latitude 1.500000, Longitude -2.250000"
        );
    }

    #[test]
    fn test_airport() {
        let mut info = AirportInfo {
            ident: "KSEA".to_string(),
            name: "Seattle-Tacoma Intl".to_string(),
            elevation: 433.0,
            runways: vec![Runway {
                designator: "16L/34R".to_string(),
                surface: "Concrete".to_string(),
                length: 11_901.0,
                longest_runway_heading: 163.0,
            }],
            ..AirportInfo::default()
        };
        info.com.insert("Tower:".to_string(), "119.9".to_string());
        assert_eq!(
            format_airport(&info),
            "Airport KSEA: Seattle-Tacoma Intl. Elevation: 433 feet. Runways: 16L/34R: Concrete, 11,901ft, HDG 163. Tower 119.9."
        );
    }

    mod handlers {
        use super::*;
        use crate::test_support::TestHarness;
        use overlord_common::test_utils::chat_fixtures::viewer_message;
        use overlord_config::Config;

        #[tokio::test]
        async fn test_inactive_simulator() {
            let harness = TestHarness::new().await;
            assert_eq!(harness.run(&viewer_message("a", "!status")).await.unwrap(), INACTIVE);
            assert_eq!(
                harness.run(&viewer_message("a", "!location")).await.unwrap(),
                "Flight simulator is not active."
            );
        }

        #[tokio::test]
        async fn test_status_speaks_brief() {
            let mut config = Config::default();
            config.speech.enabled = true;
            let harness = TestHarness::with_config(config).await;
            let mut s = snapshot(0.0, 0.0, 0.0);
            s.indicated_altitude = 433.0;
            harness.flight.set_snapshot(s);

            let reply = harness.run(&viewer_message("a", "!flightstatus")).await.unwrap();
            assert!(reply.starts_with("Flight Status Report: Parked."));
            assert_eq!(harness.speech.spoken(), vec!["Parked: 433 ft, 0 knots".to_string()]);
        }

        #[tokio::test]
        async fn test_airport_lookup() {
            let harness = TestHarness::new().await;
            harness.flight.add_airport(AirportInfo {
                ident: "EGLL".to_string(),
                name: "London Heathrow".to_string(),
                elevation: 83.0,
                ..AirportInfo::default()
            });
            assert_eq!(
                harness.run(&viewer_message("a", "!airport egll")).await.unwrap(),
                "Airport EGLL: London Heathrow. Elevation: 83 feet."
            );
            assert_eq!(
                harness.run(&viewer_message("a", "!airport zzzz")).await.unwrap(),
                "No data found for airport ZZZZ. Verify identifier."
            );
            assert_eq!(
                harness.run(&viewer_message("a", "!airport")).await.unwrap(),
                "Usage: !airport <ICAO>. Provide airport identifier."
            );
        }
    }
}
