use serde::{Deserialize, Serialize};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_PREFIX: &str = "/api";

// Alarms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmDto {
    pub id: i64,
    /// Local wall-clock time, `HH:MM`.
    pub time: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl AlarmDto {
    /// Label with empty strings folded into `None`.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlarmReq {
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

// Stopwatch
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StopwatchDto {
    pub running: bool,
    /// Elapsed seconds, fractional.
    pub elapsed: f64,
}

// Timer
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimerDto {
    pub running: bool,
    /// Remaining seconds, fractional.
    pub remaining: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimerStartReq {
    /// Countdown length in seconds.
    pub duration: u64,
}

// World clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityTimeDto {
    pub city: String,
    /// `HH:MM:SS` in the city's zone.
    pub time: String,
    pub date: String,
    pub timezone: String,
    #[serde(default)]
    pub utc_offset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitiesDto {
    pub cities: Vec<String>,
}

// Environment clock
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvDto {
    pub city: String,
    pub time: String,
    pub date: String,
    pub timezone: String,
    pub is_day: bool,
    pub weather: String,
    pub weather_emoji: String,
    pub temperature: String,
    pub humidity: String,
    pub wind_speed: String,
    pub description: String,
    pub time_success: bool,
    pub weather_success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_defaults_missing_fields() {
        let a: AlarmDto = serde_json::from_str(r#"{"id":7,"time":"07:30"}"#).unwrap();
        assert_eq!(a.id, 7);
        assert!(a.active);
        assert_eq!(a.label(), None);
    }

    #[test]
    fn empty_label_is_none() {
        let a: AlarmDto =
            serde_json::from_str(r#"{"id":1,"time":"07:30","label":"  ","active":false}"#)
                .unwrap();
        assert_eq!(a.label(), None);
        assert!(!a.active);
    }

    #[test]
    fn env_accepts_partial_payload() {
        let e: EnvDto = serde_json::from_str(r#"{"is_day":true,"weather":"soleado"}"#).unwrap();
        assert!(e.is_day);
        assert_eq!(e.weather, "soleado");
        assert!(e.city.is_empty());
        assert!(!e.weather_success);
    }
}
