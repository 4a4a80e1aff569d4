use std::fmt;

use reloj_shared::api::{AlarmDto, CityTimeDto, EnvDto, StopwatchDto, TimerDto};

/// `MM:SS`, floored. Negative and non-finite input renders as `00:00`.
pub fn format_mmss(seconds: f64) -> String {
    let total = whole_seconds(seconds);
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// `HH:MM:SS.t` with tenths of a second, floored.
pub fn format_hhmmss_tenths(seconds: f64) -> String {
    let tenths = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 10.0).floor() as u64
    } else {
        0
    };
    let secs = tenths / 10;
    format!(
        "{:02}:{:02}:{:02}.{}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        tenths % 10
    )
}

fn whole_seconds(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPhase {
    Day,
    Night,
}

impl DayPhase {
    pub fn is_day(self) -> bool {
        self == DayPhase::Day
    }
}

impl fmt::Display for DayPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayPhase::Day => f.write_str("day"),
            DayPhase::Night => f.write_str("night"),
        }
    }
}

/// Day runs from 06:00 up to, not including, 18:00.
pub fn day_phase(hour: u32) -> DayPhase {
    if (6..18).contains(&hour) {
        DayPhase::Day
    } else {
        DayPhase::Night
    }
}

pub fn render_alarm(alarm: &AlarmDto) -> String {
    let mut line = format!("#{:<14} {}", alarm.id, alarm.time);
    if let Some(label) = alarm.label() {
        line.push_str("  ");
        line.push_str(label);
    }
    if !alarm.active {
        line.push_str("  (off)");
    }
    line
}

pub fn render_timer(state: &TimerDto) -> String {
    let status = if state.running { "running" } else { "stopped" };
    format!("{}  [{}]", format_mmss(state.remaining), status)
}

pub fn render_stopwatch(state: &StopwatchDto) -> String {
    let status = if state.running { "running" } else { "stopped" };
    format!("{}  [{}]", format_hhmmss_tenths(state.elapsed), status)
}

pub fn render_city(city: &CityTimeDto) -> String {
    match &city.utc_offset {
        Some(offset) => format!(
            "{:<16} {}  {}  {} ({})",
            city.city, city.time, city.date, city.timezone, offset
        ),
        None => format!(
            "{:<16} {}  {}  {}",
            city.city, city.time, city.date, city.timezone
        ),
    }
}

pub fn render_env(env: &EnvDto, offline: bool) -> String {
    let phase = if env.is_day {
        DayPhase::Day
    } else {
        DayPhase::Night
    };
    let mut out = format!(
        "{} {}  {} {}  ({})\n{} {}  {}",
        env.city, env.time, env.date, env.timezone, phase, env.weather_emoji, env.weather,
        env.temperature
    );
    if !env.description.is_empty() {
        out.push_str(&format!("\n{}", env.description));
    }
    if !env.humidity.is_empty() || !env.wind_speed.is_empty() {
        out.push_str(&format!(
            "\nhumidity {}  wind {}",
            env.humidity, env.wind_speed
        ));
    }
    if offline {
        out.push_str("\noffline: showing local data; run again to retry the backend");
    }
    out
}
