//! Tick-level decision logic for the alarm and timer notifiers.
//!
//! Both watchers are plain state machines: the widget controllers feed them a
//! fresh snapshot on every tick and act on what they return. Nothing here
//! touches the network or the clock, so every transition can be driven
//! directly from tests.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use reloj_shared::api::{AlarmDto, TimerDto};
use tracing::debug;

use crate::AppError;

/// Wall-clock time of day an alarm rings at, parsed from `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmTime {
    hour: u32,
    minute: u32,
}

impl AlarmTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, AppError> {
        if hour > 23 || minute > 59 {
            return Err(AppError::Invalid(format!(
                "alarm time {hour:02}:{minute:02} out of range"
            )));
        }
        Ok(Self { hour, minute })
    }

    /// Scheduled instant on `day`, seconds zeroed.
    pub fn on(self, day: NaiveDate) -> NaiveDateTime {
        // hour/minute were range-checked on construction
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN);
        day.and_time(time)
    }
}

impl FromStr for AlarmTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::Invalid(format!("expected HH:MM, got {s:?}"));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u32>().map_err(|_| invalid())?;
        let minute = m.parse::<u32>().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Dedup token: one alarm may ring once per calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FiredKey {
    pub alarm_id: i64,
    pub day: NaiveDate,
}

/// An alarm that became due on this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueAlarm {
    pub alarm_id: i64,
    pub label: Option<String>,
    pub scheduled: NaiveDateTime,
}

#[derive(Debug)]
pub struct AlarmWatch {
    tolerance: TimeDelta,
    fired: HashSet<FiredKey>,
}

impl AlarmWatch {
    pub fn new(tolerance: Duration) -> Self {
        Self {
            tolerance: TimeDelta::from_std(tolerance).unwrap_or(TimeDelta::seconds(1)),
            fired: HashSet::new(),
        }
    }

    /// Runs one tick against the cached alarm list and returns the alarms
    /// that must ring now. Keys from previous days are dropped first.
    pub fn check(&mut self, alarms: &[AlarmDto], now: NaiveDateTime) -> Vec<DueAlarm> {
        let today = now.date();
        self.fired.retain(|k| k.day == today);

        let mut due = Vec::new();
        for alarm in alarms.iter().filter(|a| a.active) {
            let time = match alarm.time.parse::<AlarmTime>() {
                Ok(t) => t,
                Err(e) => {
                    debug!(alarm_id = alarm.id, error=%e, "skipping alarm with unparsable time");
                    continue;
                }
            };
            let key = FiredKey {
                alarm_id: alarm.id,
                day: today,
            };
            if self.fired.contains(&key) {
                continue;
            }
            let scheduled = time.on(today);
            if (now - scheduled).abs() <= self.tolerance {
                self.fired.insert(key);
                due.push(DueAlarm {
                    alarm_id: alarm.id,
                    label: alarm.label().map(str::to_string),
                    scheduled,
                });
            }
        }
        due
    }

    pub fn has_fired(&self, alarm_id: i64, day: NaiveDate) -> bool {
        self.fired.contains(&FiredKey { alarm_id, day })
    }

    pub fn fired_keys(&self) -> impl Iterator<Item = &FiredKey> {
        self.fired.iter()
    }
}

/// Outcome of feeding one timer snapshot to [`TimerWatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerObservation {
    /// Remaining time crossed from positive to zero on this snapshot.
    pub finished: bool,
    /// Backend still reports the countdown as running.
    pub keep_polling: bool,
}

#[derive(Debug, Default)]
pub struct TimerWatch {
    last_remaining: Option<f64>,
}

impl TimerWatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, state: &TimerDto) -> TimerObservation {
        let finished =
            matches!(self.last_remaining, Some(prev) if prev > 0.0) && state.remaining <= 0.0;
        self.last_remaining = Some(state.remaining);
        TimerObservation {
            finished,
            keep_polling: state.running,
        }
    }

    /// Drops the previous-remaining memory so the next snapshot cannot count
    /// as a zero crossing. Used after explicit stop/reset.
    pub fn forget(&mut self) {
        self.last_remaining = None;
    }

    pub fn last_remaining(&self) -> Option<f64> {
        self.last_remaining
    }
}
