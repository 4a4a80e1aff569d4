use std::collections::BTreeMap;

use async_trait::async_trait;
use reloj_shared::api::{
    AlarmDto, CityTimeDto, EnvDto, NewAlarmReq, StopwatchDto, TimerDto, rest,
};

use crate::AppError;
use crate::config::normalize_server_url;

/// Everything the widgets need from the clock backend.
#[async_trait]
pub trait ClockBackend: Send + Sync {
    async fn list_alarms(&self) -> Result<Vec<AlarmDto>, AppError>;
    async fn create_alarm(&self, req: &NewAlarmReq) -> Result<AlarmDto, AppError>;
    async fn delete_alarm(&self, id: i64) -> Result<(), AppError>;

    async fn stopwatch_state(&self) -> Result<StopwatchDto, AppError>;
    async fn stopwatch_start(&self) -> Result<StopwatchDto, AppError>;
    async fn stopwatch_stop(&self) -> Result<StopwatchDto, AppError>;
    async fn stopwatch_reset(&self) -> Result<StopwatchDto, AppError>;

    async fn timer_state(&self) -> Result<TimerDto, AppError>;
    async fn timer_start(&self, duration_secs: u64) -> Result<TimerDto, AppError>;
    async fn timer_stop(&self) -> Result<TimerDto, AppError>;
    async fn timer_reset(&self) -> Result<TimerDto, AppError>;

    async fn world_clock(&self) -> Result<BTreeMap<String, CityTimeDto>, AppError>;
    async fn world_cities(&self) -> Result<Vec<String>, AppError>;
    async fn city_time(&self, city: &str) -> Result<CityTimeDto, AppError>;

    async fn env_clock(&self, city: &str) -> Result<EnvDto, AppError>;
}

/// [`ClockBackend`] over the backend's JSON endpoints.
#[derive(Debug, Clone)]
pub struct RestBackend {
    base: String,
}

impl RestBackend {
    pub fn new(server_url: &str) -> Self {
        Self {
            base: normalize_server_url(server_url),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

fn http(what: &str) -> impl FnOnce(rest::RestError) -> AppError + '_ {
    move |e| AppError::Http(format!("{what}: {e}"))
}

#[async_trait]
impl ClockBackend for RestBackend {
    async fn list_alarms(&self) -> Result<Vec<AlarmDto>, AppError> {
        rest::list_alarms(&self.base)
            .await
            .map_err(http("list alarms"))
    }

    async fn create_alarm(&self, req: &NewAlarmReq) -> Result<AlarmDto, AppError> {
        rest::create_alarm(&self.base, req)
            .await
            .map_err(http("create alarm"))
    }

    async fn delete_alarm(&self, id: i64) -> Result<(), AppError> {
        rest::delete_alarm(&self.base, id)
            .await
            .map_err(http("delete alarm"))
    }

    async fn stopwatch_state(&self) -> Result<StopwatchDto, AppError> {
        rest::stopwatch_state(&self.base)
            .await
            .map_err(http("read stopwatch"))
    }

    async fn stopwatch_start(&self) -> Result<StopwatchDto, AppError> {
        rest::stopwatch_start(&self.base)
            .await
            .map_err(http("start stopwatch"))
    }

    async fn stopwatch_stop(&self) -> Result<StopwatchDto, AppError> {
        rest::stopwatch_stop(&self.base)
            .await
            .map_err(http("stop stopwatch"))
    }

    async fn stopwatch_reset(&self) -> Result<StopwatchDto, AppError> {
        rest::stopwatch_reset(&self.base)
            .await
            .map_err(http("reset stopwatch"))
    }

    async fn timer_state(&self) -> Result<TimerDto, AppError> {
        rest::timer_state(&self.base)
            .await
            .map_err(http("read timer"))
    }

    async fn timer_start(&self, duration_secs: u64) -> Result<TimerDto, AppError> {
        rest::timer_start(&self.base, duration_secs)
            .await
            .map_err(http("start timer"))
    }

    async fn timer_stop(&self) -> Result<TimerDto, AppError> {
        rest::timer_stop(&self.base)
            .await
            .map_err(http("stop timer"))
    }

    async fn timer_reset(&self) -> Result<TimerDto, AppError> {
        rest::timer_reset(&self.base)
            .await
            .map_err(http("reset timer"))
    }

    async fn world_clock(&self) -> Result<BTreeMap<String, CityTimeDto>, AppError> {
        rest::world_clock(&self.base)
            .await
            .map_err(http("read world clock"))
    }

    async fn world_cities(&self) -> Result<Vec<String>, AppError> {
        rest::world_cities(&self.base)
            .await
            .map(|c| c.cities)
            .map_err(http("list cities"))
    }

    async fn city_time(&self, city: &str) -> Result<CityTimeDto, AppError> {
        rest::city_time(&self.base, city)
            .await
            .map_err(http("read city time"))
    }

    async fn env_clock(&self, city: &str) -> Result<EnvDto, AppError> {
        rest::env_clock(&self.base, city)
            .await
            .map_err(http("read environment"))
    }
}
