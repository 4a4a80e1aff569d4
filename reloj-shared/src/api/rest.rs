//! Minimal REST client helpers for the clock backend.

use std::collections::BTreeMap;
use std::time::Duration;

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(90))
        // Bound request duration
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
});

fn mk_client() -> reqwest::Client {
    HTTP_CLIENT.clone()
}

async fn handle_json<T: for<'de> serde::Deserialize<'de>>(
    res: reqwest::Response,
) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

async fn handle_empty(res: reqwest::Response) -> Result<(), RestError> {
    if res.status().is_success() {
        Ok(())
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(RestError::Status { status, body })
    }
}

async fn get_json<T: for<'de> serde::Deserialize<'de>>(url: String) -> Result<T, RestError> {
    let res = mk_client()
        .get(url)
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

async fn post_json<B: serde::Serialize, T: for<'de> serde::Deserialize<'de>>(
    url: String,
    body: Option<&B>,
) -> Result<T, RestError> {
    let mut req = mk_client().post(url);
    if let Some(b) = body {
        req = req.json(b);
    }
    let res = req
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_json(res).await
}

pub async fn list_alarms(base: &str) -> Result<Vec<AlarmDto>, RestError> {
    get_json(ep::alarms(base)).await
}

pub async fn create_alarm(base: &str, req: &NewAlarmReq) -> Result<AlarmDto, RestError> {
    post_json(ep::alarms(base), Some(req)).await
}

pub async fn delete_alarm(base: &str, id: i64) -> Result<(), RestError> {
    let res = mk_client()
        .delete(ep::alarm(base, id))
        .send()
        .await
        .map_err(|e| RestError::Http(e.to_string()))?;
    handle_empty(res).await
}

pub async fn stopwatch_state(base: &str) -> Result<StopwatchDto, RestError> {
    get_json(ep::stopwatch(base)).await
}

pub async fn stopwatch_start(base: &str) -> Result<StopwatchDto, RestError> {
    post_json::<(), _>(ep::stopwatch_start(base), None).await
}

pub async fn stopwatch_stop(base: &str) -> Result<StopwatchDto, RestError> {
    post_json::<(), _>(ep::stopwatch_stop(base), None).await
}

pub async fn stopwatch_reset(base: &str) -> Result<StopwatchDto, RestError> {
    post_json::<(), _>(ep::stopwatch_reset(base), None).await
}

pub async fn timer_state(base: &str) -> Result<TimerDto, RestError> {
    get_json(ep::timer(base)).await
}

pub async fn timer_start(base: &str, duration_secs: u64) -> Result<TimerDto, RestError> {
    let body = TimerStartReq {
        duration: duration_secs,
    };
    post_json(ep::timer_start(base), Some(&body)).await
}

pub async fn timer_stop(base: &str) -> Result<TimerDto, RestError> {
    post_json::<(), _>(ep::timer_stop(base), None).await
}

pub async fn timer_reset(base: &str) -> Result<TimerDto, RestError> {
    post_json::<(), _>(ep::timer_reset(base), None).await
}

pub async fn world_clock(base: &str) -> Result<BTreeMap<String, CityTimeDto>, RestError> {
    get_json(ep::world_clock(base)).await
}

pub async fn world_cities(base: &str) -> Result<CitiesDto, RestError> {
    get_json(ep::world_cities(base)).await
}

pub async fn city_time(base: &str, city: &str) -> Result<CityTimeDto, RestError> {
    get_json(ep::world_city(base, city)).await
}

pub async fn env_clock(base: &str, city: &str) -> Result<EnvDto, RestError> {
    get_json(ep::env_clock(base, city)).await
}
