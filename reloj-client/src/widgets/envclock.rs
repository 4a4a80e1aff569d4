use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use reloj_shared::api::EnvDto;
use tokio::sync::{Mutex, watch};
use tracing::warn;

use super::{LocalClock, Poller, system_clock};
use crate::backend::ClockBackend;
use crate::display::day_phase;

/// Environment snapshot for one city. `offline` marks locally computed data
/// used while the backend is unreachable.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvReport {
    pub data: EnvDto,
    pub offline: bool,
}

/// Local stand-in for [`EnvDto`] built from the machine clock alone.
pub fn offline_report(city: &str, now: NaiveDateTime) -> EnvDto {
    let is_day = day_phase(now.hour()).is_day();
    EnvDto {
        city: city.to_string(),
        time: now.format("%H:%M:%S").to_string(),
        date: now.format("%d/%m/%Y").to_string(),
        timezone: "Local".to_string(),
        is_day,
        weather: if is_day { "sunny" } else { "clear" }.to_string(),
        weather_emoji: if is_day { "☀️" } else { "🌙" }.to_string(),
        temperature: "--".to_string(),
        humidity: "--".to_string(),
        wind_speed: "--".to_string(),
        description: "Simulated locally".to_string(),
        time_success: false,
        weather_success: false,
    }
}

struct Inner {
    backend: Arc<dyn ClockBackend>,
    clock: LocalClock,
    city: Mutex<String>,
    report_tx: watch::Sender<Option<EnvReport>>,
}

impl Inner {
    async fn refresh(&self) -> EnvReport {
        let city = self.city.lock().await.clone();
        let report = match self.backend.env_clock(&city).await {
            Ok(data) => EnvReport {
                data,
                offline: false,
            },
            Err(e) => {
                warn!(city=%city, error=%e, "environment read failed; showing offline data");
                EnvReport {
                    data: offline_report(&city, (self.clock)()),
                    offline: true,
                }
            }
        };
        self.report_tx.send_replace(Some(report.clone()));
        report
    }
}

/// Time and weather for one selected city.
pub struct EnvClockWidget {
    inner: Arc<Inner>,
    poller: Poller,
}

impl EnvClockWidget {
    pub fn new(backend: Arc<dyn ClockBackend>, city: String, refresh: Duration) -> Self {
        Self::with_clock(backend, city, refresh, system_clock())
    }

    pub fn with_clock(
        backend: Arc<dyn ClockBackend>,
        city: String,
        refresh: Duration,
        clock: LocalClock,
    ) -> Self {
        let (report_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                backend,
                clock,
                city: Mutex::new(city),
                report_tx,
            }),
            poller: Poller::new("envclock", refresh),
        }
    }

    /// Never fails: an unreachable backend yields an offline report.
    pub async fn refresh(&self) -> EnvReport {
        self.inner.refresh().await
    }

    pub async fn set_city(&self, city: &str) -> EnvReport {
        *self.inner.city.lock().await = city.trim().to_string();
        self.inner.refresh().await
    }

    pub async fn city(&self) -> String {
        self.inner.city.lock().await.clone()
    }

    pub fn latest(&self) -> Option<EnvReport> {
        self.inner.report_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<EnvReport>> {
        self.inner.report_tx.subscribe()
    }

    pub async fn start(&self) -> bool {
        let inner = self.inner.clone();
        self.poller
            .start(move || {
                let inner = inner.clone();
                async move {
                    inner.refresh().await;
                    ControlFlow::Continue(())
                }
            })
            .await
    }

    pub async fn stop(&self) -> bool {
        self.poller.stop().await
    }
}
