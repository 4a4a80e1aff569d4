use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use reloj_shared::api::CityTimeDto;
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use super::Poller;
use crate::AppError;
use crate::backend::ClockBackend;

struct Inner {
    backend: Arc<dyn ClockBackend>,
    selected: Mutex<Vec<String>>,
    times_tx: watch::Sender<Vec<CityTimeDto>>,
}

impl Inner {
    /// Reads every selected city; cities that fail are logged and left out.
    async fn refresh(&self) -> Vec<CityTimeDto> {
        let cities = self.selected.lock().await.clone();
        let mut times = Vec::with_capacity(cities.len());
        for city in &cities {
            match self.backend.city_time(city).await {
                Ok(t) => times.push(t),
                Err(e) => warn!(city=%city, error=%e, "world clock read failed"),
            }
        }
        self.times_tx.send_replace(times.clone());
        times
    }
}

/// Time in a user-selected set of cities.
pub struct WorldClockWidget {
    inner: Arc<Inner>,
    poller: Poller,
}

impl WorldClockWidget {
    pub fn new(backend: Arc<dyn ClockBackend>, cities: Vec<String>, refresh: Duration) -> Self {
        let (times_tx, _) = watch::channel(Vec::new());
        let mut selected: Vec<String> = Vec::with_capacity(cities.len());
        for c in cities {
            if !selected.contains(&c) {
                selected.push(c);
            }
        }
        Self {
            inner: Arc::new(Inner {
                backend,
                selected: Mutex::new(selected),
                times_tx,
            }),
            poller: Poller::new("worldclock", refresh),
        }
    }

    pub async fn available_cities(&self) -> Result<Vec<String>, AppError> {
        self.inner.backend.world_cities().await
    }

    /// Adds a city to the selection. Unknown cities are rejected when the
    /// backend's city list can be read; otherwise the city is accepted as is.
    pub async fn add_city(&self, city: &str) -> Result<bool, AppError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(AppError::Invalid("city name is empty".into()));
        }
        match self.available_cities().await {
            Ok(known) if !known.iter().any(|k| k == city) => {
                return Err(AppError::Invalid(format!("unknown city {city:?}")));
            }
            Ok(_) => {}
            Err(e) => debug!(error=%e, "city list unavailable; skipping validation"),
        }
        let mut selected = self.inner.selected.lock().await;
        if selected.iter().any(|c| c == city) {
            return Ok(false);
        }
        selected.push(city.to_string());
        Ok(true)
    }

    pub async fn remove_city(&self, city: &str) -> bool {
        let mut selected = self.inner.selected.lock().await;
        let before = selected.len();
        selected.retain(|c| c != city);
        selected.len() != before
    }

    pub async fn selected(&self) -> Vec<String> {
        self.inner.selected.lock().await.clone()
    }

    pub async fn refresh(&self) -> Vec<CityTimeDto> {
        self.inner.refresh().await
    }

    /// Every city the backend knows, in one request.
    pub async fn all(&self) -> Result<BTreeMap<String, CityTimeDto>, AppError> {
        self.inner.backend.world_clock().await
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<CityTimeDto>> {
        self.inner.times_tx.subscribe()
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
