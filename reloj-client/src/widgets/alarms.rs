use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use reloj_shared::api::{AlarmDto, NewAlarmReq};
use tokio::sync::{Mutex, watch};
use tokio::time::Instant;
use tracing::{info, warn};

use super::{LocalClock, Poller, system_clock};
use crate::AppError;
use crate::backend::ClockBackend;
use crate::notify::{Notification, NotificationSink};
use crate::watch::{AlarmTime, AlarmWatch};

#[derive(Debug, Clone, Copy)]
pub struct AlarmSettings {
    pub tick: Duration,
    pub tolerance: Duration,
    pub refresh: Duration,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            tolerance: Duration::from_millis(1000),
            refresh: Duration::from_secs(30),
        }
    }
}

struct Inner {
    backend: Arc<dyn ClockBackend>,
    sink: Arc<dyn NotificationSink>,
    clock: LocalClock,
    list_tx: watch::Sender<Vec<AlarmDto>>,
    watch: Mutex<AlarmWatch>,
    last_refresh: Mutex<Option<Instant>>,
    refresh_every: Duration,
}

impl Inner {
    async fn refresh(&self) -> Result<Vec<AlarmDto>, AppError> {
        let alarms = self.backend.list_alarms().await?;
        *self.last_refresh.lock().await = Some(Instant::now());
        self.list_tx.send_replace(alarms.clone());
        Ok(alarms)
    }

    async fn tick(&self) {
        let stale = self
            .last_refresh
            .lock()
            .await
            .is_none_or(|at| at.elapsed() >= self.refresh_every);
        if stale && let Err(e) = self.refresh().await {
            warn!(error=%e, "alarm list refresh failed; checking cached list");
        }

        let alarms = self.list_tx.borrow().clone();
        let now = (self.clock)();
        let due = self.watch.lock().await.check(&alarms, now);
        for alarm in due {
            info!(alarm_id = alarm.alarm_id, scheduled=%alarm.scheduled, "alarm due");
            self.sink
                .notify(&Notification::alarm(alarm.label.as_deref()))
                .await;
        }
    }
}

/// Alarm list plus the once-per-second checker that rings due alarms.
pub struct AlarmsWidget {
    inner: Arc<Inner>,
    checker: Poller,
}

impl AlarmsWidget {
    pub fn new(
        backend: Arc<dyn ClockBackend>,
        sink: Arc<dyn NotificationSink>,
        settings: AlarmSettings,
    ) -> Self {
        Self::with_clock(backend, sink, settings, system_clock())
    }

    pub fn with_clock(
        backend: Arc<dyn ClockBackend>,
        sink: Arc<dyn NotificationSink>,
        settings: AlarmSettings,
        clock: LocalClock,
    ) -> Self {
        let (list_tx, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                backend,
                sink,
                clock,
                list_tx,
                watch: Mutex::new(AlarmWatch::new(settings.tolerance)),
                last_refresh: Mutex::new(None),
                refresh_every: settings.refresh,
            }),
            checker: Poller::new("alarms", settings.tick),
        }
    }

    /// Re-fetches the alarm list into the cache.
    pub async fn refresh(&self) -> Result<Vec<AlarmDto>, AppError> {
        self.inner.refresh().await
    }

    /// Cached alarm list as of the last successful refresh.
    pub fn alarms(&self) -> Vec<AlarmDto> {
        self.inner.list_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<AlarmDto>> {
        self.inner.list_tx.subscribe()
    }

    pub async fn add(&self, time: &str, label: Option<String>) -> Result<AlarmDto, AppError> {
        let time: AlarmTime = time.parse()?;
        let req = NewAlarmReq {
            time: time.to_string(),
            label: label.filter(|l| !l.trim().is_empty()),
        };
        let created = self.inner.backend.create_alarm(&req).await?;
        info!(alarm_id = created.id, time=%created.time, "alarm created");
        if let Err(e) = self.inner.refresh().await {
            warn!(error=%e, "alarm list refresh after create failed");
        }
        Ok(created)
    }

    pub async fn remove(&self, id: i64) -> Result<(), AppError> {
        self.inner.backend.delete_alarm(id).await?;
        info!(alarm_id = id, "alarm deleted");
        if let Err(e) = self.inner.refresh().await {
            warn!(error=%e, "alarm list refresh after delete failed");
        }
        Ok(())
    }

    /// Starts the checker. Safe to call repeatedly.
    pub async fn start(&self) -> bool {
        let inner = self.inner.clone();
        self.checker
            .start(move || {
                let inner = inner.clone();
                async move {
                    inner.tick().await;
                    ControlFlow::Continue(())
                }
            })
            .await
    }

    pub async fn stop(&self) -> bool {
        self.checker.stop().await
    }

    pub async fn is_checking(&self) -> bool {
        self.checker.is_running().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::notify::NotificationKind;
    use crate::widgets::test_support::{FakeBackend, RecordingSink};

    fn fixed_clock(at: NaiveDateTime) -> LocalClock {
        Arc::new(move || at)
    }

    fn seven_thirty() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(7, 30, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn add_validates_and_refreshes_cache() {
        let backend = Arc::new(FakeBackend::default());
        let sink = Arc::new(RecordingSink::default());
        let w = AlarmsWidget::new(backend.clone(), sink, AlarmSettings::default());

        assert!(matches!(
            w.add("25:00", None).await,
            Err(AppError::Invalid(_))
        ));
        assert!(backend.alarms.lock().unwrap().is_empty());

        let a = w.add("7:30", Some("wake".into())).await.unwrap();
        assert_eq!(a.time, "07:30");
        assert_eq!(w.alarms().len(), 1);

        w.remove(a.id).await.unwrap();
        assert!(w.alarms().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rings_once_while_time_holds() {
        let backend = Arc::new(FakeBackend::default());
        let sink = Arc::new(RecordingSink::default());
        let w = AlarmsWidget::with_clock(
            backend.clone(),
            sink.clone(),
            AlarmSettings::default(),
            fixed_clock(seven_thirty()),
        );
        w.add("07:30", Some("standup".into())).await.unwrap();

        w.start().await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        w.stop().await;

        assert_eq!(sink.count(), 1);
        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen[0].kind, NotificationKind::Alarm);
        assert_eq!(seen[0].body, "Time for standup!");
    }

    #[tokio::test(start_paused = true)]
    async fn refreshes_cache_on_schedule() {
        let backend = Arc::new(FakeBackend::default());
        let sink = Arc::new(RecordingSink::default());
        let settings = AlarmSettings {
            refresh: Duration::from_secs(5),
            ..AlarmSettings::default()
        };
        let w = AlarmsWidget::new(backend.clone(), sink, settings);

        w.start().await;
        tokio::time::sleep(Duration::from_millis(12_500)).await;
        w.stop().await;

        // ticks at 0s, 5s and 10s refresh
        assert_eq!(backend.alarm_reads.load(Ordering::SeqCst), 3);
    }
}
