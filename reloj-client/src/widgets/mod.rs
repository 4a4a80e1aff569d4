//! Widget controllers. Each owns its cached state and at most one polling task.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub mod alarms;
pub mod envclock;
pub mod stopwatch;
pub mod timer;
pub mod worldclock;

pub use alarms::AlarmsWidget;
pub use envclock::{EnvClockWidget, EnvReport};
pub use stopwatch::StopwatchWidget;
pub use timer::TimerWidget;
pub use worldclock::WorldClockWidget;

/// Source of local wall-clock time. Swapped out in tests.
pub type LocalClock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

pub fn system_clock() -> LocalClock {
    Arc::new(|| chrono::Local::now().naive_local())
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// One repeating tick. Ticks never overlap: the next interval tick is only
/// taken after the previous tick's future has completed.
pub struct Poller {
    name: &'static str,
    period: Duration,
    running: Mutex<Option<Running>>,
}

impl Poller {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            running: Mutex::new(None),
        }
    }

    /// Starts ticking unless a tick loop is already alive. The first tick runs
    /// immediately. Returning `ControlFlow::Break` from `tick` ends the loop.
    pub async fn start<F, Fut>(&self, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let mut guard = self.running.lock().await;
        if let Some(r) = guard.as_ref()
            && !r.handle.is_finished()
        {
            return false;
        }

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = self.name;
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => { break; }
                    _ = interval.tick() => {}
                }
                if tick().await.is_break() {
                    debug!(poller = name, "poller finished on its own");
                    break;
                }
            }
        });
        debug!(poller = name, ?period, "poller started");
        *guard = Some(Running { cancel, handle });
        true
    }

    /// Stops the loop; no tick starts after this returns. Returns whether a
    /// loop was alive.
    pub async fn stop(&self) -> bool {
        let mut guard = self.running.lock().await;
        let Some(r) = guard.take() else {
            return false;
        };
        let was_alive = !r.handle.is_finished();
        r.cancel.cancel();
        r.handle.abort();
        let _ = r.handle.await;
        if was_alive {
            debug!(poller = self.name, "poller stopped");
        }
        was_alive
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use reloj_shared::api::{AlarmDto, CityTimeDto, EnvDto, NewAlarmReq, StopwatchDto, TimerDto};

    use crate::AppError;
    use crate::backend::ClockBackend;
    use crate::notify::{Notification, NotificationSink};

    /// In-memory backend. Timer reads pop from a scripted queue, the last
    /// entry repeats.
    #[derive(Default)]
    pub struct FakeBackend {
        pub alarms: StdMutex<Vec<AlarmDto>>,
        pub timer_script: StdMutex<Vec<TimerDto>>,
        pub stopwatch: StdMutex<StopwatchDto>,
        pub cities: StdMutex<BTreeMap<String, CityTimeDto>>,
        pub env: StdMutex<Option<EnvDto>>,
        pub timer_reads: AtomicUsize,
        pub stopwatch_reads: AtomicUsize,
        pub alarm_reads: AtomicUsize,
        pub city_reads: AtomicUsize,
        pub next_id: AtomicUsize,
        /// Delay before timer stop/reset answer; the state changes first.
        pub control_delay: StdMutex<Duration>,
    }

    impl FakeBackend {
        pub fn with_timer_script(script: Vec<TimerDto>) -> Self {
            Self {
                timer_script: StdMutex::new(script),
                ..Self::default()
            }
        }

        pub fn timer_reads(&self) -> usize {
            self.timer_reads.load(Ordering::SeqCst)
        }

        pub fn stopwatch_reads(&self) -> usize {
            self.stopwatch_reads.load(Ordering::SeqCst)
        }

        async fn answer_later(&self) {
            let delay = *self.control_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        fn next_timer(&self) -> TimerDto {
            let mut script = self.timer_script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script.first().copied().unwrap_or_default()
            }
        }
    }

    fn unreachable_backend() -> AppError {
        AppError::Http("backend offline".into())
    }

    #[async_trait]
    impl ClockBackend for FakeBackend {
        async fn list_alarms(&self) -> Result<Vec<AlarmDto>, AppError> {
            self.alarm_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.alarms.lock().unwrap().clone())
        }

        async fn create_alarm(&self, req: &NewAlarmReq) -> Result<AlarmDto, AppError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i64 + 1;
            let alarm = AlarmDto {
                id,
                time: req.time.clone(),
                label: req.label.clone(),
                active: true,
            };
            self.alarms.lock().unwrap().push(alarm.clone());
            Ok(alarm)
        }

        async fn delete_alarm(&self, id: i64) -> Result<(), AppError> {
            self.alarms.lock().unwrap().retain(|a| a.id != id);
            Ok(())
        }

        async fn stopwatch_state(&self) -> Result<StopwatchDto, AppError> {
            self.stopwatch_reads.fetch_add(1, Ordering::SeqCst);
            Ok(*self.stopwatch.lock().unwrap())
        }

        async fn stopwatch_start(&self) -> Result<StopwatchDto, AppError> {
            let mut s = self.stopwatch.lock().unwrap();
            s.running = true;
            Ok(*s)
        }

        async fn stopwatch_stop(&self) -> Result<StopwatchDto, AppError> {
            let mut s = self.stopwatch.lock().unwrap();
            s.running = false;
            Ok(*s)
        }

        async fn stopwatch_reset(&self) -> Result<StopwatchDto, AppError> {
            let mut s = self.stopwatch.lock().unwrap();
            *s = StopwatchDto::default();
            Ok(*s)
        }

        async fn timer_state(&self) -> Result<TimerDto, AppError> {
            self.timer_reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.next_timer())
        }

        async fn timer_start(&self, duration_secs: u64) -> Result<TimerDto, AppError> {
            Ok(TimerDto {
                running: true,
                remaining: duration_secs as f64,
            })
        }

        async fn timer_stop(&self) -> Result<TimerDto, AppError> {
            let stopped = {
                let mut script = self.timer_script.lock().unwrap();
                let last = script.last().copied().unwrap_or_default();
                let stopped = TimerDto {
                    running: false,
                    ..last
                };
                *script = vec![stopped];
                stopped
            };
            self.answer_later().await;
            Ok(stopped)
        }

        async fn timer_reset(&self) -> Result<TimerDto, AppError> {
            *self.timer_script.lock().unwrap() = vec![TimerDto::default()];
            self.answer_later().await;
            Ok(TimerDto::default())
        }

        async fn world_clock(&self) -> Result<BTreeMap<String, CityTimeDto>, AppError> {
            Ok(self.cities.lock().unwrap().clone())
        }

        async fn world_cities(&self) -> Result<Vec<String>, AppError> {
            Ok(self.cities.lock().unwrap().keys().cloned().collect())
        }

        async fn city_time(&self, city: &str) -> Result<CityTimeDto, AppError> {
            self.city_reads.fetch_add(1, Ordering::SeqCst);
            self.cities
                .lock()
                .unwrap()
                .get(city)
                .cloned()
                .ok_or_else(|| AppError::Http(format!("status 404: unknown city {city}")))
        }

        async fn env_clock(&self, _city: &str) -> Result<EnvDto, AppError> {
            self.env.lock().unwrap().clone().ok_or_else(unreachable_backend)
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub seen: StdMutex<Vec<Notification>>,
    }

    impl RecordingSink {
        pub fn count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, notification: &Notification) {
            self.seen.lock().unwrap().push(notification.clone());
        }
    }
}
