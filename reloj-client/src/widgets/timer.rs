use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use reloj_shared::api::TimerDto;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use super::Poller;
use crate::AppError;
use crate::backend::ClockBackend;
use crate::notify::{Notification, NotificationSink};
use crate::watch::TimerWatch;

struct Inner {
    backend: Arc<dyn ClockBackend>,
    sink: Arc<dyn NotificationSink>,
    watch: Mutex<TimerWatch>,
    state_tx: watch::Sender<TimerDto>,
}

impl Inner {
    /// Records a snapshot and rings on the zero crossing. Returns whether
    /// polling should continue.
    async fn apply(&self, state: TimerDto) -> bool {
        let obs = self.watch.lock().await.observe(&state);
        if obs.finished {
            info!("timer reached zero");
            self.sink.notify(&Notification::timer_finished()).await;
        }
        // followers may exit on this state; notify first
        self.state_tx.send_replace(state);
        obs.keep_polling
    }

    /// Records a snapshot without ringing.
    async fn record(&self, state: TimerDto) {
        self.watch.lock().await.observe(&state);
        self.state_tx.send_replace(state);
    }

    async fn tick(&self) -> ControlFlow<()> {
        match self.backend.timer_state().await {
            Ok(state) => {
                if self.apply(state).await {
                    ControlFlow::Continue(())
                } else {
                    debug!("timer no longer running; polling ends");
                    ControlFlow::Break(())
                }
            }
            Err(e) => {
                warn!(error=%e, "timer poll failed; retrying next tick");
                ControlFlow::Continue(())
            }
        }
    }
}

/// Countdown timer. Polls while the backend reports it running and rings
/// once when it reaches zero.
pub struct TimerWidget {
    inner: Arc<Inner>,
    poller: Poller,
}

impl TimerWidget {
    pub fn new(
        backend: Arc<dyn ClockBackend>,
        sink: Arc<dyn NotificationSink>,
        tick: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(TimerDto::default());
        Self {
            inner: Arc::new(Inner {
                backend,
                sink,
                watch: Mutex::new(TimerWatch::new()),
                state_tx,
            }),
            poller: Poller::new("timer", tick),
        }
    }

    pub async fn start_minutes(&self, minutes: u64) -> Result<TimerDto, AppError> {
        let secs = minutes
            .checked_mul(60)
            .ok_or_else(|| AppError::Invalid(format!("{minutes} minutes is too long")))?;
        self.start_secs(secs).await
    }

    pub async fn start_secs(&self, secs: u64) -> Result<TimerDto, AppError> {
        if secs == 0 {
            return Err(AppError::Invalid("timer duration must be positive".into()));
        }
        let state = self.inner.backend.timer_start(secs).await?;
        info!(seconds = secs, "timer started");
        self.inner.apply(state).await;
        self.begin_polling().await;
        Ok(state)
    }

    pub async fn stop(&self) -> Result<TimerDto, AppError> {
        let was_polling = self.quiesce().await;
        match self.inner.backend.timer_stop().await {
            Ok(resp) => Ok(self.final_read(resp).await),
            Err(e) => Err(self.resume_after(was_polling, e).await),
        }
    }

    pub async fn reset(&self) -> Result<TimerDto, AppError> {
        let was_polling = self.quiesce().await;
        match self.inner.backend.timer_reset().await {
            Ok(resp) => Ok(self.final_read(resp).await),
            Err(e) => Err(self.resume_after(was_polling, e).await),
        }
    }

    /// One read outside the polling loop. Never rings: only the polling loop
    /// sees a countdown reach zero.
    pub async fn status(&self) -> Result<TimerDto, AppError> {
        let state = self.inner.backend.timer_state().await?;
        self.inner.record(state).await;
        Ok(state)
    }

    /// Starts polling if the backend reports a countdown already running,
    /// for timers started by another client.
    pub async fn attach(&self) -> Result<bool, AppError> {
        if self.poller.is_running().await {
            return Ok(true);
        }
        let state = self.status().await?;
        if state.running {
            info!(remaining = state.remaining, "attaching to running timer");
            self.begin_polling().await;
        }
        Ok(state.running)
    }

    /// Stops polling without touching the backend.
    pub async fn detach(&self) -> bool {
        self.poller.stop().await
    }

    pub fn state(&self) -> TimerDto {
        *self.inner.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerDto> {
        self.inner.state_tx.subscribe()
    }

    pub async fn is_polling(&self) -> bool {
        self.poller.is_running().await
    }

    async fn begin_polling(&self) {
        let inner = self.inner.clone();
        self.poller
            .start(move || {
                let inner = inner.clone();
                async move { inner.tick().await }
            })
            .await;
    }

    /// Ends polling and drops the remaining-time memory before a stop/reset
    /// is sent, so no tick can read the reset state as a zero crossing.
    async fn quiesce(&self) -> bool {
        let was_polling = self.poller.stop().await;
        self.inner.watch.lock().await.forget();
        was_polling
    }

    async fn resume_after(&self, was_polling: bool, err: AppError) -> AppError {
        if was_polling {
            warn!(error=%err, "timer control failed; resuming polling");
            self.begin_polling().await;
        }
        err
    }

    async fn final_read(&self, fallback: TimerDto) -> TimerDto {
        let state = match self.inner.backend.timer_state().await {
            Ok(s) => s,
            Err(e) => {
                warn!(error=%e, "timer read after control failed; using control response");
                fallback
            }
        };
        self.inner.record(state).await;
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::widgets::test_support::{FakeBackend, RecordingSink};

    fn t(remaining: f64) -> TimerDto {
        TimerDto {
            running: remaining > 0.0,
            remaining,
        }
    }

    fn widget(backend: &Arc<FakeBackend>, sink: &Arc<RecordingSink>) -> TimerWidget {
        TimerWidget::new(
            backend.clone(),
            sink.clone(),
            Duration::from_millis(500),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_rings_once_and_stops_polling() {
        let backend = Arc::new(FakeBackend::with_timer_script(vec![
            t(5.0),
            t(3.0),
            t(1.0),
            t(0.0),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let w = widget(&backend, &sink);

        w.start_secs(5).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(sink.count(), 1);
        assert_eq!(
            sink.seen.lock().unwrap()[0].kind,
            NotificationKind::TimerFinished
        );
        assert!(!w.is_polling().await);
        assert_eq!(backend.timer_reads(), 4);
        assert_eq!(w.state().remaining, 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clears_polling() {
        let backend = Arc::new(FakeBackend::with_timer_script(vec![t(60.0)]));
        let sink = Arc::new(RecordingSink::default());
        let w = widget(&backend, &sink);

        w.start_minutes(1).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert!(w.is_polling().await);

        let stopped = w.stop().await.unwrap();
        assert!(!stopped.running);
        assert!(!w.is_polling().await);

        let reads = backend.timer_reads();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(backend.timer_reads(), reads);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_does_not_ring() {
        let backend = Arc::new(FakeBackend::with_timer_script(vec![t(30.0)]));
        let sink = Arc::new(RecordingSink::default());
        let w = widget(&backend, &sink);

        w.start_secs(30).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let after = w.reset().await.unwrap();

        assert_eq!(after.remaining, 0.0);
        assert!(!w.is_polling().await);
        assert_eq!(sink.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reset_does_not_ring() {
        let backend = Arc::new(FakeBackend::with_timer_script(vec![t(30.0)]));
        *backend.control_delay.lock().unwrap() = Duration::from_millis(700);
        let sink = Arc::new(RecordingSink::default());
        let w = widget(&backend, &sink);

        w.start_secs(30).await.unwrap();
        tokio::time::sleep(Duration::from_millis(600)).await;
        let reads = backend.timer_reads();
        let after = w.reset().await.unwrap();

        assert_eq!(after, TimerDto::default());
        assert_eq!(sink.count(), 0);
        // only the final read hits the backend after reset was requested
        assert_eq!(backend.timer_reads(), reads + 1);
        assert!(!w.is_polling().await);
    }

    #[tokio::test]
    async fn remote_pause_then_reset_does_not_ring() {
        let backend = Arc::new(FakeBackend::with_timer_script(vec![TimerDto {
            running: false,
            remaining: 40.0,
        }]));
        let sink = Arc::new(RecordingSink::default());
        let w = widget(&backend, &sink);

        assert!(!w.attach().await.unwrap());
        *backend.timer_script.lock().unwrap() = vec![TimerDto::default()];
        assert!(!w.attach().await.unwrap());

        assert_eq!(sink.count(), 0);
        assert_eq!(w.state(), TimerDto::default());
    }

    #[tokio::test]
    async fn zero_duration_is_rejected() {
        let backend = Arc::new(FakeBackend::default());
        let sink = Arc::new(RecordingSink::default());
        let w = widget(&backend, &sink);
        assert!(matches!(w.start_secs(0).await, Err(AppError::Invalid(_))));
        assert!(!w.is_polling().await);
    }

    #[tokio::test(start_paused = true)]
    async fn attach_follows_foreign_timer() {
        let backend = Arc::new(FakeBackend::with_timer_script(vec![
            t(2.0),
            t(1.5),
            t(1.0),
            t(0.5),
            t(0.0),
        ]));
        let sink = Arc::new(RecordingSink::default());
        let w = widget(&backend, &sink);

        assert!(w.attach().await.unwrap());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sink.count(), 1);
        assert!(!w.attach().await.unwrap());
    }
}
