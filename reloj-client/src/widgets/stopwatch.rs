use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use reloj_shared::api::StopwatchDto;
use tokio::sync::watch;
use tracing::{info, warn};

use super::Poller;
use crate::AppError;
use crate::backend::ClockBackend;

pub struct StopwatchWidget {
    backend: Arc<dyn ClockBackend>,
    state_tx: Arc<watch::Sender<StopwatchDto>>,
    poller: Poller,
}

impl StopwatchWidget {
    pub fn new(backend: Arc<dyn ClockBackend>, tick: Duration) -> Self {
        let (state_tx, _) = watch::channel(StopwatchDto::default());
        Self {
            backend,
            state_tx: Arc::new(state_tx),
            poller: Poller::new("stopwatch", tick),
        }
    }

    /// Starts the backend stopwatch; polling begins only once the backend
    /// accepted the start.
    pub async fn start(&self) -> Result<StopwatchDto, AppError> {
        let state = self.backend.stopwatch_start().await?;
        info!(elapsed = state.elapsed, "stopwatch started");
        self.state_tx.send_replace(state);

        let backend = self.backend.clone();
        let tx = self.state_tx.clone();
        self.poller
            .start(move || {
                let backend = backend.clone();
                let tx = tx.clone();
                async move {
                    match backend.stopwatch_state().await {
                        Ok(s) => {
                            tx.send_replace(s);
                        }
                        Err(e) => warn!(error=%e, "stopwatch poll failed; retrying next tick"),
                    }
                    ControlFlow::Continue(())
                }
            })
            .await;
        Ok(state)
    }

    pub async fn stop(&self) -> Result<StopwatchDto, AppError> {
        let resp = self.backend.stopwatch_stop().await?;
        self.poller.stop().await;
        Ok(self.final_read(resp).await)
    }

    pub async fn reset(&self) -> Result<StopwatchDto, AppError> {
        let resp = self.backend.stopwatch_reset().await?;
        self.poller.stop().await;
        Ok(self.final_read(resp).await)
    }

    pub async fn status(&self) -> Result<StopwatchDto, AppError> {
        let state = self.backend.stopwatch_state().await?;
        self.state_tx.send_replace(state);
        Ok(state)
    }

    pub fn state(&self) -> StopwatchDto {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<StopwatchDto> {
        self.state_tx.subscribe()
    }

    pub async fn is_polling(&self) -> bool {
        self.poller.is_running().await
    }

    /// Stops polling without touching the backend.
    pub async fn detach(&self) -> bool {
        self.poller.stop().await
    }

    async fn final_read(&self, fallback: StopwatchDto) -> StopwatchDto {
        let state = self.backend.stopwatch_state().await.unwrap_or_else(|e| {
            warn!(error=%e, "stopwatch read after control failed; using control response");
            fallback
        });
        self.state_tx.send_replace(state);
        state
    }
}
