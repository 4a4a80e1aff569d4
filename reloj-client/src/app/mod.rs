use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::AppError;
use crate::backend::{ClockBackend, RestBackend};
use crate::cli::Command;
use crate::config::ClientConfig;
use crate::notify::{DesktopNotifier, NotificationSink};
use crate::widgets::alarms::AlarmSettings;
use crate::widgets::{AlarmsWidget, EnvClockWidget, StopwatchWidget, TimerWidget, WorldClockWidget};

pub mod agent;
pub mod commands;

/// Shared collaborators for one CLI invocation.
pub struct Context {
    pub cfg: ClientConfig,
    pub backend: Arc<dyn ClockBackend>,
    pub sink: Arc<dyn NotificationSink>,
}

impl Context {
    pub fn new(cfg: ClientConfig) -> Self {
        let backend: Arc<dyn ClockBackend> = Arc::new(RestBackend::new(&cfg.server_url));
        let sink: Arc<dyn NotificationSink> =
            Arc::new(DesktopNotifier::new(cfg.desktop_notifications));
        Self::with_parts(cfg, backend, sink)
    }

    pub fn with_parts(
        cfg: ClientConfig,
        backend: Arc<dyn ClockBackend>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self { cfg, backend, sink }
    }

    pub fn alarms(&self) -> AlarmsWidget {
        AlarmsWidget::new(
            self.backend.clone(),
            self.sink.clone(),
            AlarmSettings {
                tick: self.cfg.alarm_tick(),
                tolerance: self.cfg.alarm_tolerance(),
                refresh: self.cfg.alarm_refresh(),
            },
        )
    }

    pub fn timer(&self) -> TimerWidget {
        TimerWidget::new(self.backend.clone(), self.sink.clone(), self.cfg.timer_tick())
    }

    pub fn stopwatch(&self) -> StopwatchWidget {
        StopwatchWidget::new(self.backend.clone(), self.cfg.stopwatch_tick())
    }

    pub fn world_clock(&self, cities: Vec<String>) -> WorldClockWidget {
        WorldClockWidget::new(self.backend.clone(), cities, self.cfg.worldclock_refresh())
    }

    pub fn env_clock(&self, city: String) -> EnvClockWidget {
        EnvClockWidget::new(self.backend.clone(), city, self.cfg.envclock_refresh())
    }
}

pub async fn dispatch(cmd: Command, cfg: ClientConfig, cfg_path: PathBuf) -> Result<(), AppError> {
    let server = cfg.server_url.clone();
    let ctx = Context::new(cfg);
    let res = match cmd {
        Command::Watch => agent::run(&ctx).await,
        Command::Alarm { action } => commands::alarm(&ctx, action).await,
        Command::Timer { action } => commands::timer(&ctx, action).await,
        Command::Stopwatch { action } => commands::stopwatch(&ctx, action).await,
        Command::World {
            cities,
            all,
            follow,
        } => commands::world(&ctx, cities, all, follow).await,
        Command::Cities => commands::cities(&ctx).await,
        Command::Env { city, follow } => commands::env(&ctx, city, follow).await,
        Command::Init { force } => commands::init(&ctx, &cfg_path, force),
    };
    if let Err(AppError::Http(_)) = &res {
        eprintln!("backend at {server} did not answer as expected; check it is running and retry");
    }
    res
}

/// Prints each new rendering of `rx` until `done` holds or the process is
/// asked to stop. Identical consecutive lines are printed once.
pub async fn follow<T, R, D>(mut rx: watch::Receiver<T>, render: R, done: D)
where
    R: Fn(&T) -> String,
    D: Fn(&T) -> bool,
{
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut last = String::new();
    loop {
        tokio::select! {
            _ = &mut shutdown => { break; }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let (line, finished) = {
                    let value = rx.borrow_and_update();
                    (render(&*value), done(&*value))
                };
                if line != last {
                    println!("{line}");
                    last = line;
                }
                if finished {
                    break;
                }
            }
        }
    }
}

pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigint = signal(SignalKind::interrupt()).expect("listen SIGINT");
        let mut sigterm = signal(SignalKind::terminate()).expect("listen SIGTERM");
        tokio::select! {
            _ = sigint.recv() => {
                info!("shutdown: received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("shutdown: received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("listen for ctrl_c");
        info!("shutdown: received ctrl_c");
    }
}
