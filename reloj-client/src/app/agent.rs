use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Context, shutdown_signal};
use crate::AppError;
use crate::display::render_alarm;

/// How often the agent checks for a timer started elsewhere.
const TIMER_ATTACH_INTERVAL: Duration = Duration::from_secs(5);

/// Long-running mode: rings alarms and follows any running timer until the
/// process receives SIGINT/SIGTERM.
pub async fn run(ctx: &Context) -> Result<(), AppError> {
    let alarms = ctx.alarms();
    match alarms.refresh().await {
        Ok(list) => {
            info!(count = list.len(), "alarms loaded");
            for a in &list {
                println!("{}", render_alarm(a));
            }
        }
        Err(e) => warn!(error=%e, "initial alarm load failed; the checker will retry"),
    }
    alarms.start().await;

    let timer = Arc::new(ctx.timer());
    let cancel = CancellationToken::new();
    let child = cancel.child_token();
    let timer_cloned = timer.clone();
    let attach = tokio::spawn(async move {
        loop {
            match timer_cloned.attach().await {
                Ok(running) => debug!(running, "timer attach check"),
                Err(e) => warn!(error=%e, "timer attach check failed"),
            }
            tokio::select! {
                _ = child.cancelled() => { break; }
                _ = tokio::time::sleep(TIMER_ATTACH_INTERVAL) => {}
            }
        }
    });

    info!("watching alarms and timer; press Ctrl+C to stop");
    shutdown_signal().await;

    cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(3), attach).await;
    alarms.stop().await;
    timer.detach().await;
    info!("watch stopped");
    Ok(())
}
