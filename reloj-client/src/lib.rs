use std::path::Path;

use tracing::info;

pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod display;
pub mod notify;
pub mod watch;
pub mod widgets;

pub use backend::{ClockBackend, RestBackend};
pub use cli::{Cli, Command};
pub use config::{ClientConfig, load_config, resolve_config_path};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    Invalid(String),
}

/// Installs the global subscriber. Logs go to stderr, or to a daily rolling
/// file under `log_dir`; stdout is reserved for widget output.
fn init_tracing(log_dir: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "reloj-client.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .compact()
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact()
                .init();
            None
        }
    }
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    let (cfg_path, mut cfg) = ClientConfig::find_and_load(cli.config)?;
    if let Some(server) = cli.server {
        cfg.server_url = config::normalize_server_url(&server);
    }
    let _log_guard = init_tracing(cfg.log_dir.as_deref());
    info!(path=?cfg_path, server=%cfg.server_url, "loaded config");

    app::dispatch(cli.command.unwrap_or(Command::Watch), cfg, cfg_path).await
}
