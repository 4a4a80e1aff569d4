use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::AppError;

pub const ENV_CONFIG: &str = "RELOJ_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_alarm_tick_ms")]
    pub alarm_tick_ms: u64,
    /// Maximum distance between a tick and the scheduled alarm time.
    #[serde(default = "default_alarm_tolerance_ms")]
    pub alarm_tolerance_ms: u64,
    /// How often the cached alarm list is re-fetched while watching.
    #[serde(default = "default_alarm_refresh_secs")]
    pub alarm_refresh_secs: u64,
    #[serde(default = "default_timer_tick_ms")]
    pub timer_tick_ms: u64,
    #[serde(default = "default_stopwatch_tick_ms")]
    pub stopwatch_tick_ms: u64,
    #[serde(default = "default_worldclock_refresh_secs")]
    pub worldclock_refresh_secs: u64,
    #[serde(default = "default_envclock_refresh_secs")]
    pub envclock_refresh_secs: u64,
    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
    #[serde(default = "default_env_city")]
    pub env_city: String,
    /// Show OS notifications in addition to the terminal banner.
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,
    /// Write logs to a daily rolling file in this directory instead of stderr.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}
fn default_alarm_tick_ms() -> u64 {
    1000
}
fn default_alarm_tolerance_ms() -> u64 {
    1000
}
fn default_alarm_refresh_secs() -> u64 {
    30
}
fn default_timer_tick_ms() -> u64 {
    500
}
fn default_stopwatch_tick_ms() -> u64 {
    100
}
fn default_worldclock_refresh_secs() -> u64 {
    10
}
fn default_envclock_refresh_secs() -> u64 {
    30
}
fn default_cities() -> Vec<String> {
    vec!["Madrid".to_string()]
}
fn default_env_city() -> String {
    "Madrid".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            alarm_tick_ms: default_alarm_tick_ms(),
            alarm_tolerance_ms: default_alarm_tolerance_ms(),
            alarm_refresh_secs: default_alarm_refresh_secs(),
            timer_tick_ms: default_timer_tick_ms(),
            stopwatch_tick_ms: default_stopwatch_tick_ms(),
            worldclock_refresh_secs: default_worldclock_refresh_secs(),
            envclock_refresh_secs: default_envclock_refresh_secs(),
            cities: default_cities(),
            env_city: default_env_city(),
            desktop_notifications: true,
            log_dir: None,
        }
    }
}

impl ClientConfig {
    /// Resolves the config path and loads it. A missing file is only an error
    /// when the path was given explicitly (flag or env var).
    pub fn find_and_load(cli_value: Option<PathBuf>) -> Result<(PathBuf, ClientConfig), AppError> {
        let explicit = cli_value.is_some() || std::env::var_os(ENV_CONFIG).is_some();
        let path = resolve_config_path(cli_value)?;
        if !explicit && !path.exists() {
            return Ok((path, ClientConfig::default()));
        }
        let cfg = load_config(&path)?;
        Ok((path, cfg))
    }

    /// Upper bound on `alarm_tolerance_ms`.
    pub const MAX_ALARM_TOLERANCE_MS: u64 = 1000;

    /// Rejects alarm timing that could ring early or miss alarms: the
    /// tolerance must be 1..=1000 ms and the tick at most twice the tolerance.
    pub fn validate(&self) -> Result<(), AppError> {
        if !(1..=Self::MAX_ALARM_TOLERANCE_MS).contains(&self.alarm_tolerance_ms) {
            return Err(AppError::Config(format!(
                "alarm_tolerance_ms must be between 1 and {}, got {}",
                Self::MAX_ALARM_TOLERANCE_MS,
                self.alarm_tolerance_ms
            )));
        }
        if !(1..=2 * self.alarm_tolerance_ms).contains(&self.alarm_tick_ms) {
            return Err(AppError::Config(format!(
                "alarm_tick_ms must be between 1 and {} (twice alarm_tolerance_ms), got {}",
                2 * self.alarm_tolerance_ms,
                self.alarm_tick_ms
            )));
        }
        Ok(())
    }

    pub fn alarm_tick(&self) -> Duration {
        Duration::from_millis(self.alarm_tick_ms.max(1))
    }
    pub fn alarm_tolerance(&self) -> Duration {
        Duration::from_millis(self.alarm_tolerance_ms)
    }
    pub fn alarm_refresh(&self) -> Duration {
        Duration::from_secs(self.alarm_refresh_secs.max(1))
    }
    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms.max(1))
    }
    pub fn stopwatch_tick(&self) -> Duration {
        Duration::from_millis(self.stopwatch_tick_ms.max(1))
    }
    pub fn worldclock_refresh(&self) -> Duration {
        Duration::from_secs(self.worldclock_refresh_secs.max(1))
    }
    pub fn envclock_refresh(&self) -> Duration {
        Duration::from_secs(self.envclock_refresh_secs.max(1))
    }
}

pub fn resolve_config_path(cli_value: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(p) = cli_value {
        return Ok(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG) {
        return Ok(PathBuf::from(p));
    }
    default_config_path().ok_or_else(|| AppError::Config("could not determine config dir".into()))
}

pub fn default_config_path() -> Option<PathBuf> {
    let pd = ProjectDirs::from("dev", "reloj", "reloj")?;
    Some(pd.config_dir().join("client.yaml"))
}

pub fn load_config(path: &Path) -> Result<ClientConfig, AppError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("read {} failed: {e}", path.display())))?;
    let mut cfg: ClientConfig = serde_yaml::from_str(&data)
        .map_err(|e| AppError::Config(format!("parse {} failed: {e}", path.display())))?;
    cfg.server_url = normalize_server_url(&cfg.server_url);
    cfg.validate()?;
    Ok(cfg)
}

pub fn save_config(path: &Path, cfg: &ClientConfig) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let data = serde_yaml::to_string(cfg)
        .map_err(|e| AppError::Config(format!("serialize config failed: {e}")))?;
    std::fs::write(path, data)
        .map_err(|e| AppError::Config(format!("write {} failed: {e}", path.display())))
}

pub fn normalize_server_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", trimmed.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_urls() {
        assert_eq!(normalize_server_url("localhost:5000/"), "http://localhost:5000");
        assert_eq!(normalize_server_url(" https://clock.example/ "), "https://clock.example");
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        std::fs::write(&path, "server_url: clock.lan:8080/\ncities: [Tokyo, Madrid]\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.server_url, "http://clock.lan:8080");
        assert_eq!(cfg.cities, vec!["Tokyo", "Madrid"]);
        assert_eq!(cfg.alarm_tick(), Duration::from_secs(1));
        assert_eq!(cfg.timer_tick(), Duration::from_millis(500));
        assert_eq!(cfg.alarm_tolerance(), Duration::from_millis(1000));
        assert!(cfg.desktop_notifications);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("client.yaml");
        let cfg = ClientConfig {
            env_city: "Tokyo".into(),
            desktop_notifications: false,
            ..ClientConfig::default()
        };
        save_config(&path, &cfg).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.env_city, "Tokyo");
        assert!(!loaded.desktop_notifications);
    }

    #[test]
    fn alarm_timing_is_validated() {
        assert!(ClientConfig::default().validate().is_ok());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.yaml");
        for bad in [
            "alarm_tolerance_ms: 0\n",
            "alarm_tolerance_ms: 1500\n",
            "alarm_tick_ms: 0\n",
            "alarm_tolerance_ms: 500\nalarm_tick_ms: 1500\n",
        ] {
            std::fs::write(&path, bad).unwrap();
            let err = ClientConfig::find_and_load(Some(path.clone())).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "accepted {bad:?}");
        }

        std::fs::write(&path, "alarm_tolerance_ms: 500\nalarm_tick_ms: 1000\n").unwrap();
        let (_, cfg) = ClientConfig::find_and_load(Some(path)).unwrap();
        assert_eq!(cfg.alarm_tolerance(), Duration::from_millis(500));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        let err = ClientConfig::find_and_load(Some(missing)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
