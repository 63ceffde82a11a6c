use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::persistence::DEFAULT_SAVE_DEBOUNCE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    File,
    Memory,
}

impl StorageBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub data_dir: PathBuf,
    pub user: String,
    pub save_debounce: Duration,
    pub storage: StorageBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 3000,
            log_level: "info".to_string(),
            log_dir: None,
            data_dir: default_data_dir(),
            user: "local".to_string(),
            save_debounce: DEFAULT_SAVE_DEBOUNCE,
            storage: StorageBackend::File,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(defaults.host);

        let log_level = std::env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let file_logs = std::env::var("ENABLE_FILE_LOGS")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);
        let log_dir = file_logs.then(|| {
            std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./logs"))
        });

        let data_dir = std::env::var("PROGRESS_DATA_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let user = std::env::var("PROGRESS_USER")
            .ok()
            .filter(|v| is_valid_user(v))
            .unwrap_or(defaults.user);

        let save_debounce = std::env::var("PROGRESS_SAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.save_debounce);

        let storage = std::env::var("PROGRESS_STORAGE")
            .ok()
            .and_then(|value| StorageBackend::parse(&value))
            .unwrap_or(defaults.storage);

        Self {
            host,
            port,
            log_level,
            log_dir,
            data_dir,
            user,
            save_debounce,
            storage,
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("danci-progress"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// User names become part of slot keys, so they are limited to a safe set.
fn is_valid_user(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
