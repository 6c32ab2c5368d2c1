use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::adaptive::EngineConfig;

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    pub file_logs: bool,
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log: LogSettings,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log = LogSettings {
            level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            file_logs: std::env::var("ENABLE_FILE_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            dir: std::env::var("LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./logs")),
        };

        Self {
            host,
            port,
            log,
            engine: EngineConfig::from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
