pub mod error;
pub mod routes;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use services::services::{board::BoardHandle, config::ConfigError};

const DEFAULT_PORT: u16 = 3001;

#[derive(Clone)]
pub struct AppState {
    board: BoardHandle,
}

impl AppState {
    pub fn new(board: BoardHandle) -> Self {
        Self { board }
    }

    pub fn board(&self) -> &BoardHandle {
        &self.board
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup("HOST") {
            config.host = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "HOST", value: raw })?;
        }
        if let Some(raw) = lookup("PORT") {
            config.port = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { name: "PORT", value: raw })?;
        }
        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
