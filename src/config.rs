use std::{env, net::SocketAddr};

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_port = parse_port(env::var("PORT").ok().as_deref());

        let config = Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            bind_port,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

/// Reads a port the way a base-10 `parseInt` would: leading whitespace is
/// skipped and parsing stops at the first non-digit. Anything that does not
/// yield a valid `u16` falls back to [`DEFAULT_PORT`].
pub fn parse_port(value: Option<&str>) -> u16 {
    let Some(value) = value else {
        return DEFAULT_PORT;
    };

    let value = value.trim_start();
    let unsigned = value.strip_prefix('+').unwrap_or(value);
    let digits_end = unsigned
        .find(|character: char| !character.is_ascii_digit())
        .unwrap_or(unsigned.len());

    unsigned[..digits_end]
        .parse::<u16>()
        .unwrap_or(DEFAULT_PORT)
}
