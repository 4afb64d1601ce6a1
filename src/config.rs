//! Relay configuration loaded from environment variables.
//!
//! Every key is optional. A `.env` file in the working directory is read
//! first via `dotenvy`.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::signaling::DEFAULT_SIGNALING_PORT;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid LISTEN_ADDR {value:?}: {source}")]
    ListenAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    pub listen_addr: SocketAddr,

    /// How often each connection is pinged. `None` disables keepalive.
    pub ping_interval: Option<Duration>,

    /// How long to wait for a pong before treating the transport as closed.
    pub pong_timeout: Duration,

    /// Capacity of the relay actor's command queue.
    pub command_queue_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_SIGNALING_PORT)),
            ping_interval: Some(Duration::from_secs(30)),
            pong_timeout: Duration::from_secs(10),
            command_queue_capacity: 1024,
        }
    }
}

impl RelayConfig {
    /// Loads configuration from the environment, falling back to
    /// [`RelayConfig::default`] for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ListenAddr`] if `LISTEN_ADDR` is set but is not
    /// a socket address.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let listen_addr = match lookup("LISTEN_ADDR") {
            Some(raw) => {
                let parsed = raw.trim().parse::<SocketAddr>();
                parsed.map_err(|source| ConfigError::ListenAddr { value: raw, source })?
            }
            None => defaults.listen_addr,
        };

        let ping_secs: u64 = parse_or(&lookup, "PING_INTERVAL_SECS", 30);
        let ping_interval = (ping_secs > 0).then(|| Duration::from_secs(ping_secs));
        let pong_timeout = Duration::from_secs(parse_or(&lookup, "PONG_TIMEOUT_SECS", 10));
        let command_queue_capacity = parse_or(
            &lookup,
            "COMMAND_QUEUE_CAPACITY",
            defaults.command_queue_capacity,
        );

        Ok(Self {
            listen_addr,
            ping_interval,
            pong_timeout,
            command_queue_capacity,
        })
    }
}

/// Missing or unparsable values fall back to `default`.
fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
