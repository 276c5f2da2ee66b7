use crate::url_codec::{DEFAULT_PORT, ORIGIN_URL_KEY, ProxyConfig};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Local listening port (default: 1234). `0` picks a free port at start.
    pub port: u16,
    /// Address the listener binds to (default: 127.0.0.1)
    pub bind_addr: IpAddr,
    /// Per-request origin fetch timeout. `None` waits indefinitely.
    pub origin_timeout: Option<Duration>,
    /// Port for the Prometheus scrape endpoint. `None` disables the exporter.
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            origin_timeout: None,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    /// Every variable is optional; malformed values are errors.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|e| format!("Invalid PORT '{value}': {e}"))?,
            Err(_) => defaults.port,
        };

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(value) => value
                .parse::<IpAddr>()
                .map_err(|e| format!("Invalid BIND_ADDR '{value}': {e}"))?,
            Err(_) => defaults.bind_addr,
        };

        // 0 disables the timeout
        let origin_timeout = match env::var("ORIGIN_TIMEOUT_SECS") {
            Ok(value) => {
                let secs = value
                    .parse::<u64>()
                    .map_err(|e| format!("Invalid ORIGIN_TIMEOUT_SECS '{value}': {e}"))?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            Err(_) => defaults.origin_timeout,
        };

        let metrics_port = match env::var("METRICS_PORT") {
            Ok(value) => Some(
                value
                    .parse::<u16>()
                    .map_err(|e| format!("Invalid METRICS_PORT '{value}': {e}"))?,
            ),
            Err(_) => defaults.metrics_port,
        };

        Ok(Config {
            port,
            bind_addr,
            origin_timeout,
            metrics_port,
        })
    }

    /// Socket address for the proxy listener.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Proxy URL settings; the reserved query key is fixed.
    pub fn proxy_config(&self) -> ProxyConfig {
        ProxyConfig {
            port: self.port,
            origin_key: ORIGIN_URL_KEY.to_string(),
        }
    }
}
