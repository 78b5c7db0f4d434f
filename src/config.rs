// src/config.rs

//! Configuration structures and environment overrides.
//!
//! The wire protocol is environment-configured on both ends: `ATON_PORT`
//! overrides the listening/connecting port and `ATON_HOST` overrides the
//! host the sender connects to. Everything else comes from `Config`,
//! which deserializes with per-field defaults so a partial file is valid.

use log::warn;
use serde::{Deserialize, Serialize};

/// Default TCP port when `ATON_PORT` is unset.
pub const DEFAULT_PORT: u16 = 9201;

/// Default host the sender connects to when `ATON_HOST` is unset.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Resolves the service port from `ATON_PORT`, falling back to the default.
pub fn port_from_env() -> u16 {
    match std::env::var("ATON_PORT") {
        Ok(raw) => match raw.parse::<u16>() {
            Ok(port) => port,
            Err(_) => {
                warn!(
                    "ATON_PORT={:?} is not a valid port, using {}",
                    raw, DEFAULT_PORT
                );
                DEFAULT_PORT
            }
        },
        Err(_) => DEFAULT_PORT,
    }
}

/// Resolves the sender's target host from `ATON_HOST`.
pub fn host_from_env() -> String {
    std::env::var("ATON_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string())
}

/// Complete service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub display: DisplayConfig,
}

impl Config {
    /// Builds a configuration from defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.network.port = port_from_env();
        config
    }
}

/// Settings for the listening endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Port to bind; the first of the search window when `port_search` is on.
    pub port: u16,
    /// Try the next 99 ports when the requested one is taken.
    pub port_search: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            port: DEFAULT_PORT,
            port_search: true,
        }
    }
}

/// Initial store policies; all of them are runtime-toggleable by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Keep one framebuffer per rendered frame instead of a single slot.
    pub multiframe: bool,
    /// Accept every AOV a renderer emits; off keeps only the first seen.
    pub enable_aovs: bool,
    /// Mirror the renderer's camera to the host as headers arrive.
    pub live_camera: bool,
    /// Tick cadence for the frame-index publisher, in milliseconds.
    pub tick_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            multiframe: true,
            enable_aovs: true,
            live_camera: false,
            tick_interval_ms: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = Config::default();
        assert_eq!(config.network.port, DEFAULT_PORT);
        assert!(config.network.port_search);
        assert!(config.display.multiframe);
        assert!(config.display.enable_aovs);
        assert!(!config.display.live_camera);
        assert_eq!(config.display.tick_interval_ms, 20);
    }
}
