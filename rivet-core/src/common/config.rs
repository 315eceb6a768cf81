/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Configuration for a rivet actor system.
///
/// Loaded from `config.toml` in the XDG config directory for `rivet`; every
/// field falls back to its default when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RivetConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Worker pool configuration for the default scheduler
    pub scheduler: SchedulerConfig,
    /// Networking defaults
    pub network: NetworkConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// How long `ActorHandle::stop` waits for an actor to wind down
    pub actor_shutdown_timeout_ms: u64,
    /// How long shutdown waits for running actors; 0 waits indefinitely
    pub shutdown_drain_timeout_ms: u64,
    /// TCP connect timeout used by `resolve`
    pub connect_timeout_ms: u64,
    /// Time allowed for the HELLO/WELCOME exchange
    pub handshake_timeout_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Default MPSC channel size for an actor inbox
    pub actor_inbox_capacity: usize,
    /// Channel size for the forwarder behind a remote proxy
    pub proxy_inbox_capacity: usize,
    /// Outbound frame queue size per connection
    pub connection_queue_capacity: usize,
    /// Largest frame payload accepted from a peer, in bytes
    pub max_frame_size: usize,
    /// Channel size for closed placeholder channels
    pub dummy_channel_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Worker threads for an owned runtime; 0 uses the runtime default
    pub worker_threads: usize,
    pub thread_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Interface `publish` binds when no host is given
    pub default_host: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            actor_shutdown_timeout_ms: 10_000,
            shutdown_drain_timeout_ms: 0,
            connect_timeout_ms: 5_000,
            handshake_timeout_ms: 5_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            actor_inbox_capacity: 255,
            proxy_inbox_capacity: 255,
            connection_queue_capacity: 1024,
            max_frame_size: 16 * 1024 * 1024,
            dummy_channel_size: 1,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name: "rivet-worker".to_string(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_host: "127.0.0.1".to_string(),
        }
    }
}

impl RivetConfig {
    pub const fn actor_shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.actor_shutdown_timeout_ms)
    }

    /// The drain timeout for shutdown, or `None` to wait indefinitely.
    pub const fn shutdown_drain_timeout(&self) -> Option<Duration> {
        match self.timeouts.shutdown_drain_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.connect_timeout_ms)
    }

    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.handshake_timeout_ms)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `rivet/config.toml` under the XDG config directories
    /// (`$XDG_CONFIG_HOME`, then `~/.config`). If no file is found, returns the
    /// default configuration. A malformed file is logged and ignored.
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("rivet") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(config_str) => match Self::from_toml(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: RivetConfig = RivetConfig::load();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = RivetConfig::from_toml(
            r#"
            [timeouts]
            shutdown_drain_timeout_ms = 250

            [limits]
            actor_inbox_capacity = 8
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.shutdown_drain_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.timeouts.connect_timeout_ms, 5_000);
        assert_eq!(config.limits.actor_inbox_capacity, 8);
        assert_eq!(config.limits.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(config.network.default_host, "127.0.0.1");
    }

    #[test]
    fn zero_drain_timeout_waits_forever() {
        assert_eq!(RivetConfig::default().shutdown_drain_timeout(), None);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(RivetConfig::from_toml("[limits]\nactor_inbox_capacity = \"many\"").is_err());
    }
}
