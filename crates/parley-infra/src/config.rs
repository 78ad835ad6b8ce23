//! Server configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.parley/` in production)
//! and deserializes it into [`ServerConfig`]. Falls back to sensible defaults
//! when the file is missing or malformed.

use std::path::Path;

use serde::Deserialize;

/// Tunables for the cache and gateway, loaded from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Recent-message cache slot TTL, seconds.
    pub cache_ttl_secs: u64,
    /// Hard cap on cached messages per chat.
    pub cache_max_entries: usize,
    /// Broadcast channel capacity per room and for the status channel.
    pub room_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 10 * 60 * 60,
            cache_max_entries: 256,
            room_capacity: 1024,
        }
    }
}

/// Load server configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ServerConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_server_config(data_dir: &Path) -> ServerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ServerConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ServerConfig::default();
        }
    };

    match toml::from_str::<ServerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ServerConfig::default()
        }
    }
}
