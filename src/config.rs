//! Configuration loading
//!
//! All fields have defaults, so an empty file (or no file) is a working
//! configuration. Command-line values override the file.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Sessions served at once; further connections wait for a free slot.
    pub max_clients: usize,
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 12345,
            max_clients: 100,
        }
    }
}

/// Per-session limits and naming.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Outbound lines queued for one client before it is dropped as too slow.
    pub outbound_buffer: usize,
    /// Longest accepted input line, in bytes.
    pub max_line_length: usize,
    /// Prefix for default handles; the remote port is appended.
    pub default_handle_prefix: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            outbound_buffer: 256,
            max_line_length: 4096,
            default_handle_prefix: "User".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.listen_addr(), "0.0.0.0:12345");
        assert_eq!(config.server.max_clients, 100);
        assert_eq!(config.session.default_handle_prefix, "User");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 4000

            [session]
            outbound_buffer = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.session.outbound_buffer, 16);
        assert_eq!(config.session.max_line_length, 4096);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"127.0.0.1\"\nmax_clients = 3").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.listen_addr(), "127.0.0.1:12345");
        assert_eq!(config.server.max_clients, 3);
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            Config::load("/definitely/not/here.toml"),
            Err(ConfigError::Io(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a number\"").unwrap();
        assert!(matches!(Config::load(file.path()), Err(ConfigError::Parse(_))));
    }
}
