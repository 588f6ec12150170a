//! Web server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// Environment variable selecting the listen port.
pub const PORT_ENV_VAR: &str = "PORT";

/// Configuration for the web server.
///
/// Built once at startup and handed to [`WebServer`](crate::web::WebServer);
/// nothing reads the environment after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebConfig {
    /// Host to bind the server to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
    /// Whether to send permissive CORS headers
    pub enable_cors: bool,
    /// Time between events on `/api/events`
    pub stream_interval: Duration,
    /// How long shutdown waits for open connections before dropping them
    pub shutdown_grace: Duration,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: crate::DEFAULT_WEB_PORT,
            enable_cors: true,
            stream_interval: Duration::from_millis(crate::DEFAULT_STREAM_INTERVAL_MS),
            shutdown_grace: crate::SHUTDOWN_GRACE,
        }
    }
}

impl WebConfig {
    /// Create a new web configuration with custom host and port.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Defaults, with the port taken from `PORT` when it is set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(PORT_ENV_VAR) {
            let raw = raw.trim();
            if !raw.is_empty() {
                config.port = raw.parse().map_err(|e| {
                    StatsError::config_error(format!(
                        "invalid {} value {:?}: {}",
                        PORT_ENV_VAR, raw, e
                    ))
                })?;
            }
        }
        Ok(config)
    }

    /// Set the host for the web server.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port for the web server.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable CORS.
    pub fn with_cors(mut self, enable_cors: bool) -> Self {
        self.enable_cors = enable_cors;
        self
    }

    /// Set the event stream interval.
    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }

    /// Set the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Get the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_port_uses_default() {
        let config = WebConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.stream_interval, Duration::from_secs(2));
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_empty_port_uses_default() {
        let config = WebConfig::from_lookup(|_| Some(String::new())).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_port_from_lookup() {
        let config = WebConfig::from_lookup(|key| {
            assert_eq!(key, PORT_ENV_VAR);
            Some("8081".to_string())
        })
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.bind_address(), "0.0.0.0:8081");
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let err = WebConfig::from_lookup(|_| Some("http".to_string())).unwrap_err();
        assert!(matches!(err, StatsError::Config(_)));
        assert!(err.to_string().contains("PORT"));
    }
}
