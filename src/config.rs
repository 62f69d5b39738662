//! Service and client configuration.

use crate::{Error, Result};
use std::path::PathBuf;

/// Configuration for the signature service.
///
/// Defaults mirror a plain local deployment: listen on every interface at
/// port 5000, keep the journal in the working directory, and fsync every
/// append.
///
/// # Examples
///
/// ```
/// let cfg = signbook::ServerConfig::default();
/// assert_eq!(cfg.port, 5000);
/// assert_eq!(cfg.cors_origin.as_deref(), Some("*"));
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind
    pub bind: String,
    /// TCP port to listen on
    pub port: u16,
    /// Journal file backing the store
    pub data_path: PathBuf,
    /// Whether to fsync after every journal append
    pub sync: bool,
    /// Number of request worker threads
    pub workers: usize,
    /// Largest request body accepted, in bytes
    pub max_body_bytes: usize,
    /// Value for `Access-Control-Allow-Origin`; `None` disables CORS headers
    pub cors_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 5000,
            data_path: PathBuf::from("signatures.journal"),
            sync: true,
            workers: num_cpus::get().max(1),
            max_body_bytes: 1024 * 1024,
            cors_origin: Some("*".to_string()),
        }
    }
}

impl ServerConfig {
    /// Defaults overlaid with `PORT`, `SIGNBOOK_BIND`, `SIGNBOOK_DATA`,
    /// `SIGNBOOK_SYNC` and `SIGNBOOK_WORKERS` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(port) = lookup("PORT") {
            cfg.port = port
                .trim()
                .parse()
                .map_err(|_| Error::ConfigError(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Some(bind) = lookup("SIGNBOOK_BIND") {
            cfg.bind = bind;
        }
        if let Some(path) = lookup("SIGNBOOK_DATA") {
            cfg.data_path = PathBuf::from(path);
        }
        if let Some(sync) = lookup("SIGNBOOK_SYNC") {
            cfg.sync = parse_bool("SIGNBOOK_SYNC", &sync)?;
        }
        if let Some(workers) = lookup("SIGNBOOK_WORKERS") {
            cfg.workers = workers.trim().parse().map_err(|_| {
                Error::ConfigError(format!("SIGNBOOK_WORKERS is not a number: {}", workers))
            })?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::ConfigError("workers must be at least 1".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(Error::ConfigError("max_body_bytes must be positive".into()));
        }
        Ok(())
    }

    /// `bind:port`, suitable for handing to the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::ConfigError(format!(
            "{} is not a boolean: {}",
            key, other
        ))),
    }
}

/// Configuration for talking to a running service.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root; `signatures` is resolved against it
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent string to send with requests
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 30000,
            user_agent: format!("signbook/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn test_default_config() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.listen_addr(), "0.0.0.0:5000");
        assert!(cfg.sync);
        assert!(cfg.workers >= 1);
    }

    #[test]
    fn env_overrides_defaults() {
        let cfg = ServerConfig::from_lookup(env(&[
            ("PORT", "8080"),
            ("SIGNBOOK_DATA", "/tmp/sigs.journal"),
            ("SIGNBOOK_SYNC", "off"),
            ("SIGNBOOK_WORKERS", "3"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.data_path, PathBuf::from("/tmp/sigs.journal"));
        assert!(!cfg.sync);
        assert_eq!(cfg.workers, 3);
    }

    #[test]
    fn malformed_env_is_a_config_error() {
        let err = ServerConfig::from_lookup(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err = ServerConfig::from_lookup(env(&[("SIGNBOOK_WORKERS", "0")])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn client_defaults_point_at_local_service() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url, "http://localhost:5000");
        assert!(cfg.user_agent.starts_with("signbook/"));
    }
}
