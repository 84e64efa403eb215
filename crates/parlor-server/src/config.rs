use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use parlor_api::sweeper::SweepSettings;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub sweep: SweepSettings,
    pub storage_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take defaults; set keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("PARLOR_DB_PATH").unwrap_or_else(|| "parlor.db".into());
        let host = lookup("PARLOR_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parsed(&lookup, "PARLOR_PORT", 5000)?;
        let interval_secs = parsed(&lookup, "PARLOR_SWEEP_INTERVAL_SECS", 15u64)?;
        let stale_secs = parsed(&lookup, "PARLOR_STALE_AFTER_SECS", 10u64)?;
        let timeout_ms = parsed(&lookup, "PARLOR_STORAGE_TIMEOUT_MS", 2000u64)?;

        if interval_secs == 0 {
            anyhow::bail!("PARLOR_SWEEP_INTERVAL_SECS must be greater than zero");
        }
        // Zero would time out every storage call
        if timeout_ms == 0 {
            anyhow::bail!("PARLOR_STORAGE_TIMEOUT_MS must be greater than zero");
        }

        Ok(Self {
            db_path: db_path.into(),
            host,
            port,
            sweep: SweepSettings {
                interval: Duration::from_secs(interval_secs),
                stale_after: Duration::from_secs(stale_secs),
            },
            storage_timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", key, raw)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<ServerConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("parlor.db"));
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.sweep.interval, Duration::from_secs(15));
        assert_eq!(cfg.sweep.stale_after, Duration::from_secs(10));
        assert_eq!(cfg.storage_timeout, Duration::from_millis(2000));
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn overrides() {
        let cfg = config(&[
            ("PARLOR_DB_PATH", "/tmp/chat.db"),
            ("PARLOR_HOST", "127.0.0.1"),
            ("PARLOR_PORT", "8080"),
            ("PARLOR_SWEEP_INTERVAL_SECS", "30"),
            ("PARLOR_STALE_AFTER_SECS", "20"),
        ])
        .unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/chat.db"));
        assert_eq!(cfg.listen_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.sweep.interval, Duration::from_secs(30));
        assert_eq!(cfg.sweep.stale_after, Duration::from_secs(20));
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(config(&[("PARLOR_PORT", "eighty")]).is_err());
        assert!(config(&[("PARLOR_SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("PARLOR_HOST", "not a host")]).unwrap().listen_addr().is_err());
    }

    #[test]
    fn zero_storage_timeout_is_rejected() {
        let err = config(&[("PARLOR_STORAGE_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("PARLOR_STORAGE_TIMEOUT_MS"), "{}", err);

        let cfg = config(&[("PARLOR_STORAGE_TIMEOUT_MS", "1")]).unwrap();
        assert_eq!(cfg.storage_timeout, Duration::from_millis(1));
    }
}
