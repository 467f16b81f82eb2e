use std::time::Duration;
use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use crate::buffer::{DEFAULT_BUFFER_CAPACITY, DEFAULT_WINDOW_SIZE};
use crate::detection::DEFAULT_QUEUE_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub port: u16,
    pub window_size: usize,
    pub buffer_capacity: usize,
    pub queue_capacity: usize,
    /// Grace window for each anomaly listing drain.
    pub drain_grace_ms: u64,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            window_size: DEFAULT_WINDOW_SIZE,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_grace_ms: 100,
            cache_enabled: true,
            cache_ttl_secs: 600,
            cache_max_entries: 100_000,
        }
    }
}

impl GatewayConfig {
    /// Defaults, then `PULSE_CONFIG_FILE`, then `PULSE__*`; a bare `PORT` wins over all of them.
    pub fn load(service: &str) -> Result<Self> {
        let mut cfg: Self = pulse_core::load_config(service, &Self::default())?;
        if let Ok(port) = std::env::var("PORT") {
            cfg.port = port.parse().with_context(|| format!("invalid PORT value {port:?}"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.window_size > 0, "window_size must be positive");
        ensure!(self.buffer_capacity > 0, "buffer_capacity must be positive");
        ensure!(self.queue_capacity > 0, "queue_capacity must be positive");
        ensure!(!self.cache_enabled || self.cache_max_entries > 0, "cache_max_entries must be positive when caching is enabled");
        Ok(())
    }

    pub fn drain_grace(&self) -> Duration { Duration::from_millis(self.drain_grace_ms) }
    pub fn cache_ttl(&self) -> Duration { Duration::from_secs(self.cache_ttl_secs) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_constants() {
        let cfg = GatewayConfig::default();
        assert_eq!((cfg.window_size, cfg.buffer_capacity, cfg.queue_capacity), (50, 1000, 100));
        assert_eq!(cfg.drain_grace(), Duration::from_millis(100));
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(600));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_zero_sizes() {
        for cfg in [
            GatewayConfig { window_size: 0, ..Default::default() },
            GatewayConfig { buffer_capacity: 0, ..Default::default() },
            GatewayConfig { queue_capacity: 0, ..Default::default() },
            GatewayConfig { cache_max_entries: 0, ..Default::default() },
        ] {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
        assert!(GatewayConfig { cache_enabled: false, cache_max_entries: 0, ..Default::default() }.validate().is_ok());
    }

    #[test]
    fn partial_documents_fill_from_defaults() {
        let cfg: GatewayConfig = serde_json::from_str(r#"{"window_size": 20}"#).unwrap();
        assert_eq!(cfg.window_size, 20);
        assert_eq!(cfg.port, 8080);
    }
}
