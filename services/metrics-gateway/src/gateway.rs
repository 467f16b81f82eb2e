use std::num::NonZeroUsize;
use std::sync::Arc;
use serde::Serialize;
use tracing::{trace, warn};
use crate::buffer::{BufferRegistry, DeviceBuffer};
use crate::cache::{cache_key, CacheError, DisabledCache, MemoryCache, SampleCache};
use crate::config::GatewayConfig;
use crate::detection::{AnalyticsResult, AnomalyClassifier, AnomalyEventQueue};
use crate::ingest::{Accepted, MetricReport, Sample, ValidationError};
use crate::tasks::TaskSpawner;
use crate::telemetry::METRICS;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RollingAverage {
    pub device_id: String,
    pub rolling_average: f64,
    pub window_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyListing {
    pub count: usize,
    pub anomalies: Vec<AnalyticsResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub time: i64,
    pub cache: &'static str,
}

/// Ingest orchestration: buffers samples per device, classifies them in the
/// background and hands results to the anomaly queue.
pub struct Gateway {
    cfg: GatewayConfig,
    registry: BufferRegistry,
    classifier: AnomalyClassifier,
    queue: Arc<AnomalyEventQueue>,
    cache: Arc<dyn SampleCache>,
    tasks: TaskSpawner,
}

impl Gateway {
    pub fn new(cfg: GatewayConfig, cache: Arc<dyn SampleCache>, tasks: TaskSpawner) -> Self {
        Self {
            registry: BufferRegistry::new(cfg.buffer_capacity),
            classifier: AnomalyClassifier,
            queue: Arc::new(AnomalyEventQueue::new(cfg.queue_capacity)),
            cache,
            tasks,
            cfg,
        }
    }

    /// Builds the cache named by `cfg` and binds to the current tokio runtime.
    pub fn from_config(cfg: GatewayConfig) -> anyhow::Result<Self> {
        let cache: Arc<dyn SampleCache> = match NonZeroUsize::new(cfg.cache_max_entries) {
            Some(max) if cfg.cache_enabled => Arc::new(MemoryCache::new(max)),
            _ => Arc::new(DisabledCache),
        };
        Ok(Self::new(cfg, cache, TaskSpawner::current()?))
    }

    /// Validates and buffers the report, then schedules caching and classification
    /// without waiting for either.
    pub fn ingest(&self, report: MetricReport) -> Result<Accepted, ValidationError> {
        let sample = report.to_sample()?;
        let buffer = self.registry.get_or_create(&sample.entity_id);
        buffer.append(sample.value);

        METRICS.metrics_processed.inc();
        METRICS.current_rps.set(report.rps);

        self.schedule_cache_write(report);
        self.schedule_classification(buffer, sample);
        Ok(Accepted::default())
    }

    fn schedule_cache_write(&self, report: MetricReport) {
        let cache = Arc::clone(&self.cache);
        let ttl = self.cfg.cache_ttl();
        self.tasks.spawn("cache_write", async move {
            let key = cache_key(&report.device_id, report.timestamp);
            let payload = serde_json::to_vec(&report).map_err(CacheError::from)?;
            match cache.put(key, payload, ttl).await {
                Err(CacheError::Unavailable) => { trace!(device = %report.device_id, "cache unavailable, write skipped"); Ok(()) }
                other => Ok(other?),
            }
        });
    }

    fn schedule_classification(&self, buffer: Arc<DeviceBuffer>, sample: Sample) {
        let queue = Arc::clone(&self.queue);
        let classifier = self.classifier;
        let window = self.cfg.window_size;
        self.tasks.spawn("classify", async move {
            // the window already holds this sample
            let stats = buffer.window_stats(window);
            let result = classifier.classify(&sample, &stats);
            if result.is_anomaly {
                METRICS.anomalies_detected.inc();
                warn!(device = %result.device_id, value = result.value, z_score = result.z_score, "Anomaly detected");
            }
            queue.try_enqueue(result);
            Ok(())
        });
    }

    pub fn query_rolling_average(&self, device_id: &str) -> Result<RollingAverage, ValidationError> {
        if device_id.is_empty() { return Err(ValidationError::MissingDeviceId); }
        let stats = self.registry.window_stats(device_id, self.cfg.window_size);
        Ok(RollingAverage { device_id: device_id.to_owned(), rolling_average: stats.mean, window_size: self.cfg.window_size })
    }

    /// Drains the result queue with the configured grace window. Each result is returned
    /// by at most one call.
    pub fn list_anomalies(&self) -> AnomalyListing {
        let anomalies = self.queue.drain(self.cfg.drain_grace());
        AnomalyListing { count: anomalies.len(), anomalies }
    }

    pub async fn health(&self) -> HealthReport {
        let (status, cache) = match self.cache.ping().await {
            Ok(()) => ("healthy", "connected"),
            Err(_) => ("degraded", "disconnected"),
        };
        HealthReport { status, time: chrono::Utc::now().timestamp(), cache }
    }

    pub fn config(&self) -> &GatewayConfig { &self.cfg }
    pub fn registry(&self) -> &BufferRegistry { &self.registry }
    pub fn queue(&self) -> &AnomalyEventQueue { &self.queue }
    pub fn cache(&self) -> &Arc<dyn SampleCache> { &self.cache }
    pub fn tasks(&self) -> &TaskSpawner { &self.tasks }
}
