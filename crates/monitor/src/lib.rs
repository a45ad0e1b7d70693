pub mod metrics;

use prometheus::{Encoder, Registry, TextEncoder};
use std::sync::Arc;
use thiserror::Error;

pub use metrics::{OracleMetrics, Outcome};

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Metrics error: {0}")]
    MetricsError(String),
    
    #[error("Registry error: {0}")]
    RegistryError(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;

/// Owns the registry the oracle's metrics are registered in.
pub struct Monitor {
    metrics: Arc<OracleMetrics>,
    registry: Registry,
}

impl Monitor {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let metrics = Arc::new(OracleMetrics::new(&registry)?);
        Ok(Self { metrics, registry })
    }
    
    /// Prometheus text exposition of every registered metric.
    pub fn get_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| MonitorError::MetricsError(e.to_string()))
    }
    
    pub fn metrics(&self) -> Arc<OracleMetrics> {
        self.metrics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    
    #[test]
    fn test_exposition_contains_recorded_values() {
        let monitor = Monitor::new().unwrap();
        let metrics = monitor.metrics();
        metrics.record_outcome(Outcome::Confirmed);
        metrics.record_outcome(Outcome::Error("submission_timeout"));
        metrics.record_broadcast_attempts(3);
        metrics.observe_submission(Duration::from_millis(1500));
        metrics.set_next_nonce(12);
        
        let text = monitor.get_metrics().unwrap();
        assert!(text.contains("oracle_requests_total{outcome=\"confirmed\"} 1"));
        assert!(text.contains("oracle_requests_total{outcome=\"submission_timeout\"} 1"));
        assert!(text.contains("oracle_broadcast_attempts_total 3"));
        assert!(text.contains("oracle_next_nonce 12"));
        assert!(text.contains("oracle_submission_duration_seconds_count 1"));
    }
}
