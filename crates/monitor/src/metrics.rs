use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::time::Duration;
use tracing::debug;

use crate::Result;

/// Terminal outcome of one prediction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Confirmed,
    /// An error kind discriminator such as `contract_reverted`.
    Error(&'static str),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Confirmed => "confirmed",
            Outcome::Error(kind) => kind,
        }
    }
}

/// Core metrics for the oracle service
pub struct OracleMetrics {
    pub requests: IntCounterVec,
    pub broadcast_attempts: IntCounter,
    pub submission_duration: Histogram,
    pub next_nonce: IntGauge,
}

impl OracleMetrics {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests = IntCounterVec::new(
            Opts::new("oracle_requests_total", "Prediction requests by terminal outcome"),
            &["outcome"],
        )?;
        let broadcast_attempts = IntCounter::new(
            "oracle_broadcast_attempts_total",
            "Raw transaction broadcast attempts",
        )?;
        let submission_duration = Histogram::with_opts(
            HistogramOpts::new(
                "oracle_submission_duration_seconds",
                "Time from first broadcast to terminal receipt outcome",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]),
        )?;
        let next_nonce = IntGauge::new("oracle_next_nonce", "Next nonce the sequencer will hand out")?;
        
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(broadcast_attempts.clone()))?;
        registry.register(Box::new(submission_duration.clone()))?;
        registry.register(Box::new(next_nonce.clone()))?;
        
        Ok(Self {
            requests,
            broadcast_attempts,
            submission_duration,
            next_nonce,
        })
    }
    
    pub fn record_outcome(&self, outcome: Outcome) {
        debug!(outcome = outcome.label(), "request outcome");
        self.requests.with_label_values(&[outcome.label()]).inc();
    }
    
    pub fn record_broadcast_attempts(&self, attempts: u32) {
        self.broadcast_attempts.inc_by(u64::from(attempts));
    }
    
    pub fn observe_submission(&self, elapsed: Duration) {
        self.submission_duration.observe(elapsed.as_secs_f64());
    }
    
    pub fn set_next_nonce(&self, nonce: u64) {
        self.next_nonce.set(i64::try_from(nonce).unwrap_or(i64::MAX));
    }
}
