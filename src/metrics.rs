//! Metrics collection and export module
//!
//! One [`Metrics`] instance is created by the caller and handed to the
//! scanner and the transaction engine; nothing here is process-global.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,

    // Counters
    pub submissions_total: IntCounter,
    pub submission_attempts: IntCounter,
    pub submission_retries: IntCounter,
    pub submissions_rejected: IntCounter,
    pub submissions_exhausted: IntCounter,
    pub confirmations_timed_out: IntCounter,
    pub scans_total: IntCounter,
    pub scan_entries_dropped: IntCounter,

    // Histograms
    pub submit_latency: Histogram,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("submissions_total", &self.submissions_total.get())
            .field("submission_retries", &self.submission_retries.get())
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "submissions_total",
            "Transactions handed to the engine",
        ))?;

        let submission_attempts = IntCounter::with_opts(Opts::new(
            "submission_attempts",
            "Broadcast attempts, including retries",
        ))?;

        let submission_retries = IntCounter::with_opts(Opts::new(
            "submission_retries",
            "Broadcasts repeated after a transient failure",
        ))?;

        let submissions_rejected = IntCounter::with_opts(Opts::new(
            "submissions_rejected",
            "Transactions refused by the network or failed on-chain",
        ))?;

        let submissions_exhausted = IntCounter::with_opts(Opts::new(
            "submissions_exhausted",
            "Submissions abandoned at the retry ceiling",
        ))?;

        let confirmations_timed_out = IntCounter::with_opts(Opts::new(
            "confirmations_timed_out",
            "Accepted transactions not finalized before the deadline",
        ))?;

        let scans_total = IntCounter::with_opts(Opts::new(
            "scans_total",
            "Program account scans issued",
        ))?;

        let scan_entries_dropped = IntCounter::with_opts(Opts::new(
            "scan_entries_dropped",
            "Scanned accounts skipped because they failed to decode",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new(
                "submit_latency_seconds",
                "Time from first broadcast to final outcome",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submission_attempts.clone()))?;
        registry.register(Box::new(submission_retries.clone()))?;
        registry.register(Box::new(submissions_rejected.clone()))?;
        registry.register(Box::new(submissions_exhausted.clone()))?;
        registry.register(Box::new(confirmations_timed_out.clone()))?;
        registry.register(Box::new(scans_total.clone()))?;
        registry.register(Box::new(scan_entries_dropped.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submission_attempts,
            submission_retries,
            submissions_rejected,
            submissions_exhausted,
            confirmations_timed_out,
            scans_total,
            scan_entries_dropped,
            submit_latency,
        })
    }

    /// Prometheus text exposition of every metric
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.submissions_total.inc();
        metrics.submission_retries.inc_by(2);
        assert_eq!(metrics.submissions_total.get(), 1);
        assert_eq!(metrics.submission_retries.get(), 2);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.scan_entries_dropped.inc();
        assert_eq!(b.scan_entries_dropped.get(), 0);
    }

    #[test]
    fn test_render() {
        let metrics = Metrics::new().unwrap();
        metrics.confirmations_timed_out.inc();
        let text = metrics.render().unwrap();
        assert!(text.contains("confirmations_timed_out 1"));
        assert!(text.contains("submit_latency_seconds"));
    }
}
