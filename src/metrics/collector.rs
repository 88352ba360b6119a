use parking_lot::Mutex;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Prometheus view of the requests a process has sent, labelled by the
/// generator that sent them. Counters are cumulative across runs.
pub struct MetricsCollector {
    pub registry: Registry,
    requests: IntCounterVec,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let registry = Registry::new();
        let requests = IntCounterVec::new(
            Opts::new("sim_requests_total", "Requests sent by the traffic simulator"),
            &["source", "outcome"],
        )
        .expect("metric creation failed");
        registry
            .register(Box::new(requests.clone()))
            .expect("metric registration failed");

        Self { registry, requests }
    }

    pub fn record(&self, source: &str, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.requests.with_label_values(&[source, outcome]).inc();
    }

    pub fn count(&self, source: &str, success: bool) -> u64 {
        let outcome = if success { "success" } else { "failure" };
        self.requests.with_label_values(&[source, outcome]).get()
    }

    /// Text exposition format of every registered metric.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            log::error!("Failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub success: u64,
    pub failure: u64,
}

impl Tally {
    pub fn total(&self) -> u64 {
        self.success + self.failure
    }
}

/// Success/failure counters shared by every thread of a simulation run.
pub struct Counters {
    tally: Mutex<Tally>,
    metrics: Arc<MetricsCollector>,
}

impl Counters {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self {
            tally: Mutex::new(Tally::default()),
            metrics,
        }
    }

    pub fn record_success(&self, source: &str) {
        self.tally.lock().success += 1;
        self.metrics.record(source, true);
    }

    pub fn record_failure(&self, source: &str) {
        self.tally.lock().failure += 1;
        self.metrics.record(source, false);
    }

    pub fn reset(&self) {
        *self.tally.lock() = Tally::default();
    }

    pub fn snapshot(&self) -> Tally {
        *self.tally.lock()
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counters_sum_across_threads() {
        let counters = Arc::new(Counters::new(Arc::new(MetricsCollector::new())));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let counters = Arc::clone(&counters);
                thread::spawn(move || {
                    for i in 0..250 {
                        if (i + t) % 3 == 0 {
                            counters.record_failure("test");
                        } else {
                            counters.record_success("test");
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let tally = counters.snapshot();
        assert_eq!(tally.total(), 2000);
        assert_eq!(
            counters.metrics().count("test", true) + counters.metrics().count("test", false),
            2000
        );
    }

    #[test]
    fn test_reset_clears_tally_but_not_metrics() {
        let counters = Counters::new(Arc::new(MetricsCollector::new()));
        counters.record_success("simple");
        counters.record_failure("simple");
        counters.reset();

        assert_eq!(counters.snapshot(), Tally::default());
        assert_eq!(counters.metrics().count("simple", true), 1);
    }

    #[test]
    fn test_render_contains_labels() {
        let metrics = MetricsCollector::new();
        metrics.record("flood", false);
        let text = metrics.render();
        assert!(text.contains("sim_requests_total"));
        assert!(text.contains("source=\"flood\""));
        assert!(text.contains("outcome=\"failure\""));
    }
}
