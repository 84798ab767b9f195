use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome labels recorded for every inbound payment callback.
pub const OUTCOMES: &[&str] = &["completed", "failed", "duplicate", "security_error", "error"];

#[derive(Clone)]
pub struct CallbackMetrics {
    pub registry: Registry,
    pub callbacks_total: IntCounterVec,
    pub verification_seconds: Histogram,
    pub http_errors_total: IntCounterVec,
}

impl CallbackMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let callbacks_total = IntCounterVec::new(
            Opts::new(
                "payment_callbacks_total",
                "Payment gateway callbacks grouped by final outcome",
            ),
            &["outcome"],
        )?;
        let verification_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "payment_verification_seconds",
                "Latency of the gateway status-check call",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0]),
        )?;
        let http_errors_total = IntCounterVec::new(
            Opts::new(
                "http_errors_total",
                "Count of HTTP error responses emitted (status >= 400)",
            ),
            &["service", "code", "status"],
        )?;
        registry.register(Box::new(callbacks_total.clone()))?;
        registry.register(Box::new(verification_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        // Pre-create outcome series so dashboards see zeros before the first callback.
        for outcome in OUTCOMES.iter().copied() {
            callbacks_total.with_label_values(&[outcome]);
        }
        Ok(Self { registry, callbacks_total, verification_seconds, http_errors_total })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.callbacks_total.with_label_values(&[outcome]).inc();
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.callbacks_total.with_label_values(&[outcome]).get()
    }

    pub fn record_http_error(&self, service: &str, code: &str, status: u16) {
        let status = status.to_string();
        self.http_errors_total
            .with_label_values(&[service, code, status.as_str()])
            .inc();
    }

    /// Render the registry in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
