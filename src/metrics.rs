//! Metrics Surface (C7).
//!
//! A small `prometheus` registry mirroring the original service's
//! `prometheus_client` counters/histogram/gauges, exposed as text via
//! `GET /metrics`. Updates are independent of the response path: a
//! rejected, failed, or internal-error outcome still gets counted.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    concurrent_requests: IntGauge,
    queue_size: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            prometheus::Opts::new("requests_total", "Total submissions admitted"),
            &["language", "endpoint"],
        )
        .expect("static metric definition");

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "request_duration_seconds",
                "Wall-clock duration from admission to response",
            ),
            &["language"],
        )
        .expect("static metric definition");

        let concurrent_requests =
            IntGauge::new("concurrent_requests", "Requests currently executing")
                .expect("static metric definition");

        let queue_size = IntGauge::new("queue_size", "Requests currently waiting for a slot")
            .expect("static metric definition");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("unique metric name");
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .expect("unique metric name");
        registry
            .register(Box::new(concurrent_requests.clone()))
            .expect("unique metric name");
        registry
            .register(Box::new(queue_size.clone()))
            .expect("unique metric name");

        Self {
            registry,
            requests_total,
            request_duration_seconds,
            concurrent_requests,
            queue_size,
        }
    }

    pub fn record_admission(&self, language: &str, endpoint: &str) {
        self.requests_total
            .with_label_values(&[language, endpoint])
            .inc();
    }

    pub fn duration_histogram(&self, language: &str) -> Histogram {
        self.request_duration_seconds.with_label_values(&[language])
    }

    pub fn set_concurrent_requests(&self, running: i64) {
        self.concurrent_requests.set(running);
    }

    pub fn set_queue_size(&self, waiting: i64) {
        self.queue_size.set(waiting);
    }

    /// Prometheus text exposition of every registered series.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .expect("text encoding of well-formed metric families cannot fail");
        String::from_utf8(buffer).expect("prometheus text encoder emits valid utf-8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
