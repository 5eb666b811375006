//! Prometheus metrics for TierKV

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};

/// Global metrics instance
pub struct Metrics {
    pub registry: Registry,

    // Command counters, labelled by command kind
    pub commands: IntCounterVec,

    // Hit/miss counters
    pub get_hits: IntCounter,
    pub get_misses: IntCounter,

    // Connection metrics
    pub active_connections: IntGauge,
    pub total_connections: IntCounter,
    pub rejected_connections: IntCounter,

    // Bytes counters
    pub bytes_read: IntCounter,
    pub bytes_written: IntCounter,

    // Latency histograms
    pub cmd_latency: Histogram,

    // Error counters
    pub protocol_errors: IntCounter,
    pub store_errors: IntCounter,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::try_new().unwrap_or_else(|e| panic!("metric definitions are invalid: {e}"))
    }

    fn try_new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let commands = IntCounterVec::new(
            Opts::new("tierkv_commands_total", "Total commands by kind"),
            &["command"],
        )?;

        let get_hits = IntCounter::new("tierkv_get_hits_total", "Total GET hits")?;
        let get_misses = IntCounter::new("tierkv_get_misses_total", "Total GET misses")?;

        let active_connections =
            IntGauge::new("tierkv_active_connections", "Current active connections")?;
        let total_connections =
            IntCounter::new("tierkv_connections_total", "Total connections accepted")?;
        let rejected_connections = IntCounter::new(
            "tierkv_rejected_connections_total",
            "Total connections rejected",
        )?;

        let bytes_read = IntCounter::new("tierkv_bytes_read_total", "Total bytes read")?;
        let bytes_written = IntCounter::new("tierkv_bytes_written_total", "Total bytes written")?;

        let cmd_latency = Histogram::with_opts(
            HistogramOpts::new("tierkv_cmd_latency_seconds", "Command latency in seconds").buckets(
                vec![
                    0.0001, 0.0005, 0.001, 0.002, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
                ],
            ),
        )?;

        let protocol_errors =
            IntCounter::new("tierkv_protocol_errors_total", "Total protocol errors")?;
        let store_errors = IntCounter::new("tierkv_store_errors_total", "Total store errors")?;

        // Register all metrics
        registry.register(Box::new(commands.clone()))?;
        registry.register(Box::new(get_hits.clone()))?;
        registry.register(Box::new(get_misses.clone()))?;
        registry.register(Box::new(active_connections.clone()))?;
        registry.register(Box::new(total_connections.clone()))?;
        registry.register(Box::new(rejected_connections.clone()))?;
        registry.register(Box::new(bytes_read.clone()))?;
        registry.register(Box::new(bytes_written.clone()))?;
        registry.register(Box::new(cmd_latency.clone()))?;
        registry.register(Box::new(protocol_errors.clone()))?;
        registry.register(Box::new(store_errors.clone()))?;

        Ok(Self {
            registry,
            commands,
            get_hits,
            get_misses,
            active_connections,
            total_connections,
            rejected_connections,
            bytes_read,
            bytes_written,
            cmd_latency,
            protocol_errors,
            store_errors,
        })
    }

    /// Count one command of the given kind
    pub fn record_command(&self, kind: &str) {
        self.commands.with_label_values(&[kind]).inc();
    }

    /// Get Prometheus formatted metrics
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            return format!("# failed to encode metrics: {e}\n");
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
