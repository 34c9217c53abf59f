use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub ride_operations_total: IntCounterVec,
    pub ride_operation_latency_seconds: HistogramVec,
    pub ride_transitions_total: IntCounterVec,
    pub notifications_total: IntCounterVec,
    pub connected_clients: IntGauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let ride_operations_total = IntCounterVec::new(
            Opts::new("ride_operations_total", "Ride operations by outcome"),
            &["operation", "outcome"],
        )
        .expect("valid ride_operations_total metric");

        let ride_operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ride_operation_latency_seconds",
                "Latency of ride operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid ride_operation_latency_seconds metric");

        let ride_transitions_total = IntCounterVec::new(
            Opts::new("ride_transitions_total", "Ride status transitions by target status"),
            &["status"],
        )
        .expect("valid ride_transitions_total metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notification pushes by delivery outcome"),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        let connected_clients =
            IntGauge::new("connected_clients", "Currently open notification channels")
                .expect("valid connected_clients metric");

        registry
            .register(Box::new(ride_operations_total.clone()))
            .expect("register ride_operations_total");
        registry
            .register(Box::new(ride_operation_latency_seconds.clone()))
            .expect("register ride_operation_latency_seconds");
        registry
            .register(Box::new(ride_transitions_total.clone()))
            .expect("register ride_transitions_total");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(connected_clients.clone()))
            .expect("register connected_clients");

        Self {
            registry,
            ride_operations_total,
            ride_operation_latency_seconds,
            ride_transitions_total,
            notifications_total,
            connected_clients,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
