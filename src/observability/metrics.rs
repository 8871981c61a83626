use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub status_changes_total: IntCounterVec,
    pub fanout_events_total: IntCounterVec,
    pub fanout_dropped_total: IntCounter,
    pub ws_clients: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let status_changes_total = IntCounterVec::new(
            Opts::new(
                "status_changes_total",
                "Job status change requests by outcome",
            ),
            &["outcome"],
        )
        .expect("valid status_changes_total metric");

        let fanout_events_total = IntCounterVec::new(
            Opts::new("fanout_events_total", "Change events published by name"),
            &["event"],
        )
        .expect("valid fanout_events_total metric");

        let fanout_dropped_total = IntCounter::new(
            "fanout_dropped_total",
            "Change events dropped before reaching the publisher",
        )
        .expect("valid fanout_dropped_total metric");

        let ws_clients = IntGauge::new("ws_clients", "Currently connected websocket clients")
            .expect("valid ws_clients metric");

        registry
            .register(Box::new(status_changes_total.clone()))
            .expect("register status_changes_total");
        registry
            .register(Box::new(fanout_events_total.clone()))
            .expect("register fanout_events_total");
        registry
            .register(Box::new(fanout_dropped_total.clone()))
            .expect("register fanout_dropped_total");
        registry
            .register(Box::new(ws_clients.clone()))
            .expect("register ws_clients");

        Self {
            registry,
            status_changes_total,
            fanout_events_total,
            fanout_dropped_total,
            ws_clients,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
