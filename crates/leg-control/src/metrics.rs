use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct BusMetrics {
    pub frames_sent: IntCounter,
    pub bytes_sent: IntCounter,
    pub tx_failures: IntCounter,
}

#[derive(Clone)]
pub struct TelemetryMetrics {
    pub accepted: IntCounter,
    pub rejected: IntCounter,
    pub dropped_snapshots: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub bus: BusMetrics,
    pub telemetry: TelemetryMetrics,
}

impl MetricsHub {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let bus = BusMetrics {
            frames_sent: IntCounter::new("wl_bus_frames_sent", "Sync-write frames transmitted")?,
            bytes_sent: IntCounter::new("wl_bus_bytes_sent", "Bytes transmitted on the motor bus")?,
            tx_failures: IntCounter::new("wl_bus_tx_failures", "Frames that failed to build or send")?,
        };
        let telemetry = TelemetryMetrics {
            accepted: IntCounter::new("wl_imu_accepted", "Attitude readings published")?,
            rejected: IntCounter::new("wl_imu_rejected", "Attitude readings discarded")?,
            dropped_snapshots: IntGauge::new(
                "wl_imu_dropped_snapshots",
                "Snapshots overwritten before they were parsed",
            )?,
        };
        registry.register(Box::new(bus.frames_sent.clone()))?;
        registry.register(Box::new(bus.bytes_sent.clone()))?;
        registry.register(Box::new(bus.tx_failures.clone()))?;
        registry.register(Box::new(telemetry.accepted.clone()))?;
        registry.register(Box::new(telemetry.rejected.clone()))?;
        registry.register(Box::new(telemetry.dropped_snapshots.clone()))?;
        Ok(Self {
            registry,
            bus,
            telemetry,
        })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}
