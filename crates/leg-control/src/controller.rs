use crate::{CodecError, ControlConfig, FamilyGap, FrameLimits, MetricsHub, DEFAULT_FAMILY_GAP};
use bus_transport::{Delay, DriveEnable, HalfDuplexBus, SerialLink, TransportError};
use dxl_protocol::control_table::{ax, mx};
use dxl_protocol::{ControlAddress, SyncEntry, SyncWrite};
use imu_ingest::{IngestStats, PollOutcome, TelemetryIngest, TelemetryLink, TelemetrySample};
use motor_registry::{MotorRegistry, RegistryError, LEG_COUNT};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Transmit buffer size; holds the largest frame either generation allows by default.
pub const TX_BUF_LEN: usize = 256;

/// Everything one control loop needs to command the legs and read attitude.
///
/// There is no shared global state: the controller owns the bus, and the only
/// thing handed out is the telemetry link for the receive interrupt.
pub struct LegController<L, P, D> {
    registry: MotorRegistry,
    bus: HalfDuplexBus<L, P>,
    gap: FamilyGap<D>,
    limits: FrameLimits,
    ingest: TelemetryIngest,
    tx: [u8; TX_BUF_LEN],
    metrics: Option<MetricsHub>,
}

impl<L: SerialLink, P: DriveEnable, D: Delay> LegController<L, P, D> {
    pub fn new(registry: MotorRegistry, bus: HalfDuplexBus<L, P>, delay: D) -> Self {
        Self {
            registry,
            bus,
            gap: FamilyGap::new(delay, DEFAULT_FAMILY_GAP),
            limits: FrameLimits::default(),
            ingest: TelemetryIngest::new(),
            tx: [0u8; TX_BUF_LEN],
            metrics: None,
        }
    }

    /// Build from a loaded config: motor table, completion timeout, gap and frame limits.
    pub fn from_config(
        cfg: &ControlConfig,
        bus: HalfDuplexBus<L, P>,
        delay: D,
    ) -> Result<Self, RegistryError> {
        let registry = cfg.registry()?;
        Ok(Self::new(registry, bus.with_timeout(cfg.tx_timeout()), delay)
            .with_gap(cfg.inter_frame_gap())
            .with_frame_limits(cfg.frame_limits))
    }

    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = FamilyGap::new(self.gap.into_delay(), gap);
        self
    }

    pub fn with_frame_limits(mut self, limits: FrameLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHub) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn registry(&self) -> &MotorRegistry {
        &self.registry
    }

    pub fn bus(&self) -> &HalfDuplexBus<L, P> {
        &self.bus
    }

    pub fn metrics(&self) -> Option<&MetricsHub> {
        self.metrics.as_ref()
    }

    /// Encode a broadcast sync write into the transmit buffer and put it on the wire.
    ///
    /// Nothing is transmitted when encoding fails. Success means the frame was
    /// physically sent; the actuators do not acknowledge.
    pub fn build_and_send(
        &mut self,
        address: ControlAddress,
        entries: &[SyncEntry],
    ) -> Result<(), CodecError> {
        let result = self.encode_and_transmit(address, entries);
        if let Some(m) = &self.metrics {
            match &result {
                Ok(len) => {
                    m.bus.frames_sent.inc();
                    m.bus.bytes_sent.inc_by(*len as u64);
                }
                Err(_) => m.bus.tx_failures.inc(),
            }
        }
        result.map(|_| ())
    }

    fn encode_and_transmit(
        &mut self,
        address: ControlAddress,
        entries: &[SyncEntry],
    ) -> Result<usize, CodecError> {
        let version = address.version;
        let len = SyncWrite::new(address, entries)
            .with_param_capacity(self.limits.capacity(version))
            .encode_into(&mut self.tx)?;

        self.gap.before(version);
        let sent = self.bus.transmit(&self.tx[..len]);
        // A timed-out frame may still have reached the wire.
        if matches!(sent, Ok(()) | Err(TransportError::Timeout { .. })) {
            self.gap.sent(version);
        }
        sent?;
        Ok(len)
    }

    /// Torque enable for every actuator: joints first, then wheels.
    ///
    /// Hips take `hip_on` and knees `knee_on`. Stops at the first failure.
    pub fn torque_set(
        &mut self,
        hip_on: bool,
        knee_on: bool,
        wheel_on: bool,
    ) -> Result<(), CodecError> {
        info!(hip_on, knee_on, wheel_on, "setting torque");
        let joints = self.registry.joint_torque_entries(hip_on, knee_on);
        self.build_and_send(mx::TORQUE_ENABLE, &joints)?;
        let wheels = self.registry.wheel_torque_entries(wheel_on);
        self.build_and_send(ax::TORQUE_ENABLE, &wheels)
    }

    /// Torque off everywhere. Both frames are attempted; the first error is returned.
    pub fn emergency_stop(&mut self) -> Result<(), CodecError> {
        info!("emergency stop");
        let joints = self.registry.joint_torque_entries(false, false);
        let joints_off = self.build_and_send(mx::TORQUE_ENABLE, &joints);
        if let Err(e) = &joints_off {
            error!(error = %e, "emergency stop: joint torque-off not sent");
        }
        let wheels = self.registry.wheel_torque_entries(false);
        let wheels_off = self.build_and_send(ax::TORQUE_ENABLE, &wheels);
        if let Err(e) = &wheels_off {
            error!(error = %e, "emergency stop: wheel torque-off not sent");
        }
        joints_off.and(wheels_off)
    }

    /// Goal positions in encoder ticks, per leg.
    pub fn send_joint_positions(
        &mut self,
        hips: [u32; LEG_COUNT],
        knees: [u32; LEG_COUNT],
    ) -> Result<(), CodecError> {
        let entries = self.registry.joint_position_entries(hips, knees);
        self.build_and_send(mx::GOAL_POSITION, &entries)
    }

    /// Signed wheel speeds, per leg; negative turns clockwise.
    pub fn send_wheel_speeds(&mut self, speeds: [i16; LEG_COUNT]) -> Result<(), CodecError> {
        let entries = self.registry.wheel_speed_entries(speeds);
        self.build_and_send(ax::MOVING_SPEED, &entries)
    }

    /// Parse the pending attitude snapshot, if any. Never blocks.
    pub fn poll_telemetry(&mut self) -> PollOutcome {
        let outcome = self.ingest.poll();
        if let Some(m) = &self.metrics {
            match outcome {
                PollOutcome::Updated(_) => m.telemetry.accepted.inc(),
                PollOutcome::Rejected(_) => m.telemetry.rejected.inc(),
                PollOutcome::Idle => {}
            }
            m.telemetry
                .dropped_snapshots
                .set(i64::from(self.ingest.stats().dropped_snapshots));
        }
        outcome
    }

    pub fn get_latest_telemetry(&self) -> TelemetrySample {
        self.ingest.latest()
    }

    /// Handle for the receive interrupt (or the host reader thread).
    pub fn telemetry_link(&self) -> Arc<TelemetryLink> {
        self.ingest.link()
    }

    pub fn telemetry_stats(&self) -> IngestStats {
        self.ingest.stats()
    }
}
