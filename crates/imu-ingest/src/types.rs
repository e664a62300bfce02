use serde::{Deserialize, Serialize};

/// Receive window size of the attitude sensor link.
pub const IMU_BUF_SIZE: usize = 128;

/// Euler angles in degrees as reported by the sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

impl TelemetrySample {
    pub const fn new(roll: f32, pitch: f32, yaw: f32) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// Result of one deferred-phase poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// No snapshot was waiting.
    Idle,
    /// A snapshot parsed and replaced the published sample.
    Updated(TelemetrySample),
    /// A snapshot was consumed but discarded; the published sample is unchanged.
    Rejected(crate::ParseError),
}

/// Counters maintained by the ingest pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub idle_events: u32,
    pub dropped_snapshots: u32,
    pub accepted: u32,
    pub rejected: u32,
}
