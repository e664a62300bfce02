//! leg-control: the control context for the wheel-leg robot
//!
//! [`LegController`] owns the motor table, the half-duplex bus, the attitude
//! ingest and the transmit buffer. It turns leg-level commands into Protocol 2.0
//! joint frames and Protocol 1.0 wheel frames, keeping a quiet gap on the line
//! whenever it switches between the two.

mod error;
pub use error::CodecError;

mod config;
pub use config::{ControlConfig, FrameLimits, ImuConfig, MotorBusConfig};

mod gap;
pub use gap::{FamilyGap, DEFAULT_FAMILY_GAP};

mod metrics;
pub use metrics::{BusMetrics, MetricsHub, TelemetryMetrics};

mod controller;
pub use controller::{LegController, TX_BUF_LEN};
