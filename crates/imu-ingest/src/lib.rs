//! imu-ingest: attitude telemetry from interrupt context to the control loop
//!
//! The sensor streams `*<roll>,<pitch>,<yaw>` lines into a receive window that
//! hardware refreshes on its own. On an idle-line event the interrupt phase
//! copies the whole window into a single-slot [`Mailbox`]; the control loop
//! later calls [`TelemetryIngest::poll`] to parse the newest snapshot and
//! publish a [`TelemetrySample`] only when all three angles parse.

mod types;
pub use types::{IngestStats, PollOutcome, TelemetrySample, IMU_BUF_SIZE};

mod error;
pub use error::{IngestError, ParseError};

mod mailbox;
pub use mailbox::{Mailbox, RxWindow};

mod parse;
pub use parse::{parse_attitude, START_MARKER};

mod ingest;
pub use ingest::{IdleLine, TelemetryIngest, TelemetryLink};

mod reader;
pub use reader::{spawn_reader, SerialReader};

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::{open_imu_port, spawn_serial_reader};
