//! bus-transport: half-duplex serial bus ownership
//!
//! One writer drives the line at a time: the transport asserts drive-enable,
//! submits the bytes, waits for the peripheral to confirm the last bit is out,
//! and releases the line. Hardware sits behind the `SerialLink` and
//! `DriveEnable` traits. The default build enables an in-memory `mock` wire so
//! framing logic can be exercised without hardware; `serial` adds a host
//! `serialport` backend driving RS-485 direction from RTS.

mod types;
pub use types::{PortInfo, SentFrame, Timestamp};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::{Delay, DriveEnable, SerialLink, StdDelay};

mod bus;
pub use bus::{HalfDuplexBus, DEFAULT_TX_TIMEOUT};

mod writer;
pub use writer::WriterLink;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockDrive, MockLink, MockWire, RecordingDelay, WireEvent};

#[cfg(feature = "serial")]
mod serial;

#[cfg(feature = "serial")]
pub use serial::{list_ports, open_half_duplex, RtsDriveEnable, SerialPortLink};
