use crate::Result;
use std::time::Duration;

/// Byte-oriented serial peripheral driving one physical line.
pub trait SerialLink {
    /// Hand `bytes` to the peripheral. Fails with `Busy` when it cannot start.
    fn submit(&mut self, bytes: &[u8]) -> Result<()>;

    /// True once the last stop bit of the submitted bytes has left the wire.
    ///
    /// Accepting bytes into a FIFO is not completion.
    fn transmission_complete(&mut self) -> Result<bool>;
}

/// Direction-control output of a half-duplex transceiver.
pub trait DriveEnable {
    /// `true` drives the line (transmit), `false` releases it (receive).
    fn set_drive(&mut self, asserted: bool) -> Result<()>;
}

/// Blocking delay source.
pub trait Delay {
    fn delay(&mut self, duration: Duration);
}

/// Delay backed by `std::thread::sleep`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
