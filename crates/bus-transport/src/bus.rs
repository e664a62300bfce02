use crate::{DriveEnable, Result, SerialLink, TransportError};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default bound on the completion wait: one 50 Hz control tick.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_millis(20);

/// Exclusive owner of one half-duplex line.
///
/// `transmit` takes `&mut self`, so a second frame cannot start while one is
/// outstanding; callers sharing the bus across threads wrap it in a lock.
pub struct HalfDuplexBus<L, P> {
    link: L,
    drive: P,
    timeout: Duration,
    frames_sent: u64,
}

impl<L: SerialLink, P: DriveEnable> HalfDuplexBus<L, P> {
    pub fn new(link: L, drive: P) -> Self {
        Self {
            link,
            drive,
            timeout: DEFAULT_TX_TIMEOUT,
            frames_sent: 0,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Drive the line, send `bytes`, wait for the last bit to leave, release the line.
    ///
    /// The line is released on every path, including errors.
    pub fn transmit(&mut self, bytes: &[u8]) -> Result<()> {
        if let Err(e) = self.drive.set_drive(true) {
            if let Err(release) = self.drive.set_drive(false) {
                warn!(error = %release, "drive release failed after assert error");
            }
            warn!(error = %e, "drive assert failed, frame not sent");
            return Err(e);
        }
        let sent = self.send_and_wait(bytes);
        let released = self.drive.set_drive(false);

        match &sent {
            Ok(()) => {
                self.frames_sent += 1;
                debug!(len = bytes.len(), "frame transmitted");
            }
            Err(TransportError::Busy) => warn!("bus busy, frame not sent"),
            Err(e) => warn!(error = %e, len = bytes.len(), "transmit failed"),
        }
        sent?;
        released
    }

    fn send_and_wait(&mut self, bytes: &[u8]) -> Result<()> {
        self.link.submit(bytes)?;
        let start = Instant::now();
        loop {
            if self.link.transmission_complete()? {
                return Ok(());
            }
            let waited = start.elapsed();
            if waited >= self.timeout {
                return Err(TransportError::Timeout {
                    waited_ms: waited.as_millis() as u64,
                });
            }
            std::hint::spin_loop();
        }
    }

    pub fn into_parts(self) -> (L, P) {
        (self.link, self.drive)
    }
}
