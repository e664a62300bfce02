use crate::{Result, SerialLink, TransportError};
use std::io::{self, Write};
use std::time::Instant;

/// Any blocking byte sink as the bus peripheral.
///
/// Completion is confirmed via `flush()`. On a serial port that drains the OS
/// and UART transmit buffers (tcdrain on unix) rather than returning on FIFO
/// accept. A failed write or flush always leaves the link ready for the next
/// frame.
pub struct WriterLink<W> {
    inner: W,
    in_flight: Option<Instant>,
}

impl<W: Write> WriterLink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            in_flight: None,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn waited_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

impl<W: Write> SerialLink for WriterLink<W> {
    fn submit(&mut self, bytes: &[u8]) -> Result<()> {
        if self.in_flight.is_some() {
            return Err(TransportError::Busy);
        }
        let start = Instant::now();
        let mut written = 0;
        while written < bytes.len() {
            match self.inner.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(TransportError::Io(format!(
                        "write accepted {written} of {} bytes",
                        bytes.len()
                    )))
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                // Nothing reached the line yet, so the caller may retry.
                Err(e) if written == 0 && is_timeout(&e) => return Err(TransportError::Busy),
                // Part of the frame is on the line.
                Err(e) if is_timeout(&e) => {
                    return Err(TransportError::Timeout {
                        waited_ms: waited_ms(start),
                    })
                }
                Err(e) => return Err(TransportError::Io(e.to_string())),
            }
        }
        self.in_flight = Some(start);
        Ok(())
    }

    fn transmission_complete(&mut self) -> Result<bool> {
        let Some(start) = self.in_flight.take() else {
            return Ok(true);
        };
        match self.inner.flush() {
            Ok(()) => Ok(true),
            Err(e) if is_timeout(&e) => Err(TransportError::Timeout {
                waited_ms: waited_ms(start),
            }),
            Err(e) => Err(TransportError::Io(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted sink: each `write` or `flush` pops the next outcome, and an
    /// empty script accepts everything.
    #[derive(Default)]
    struct ScriptedPort {
        writes: VecDeque<io::Result<usize>>,
        flushes: VecDeque<io::Result<()>>,
        bytes: Vec<u8>,
        flushed: usize,
    }

    impl Write for ScriptedPort {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = match self.writes.pop_front() {
                Some(outcome) => outcome?.min(buf.len()),
                None => buf.len(),
            };
            self.bytes.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes.pop_front().unwrap_or(Ok(()))?;
            self.flushed += 1;
            Ok(())
        }
    }

    fn timed_out() -> io::Error {
        io::Error::new(io::ErrorKind::TimedOut, "operation timed out")
    }

    #[test]
    fn test_submit_then_flush_confirms() -> anyhow::Result<()> {
        let mut link = WriterLink::new(ScriptedPort::default());
        link.submit(&[1, 2, 3])?;
        assert_eq!(link.submit(&[4]), Err(TransportError::Busy));
        assert!(link.transmission_complete()?);
        assert_eq!(link.get_ref().bytes, vec![1, 2, 3]);
        assert_eq!(link.get_ref().flushed, 1);
        Ok(())
    }

    #[test]
    fn test_flush_timeout_reported_and_link_recovers() -> anyhow::Result<()> {
        let mut port = ScriptedPort::default();
        port.flushes.push_back(Err(timed_out()));
        let mut link = WriterLink::new(port);

        link.submit(&[0xAA])?;
        assert!(matches!(
            link.transmission_complete(),
            Err(TransportError::Timeout { .. })
        ));

        link.submit(&[0xBB])?;
        assert!(link.transmission_complete()?);
        assert_eq!(link.get_ref().bytes, vec![0xAA, 0xBB]);
        Ok(())
    }

    #[test]
    fn test_flush_io_error_does_not_jam_link() -> anyhow::Result<()> {
        let mut port = ScriptedPort::default();
        port.flushes
            .push_back(Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged")));
        let mut link = WriterLink::new(port);

        link.submit(&[0x01])?;
        assert!(matches!(
            link.transmission_complete(),
            Err(TransportError::Io(_))
        ));
        link.submit(&[0x02])?;
        assert!(link.transmission_complete()?);
        Ok(())
    }

    #[test]
    fn test_untouched_write_timeout_is_busy() -> anyhow::Result<()> {
        let mut port = ScriptedPort::default();
        port.writes.push_back(Err(timed_out()));
        let mut link = WriterLink::new(port);

        assert_eq!(link.submit(&[1, 2, 3]), Err(TransportError::Busy));
        assert!(link.get_ref().bytes.is_empty());
        link.submit(&[1, 2, 3])?;
        assert!(link.transmission_complete()?);
        Ok(())
    }

    #[test]
    fn test_partial_write_is_timeout_not_busy() -> anyhow::Result<()> {
        let mut port = ScriptedPort::default();
        port.writes.push_back(Ok(2));
        port.writes.push_back(Err(timed_out()));
        let mut link = WriterLink::new(port);

        assert!(matches!(
            link.submit(&[1, 2, 3, 4]),
            Err(TransportError::Timeout { .. })
        ));
        assert_eq!(link.get_ref().bytes, vec![1, 2]);

        link.submit(&[9])?;
        assert!(link.transmission_complete()?);
        assert_eq!(link.get_ref().bytes, vec![1, 2, 9]);
        Ok(())
    }

    #[cfg(feature = "mock")]
    #[test]
    fn test_bus_transmits_again_after_drain_timeout() -> anyhow::Result<()> {
        use crate::{HalfDuplexBus, MockWire};

        let mut port = ScriptedPort::default();
        port.flushes.push_back(Err(timed_out()));
        let wire = MockWire::new();
        let mut bus = HalfDuplexBus::new(WriterLink::new(port), wire.drive());

        assert!(matches!(
            bus.transmit(&[0xFF, 0xFF]),
            Err(TransportError::Timeout { .. })
        ));
        assert!(!wire.is_driven());
        bus.transmit(&[0x01, 0x02])?;
        assert_eq!(bus.frames_sent(), 1);
        assert!(!wire.is_driven());
        Ok(())
    }
}
