use crate::{IngestError, TelemetryLink};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Background receiver standing in for DMA + idle-line interrupt on a host.
///
/// Bytes are appended to the link's receive window as they arrive; a read that
/// times out after at least one byte counts as the line going idle. A read
/// error ends the thread, and [`SerialReader::stop`] returns it.
pub struct SerialReader {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<Result<(), IngestError>>,
}

impl SerialReader {
    /// True once the thread has exited, either on error or after `stop`.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn stop(self) -> Result<(), IngestError> {
        self.stop.store(true, Ordering::Relaxed);
        self.handle
            .join()
            .map_err(|_| IngestError::Io("imu reader thread panicked".into()))?
    }
}

/// Run the receive loop on `source`, whose read timeout marks the idle line.
pub fn spawn_reader<R, const N: usize>(
    mut source: R,
    link: Arc<TelemetryLink<N>>,
) -> Result<SerialReader, IngestError>
where
    R: Read + Send + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let handle = thread::Builder::new()
        .name("imu-rx".into())
        .spawn(move || {
            let mut buf = [0u8; 64];
            let mut pending = false;
            while !stop_flag.load(Ordering::Relaxed) {
                match source.read(&mut buf) {
                    Ok(0) => {}
                    Ok(n) => {
                        link.rx().feed(&buf[..n]);
                        pending = true;
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                        ) =>
                    {
                        if pending {
                            link.on_idle_line(&());
                            pending = false;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                    Err(e) => {
                        tracing::error!(error = %e, "imu serial read failed");
                        return Err(IngestError::Io(e.to_string()));
                    }
                }
            }
            Ok(())
        })
        .map_err(|e| IngestError::Io(e.to_string()))?;

    Ok(SerialReader { stop, handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PollOutcome, TelemetryIngest, TelemetrySample};
    use std::collections::VecDeque;
    use std::time::{Duration, Instant};

    /// Replays chunks and timeouts, then fails with `end` or idles forever.
    struct ScriptedLine {
        steps: VecDeque<io::Result<Vec<u8>>>,
        end: Option<io::ErrorKind>,
    }

    impl Read for ScriptedLine {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Ok(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => {
                    if let Some(kind) = self.end {
                        return Err(io::Error::new(kind, "line lost"));
                    }
                    thread::sleep(Duration::from_millis(1));
                    Err(io::ErrorKind::TimedOut.into())
                }
            }
        }
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_timeout_after_bytes_publishes_snapshot() -> anyhow::Result<()> {
        let line = ScriptedLine {
            steps: VecDeque::from([
                Ok(b"*1.5,".to_vec()),
                Ok(b"-2.0,3.25\r\n".to_vec()),
                Err(io::ErrorKind::TimedOut.into()),
            ]),
            end: None,
        };
        let mut ingest = TelemetryIngest::<64>::new();
        let reader = spawn_reader(line, ingest.link())?;

        let mut got = None;
        assert!(wait_until(|| match ingest.poll() {
            PollOutcome::Updated(sample) => {
                got = Some(sample);
                true
            }
            _ => false,
        }));
        assert_eq!(got, Some(TelemetrySample::new(1.5, -2.0, 3.25)));
        assert!(!reader.is_finished());
        reader.stop()?;
        Ok(())
    }

    #[test]
    fn test_read_error_finishes_thread_and_surfaces_on_stop() -> anyhow::Result<()> {
        let line = ScriptedLine {
            steps: VecDeque::new(),
            end: Some(io::ErrorKind::BrokenPipe),
        };
        let ingest = TelemetryIngest::<64>::new();
        let reader = spawn_reader(line, ingest.link())?;

        assert!(wait_until(|| reader.is_finished()));
        assert!(matches!(reader.stop(), Err(IngestError::Io(_))));
        Ok(())
    }
}
