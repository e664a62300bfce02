use crate::{
    parse_attitude, IngestStats, Mailbox, PollOutcome, RxWindow, TelemetrySample, IMU_BUF_SIZE,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Acknowledges the idle-line condition on the receiving peripheral.
pub trait IdleLine {
    fn clear_idle_flag(&self);
}

/// For sources that have no flag to clear (host threads, tests).
impl IdleLine for () {
    fn clear_idle_flag(&self) {}
}

/// State shared between the interrupt producer and the polling consumer.
#[derive(Debug, Default)]
pub struct TelemetryLink<const N: usize = IMU_BUF_SIZE> {
    rx: RxWindow<N>,
    mailbox: Mailbox<N>,
    idle_events: AtomicU32,
}

impl<const N: usize> TelemetryLink<N> {
    pub fn new() -> Self {
        Self {
            rx: RxWindow::new(),
            mailbox: Mailbox::new(),
            idle_events: AtomicU32::new(0),
        }
    }

    /// The live receive window the hardware writes into.
    pub fn rx(&self) -> &RxWindow<N> {
        &self.rx
    }

    pub fn mailbox(&self) -> &Mailbox<N> {
        &self.mailbox
    }

    /// Interrupt phase: acknowledge the idle line, snapshot the whole window, mark ready.
    ///
    /// Bounded work, no allocation, no parsing, no logging.
    pub fn on_idle_line<F: IdleLine + ?Sized>(&self, line: &F) {
        line.clear_idle_flag();
        self.idle_events.fetch_add(1, Ordering::Relaxed);
        self.mailbox.try_send_window(&self.rx);
    }

    pub fn idle_events(&self) -> u32 {
        self.idle_events.load(Ordering::Relaxed)
    }
}

/// Application-side half: deferred parsing and the published sample.
pub struct TelemetryIngest<const N: usize = IMU_BUF_SIZE> {
    link: Arc<TelemetryLink<N>>,
    snapshot: [u8; N],
    latest: TelemetrySample,
    accepted: u32,
    rejected: u32,
}

impl<const N: usize> TelemetryIngest<N> {
    pub fn new() -> Self {
        Self::with_link(Arc::new(TelemetryLink::new()))
    }

    pub fn with_link(link: Arc<TelemetryLink<N>>) -> Self {
        Self {
            link,
            snapshot: [0u8; N],
            latest: TelemetrySample::default(),
            accepted: 0,
            rejected: 0,
        }
    }

    /// Handle for the interrupt source.
    pub fn link(&self) -> Arc<TelemetryLink<N>> {
        Arc::clone(&self.link)
    }

    /// Deferred phase: parse the pending snapshot, if any.
    ///
    /// The published sample changes only on a complete reading and is replaced as a whole.
    pub fn poll(&mut self) -> PollOutcome {
        if !self.link.mailbox.try_recv(&mut self.snapshot) {
            return PollOutcome::Idle;
        }
        match parse_attitude(&self.snapshot) {
            Ok(sample) => {
                self.latest = sample;
                self.accepted = self.accepted.wrapping_add(1);
                trace!(
                    roll = sample.roll,
                    pitch = sample.pitch,
                    yaw = sample.yaw,
                    "attitude updated"
                );
                PollOutcome::Updated(sample)
            }
            Err(e) => {
                self.rejected = self.rejected.wrapping_add(1);
                debug!(error = %e, "attitude reading discarded");
                PollOutcome::Rejected(e)
            }
        }
    }

    pub fn latest(&self) -> TelemetrySample {
        self.latest
    }

    pub fn stats(&self) -> IngestStats {
        IngestStats {
            idle_events: self.link.idle_events(),
            dropped_snapshots: self.link.mailbox.dropped(),
            accepted: self.accepted,
            rejected: self.rejected,
        }
    }
}

impl<const N: usize> Default for TelemetryIngest<N> {
    fn default() -> Self {
        Self::new()
    }
}
