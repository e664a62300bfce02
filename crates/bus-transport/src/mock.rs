use crate::{
    Delay, DriveEnable, HalfDuplexBus, Result, SentFrame, SerialLink, Timestamp, TransportError,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Observable activity on a mock wire, in order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WireEvent {
    DriveAsserted,
    DriveReleased,
    Bytes(Vec<u8>),
    Completed,
}

#[derive(Debug, Default)]
struct WireState {
    driven: bool,
    busy: bool,
    stalled: bool,
    completion_polls: u32,
    pending_polls: Option<u32>,
    frames: Vec<SentFrame>,
    events: Vec<WireEvent>,
}

/// An in-memory half-duplex line. Link and drive handles share its state, and
/// tests drive busy/stall conditions and inspect what went out.
#[derive(Clone, Debug, Default)]
pub struct MockWire {
    state: Arc<Mutex<WireState>>,
}

impl MockWire {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WireState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn link(&self) -> MockLink {
        MockLink { wire: self.clone() }
    }

    pub fn drive(&self) -> MockDrive {
        MockDrive { wire: self.clone() }
    }

    pub fn half_duplex(&self) -> HalfDuplexBus<MockLink, MockDrive> {
        HalfDuplexBus::new(self.link(), self.drive())
    }

    /// Simulate another source holding the peripheral.
    pub fn set_busy(&self, busy: bool) {
        self.lock().busy = busy;
    }

    /// Number of completion polls answered `false` before a frame completes.
    pub fn set_completion_polls(&self, polls: u32) {
        self.lock().completion_polls = polls;
    }

    /// Withhold completion indefinitely. Clearing the stall completes any frame in flight.
    pub fn set_stalled(&self, stalled: bool) {
        let mut s = self.lock();
        s.stalled = stalled;
        if !stalled && s.pending_polls.take().is_some() {
            s.events.push(WireEvent::Completed);
        }
    }

    pub fn is_driven(&self) -> bool {
        self.lock().driven
    }

    pub fn frames(&self) -> Vec<SentFrame> {
        self.lock().frames.clone()
    }

    pub fn events(&self) -> Vec<WireEvent> {
        self.lock().events.clone()
    }

    /// Every byte put on the wire, in order.
    pub fn stream(&self) -> Vec<u8> {
        self.lock()
            .frames
            .iter()
            .flat_map(|f| f.bytes.iter().copied())
            .collect()
    }

    pub fn clear(&self) {
        let mut s = self.lock();
        s.frames.clear();
        s.events.clear();
    }
}

pub struct MockLink {
    wire: MockWire,
}

impl SerialLink for MockLink {
    fn submit(&mut self, bytes: &[u8]) -> Result<()> {
        let mut s = self.wire.lock();
        if s.busy || s.pending_polls.is_some() {
            return Err(TransportError::Busy);
        }
        s.events.push(WireEvent::Bytes(bytes.to_vec()));
        s.frames.push(SentFrame {
            bytes: bytes.to_vec(),
            timestamp: Timestamp::now(),
        });
        s.pending_polls = Some(s.completion_polls);
        Ok(())
    }

    fn transmission_complete(&mut self) -> Result<bool> {
        let mut s = self.wire.lock();
        if s.stalled {
            return Ok(s.pending_polls.is_none());
        }
        match s.pending_polls {
            None => Ok(true),
            Some(0) => {
                s.pending_polls = None;
                s.events.push(WireEvent::Completed);
                Ok(true)
            }
            Some(n) => {
                s.pending_polls = Some(n - 1);
                Ok(false)
            }
        }
    }
}

pub struct MockDrive {
    wire: MockWire,
}

impl DriveEnable for MockDrive {
    fn set_drive(&mut self, asserted: bool) -> Result<()> {
        let mut s = self.wire.lock();
        s.driven = asserted;
        s.events.push(if asserted {
            WireEvent::DriveAsserted
        } else {
            WireEvent::DriveReleased
        });
        Ok(())
    }
}

/// Delay that records requests instead of sleeping.
#[derive(Clone, Debug, Default)]
pub struct RecordingDelay {
    calls: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Delay for RecordingDelay {
    fn delay(&mut self, duration: Duration) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(duration);
    }
}
