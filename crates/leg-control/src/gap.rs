use bus_transport::Delay;
use dxl_protocol::ProtocolVersion;
use std::time::{Duration, Instant};

/// Default quiet time between frames of different protocol generations.
pub const DEFAULT_FAMILY_GAP: Duration = Duration::from_millis(5);

/// Keeps the line quiet for `gap` whenever consecutive frames switch protocol.
///
/// Frames of the same generation go out back to back.
pub struct FamilyGap<D> {
    delay: D,
    gap: Duration,
    last: Option<(ProtocolVersion, Instant)>,
}

impl<D: Delay> FamilyGap<D> {
    pub fn new(delay: D, gap: Duration) -> Self {
        Self {
            delay,
            gap,
            last: None,
        }
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    /// Wait out the remainder of the gap if `next` differs from the last frame.
    pub fn before(&mut self, next: ProtocolVersion) {
        let Some((prev, at)) = self.last else {
            return;
        };
        if prev == next {
            return;
        }
        let elapsed = at.elapsed();
        if elapsed < self.gap {
            self.delay.delay(self.gap - elapsed);
        }
    }

    /// Record that a frame of `version` just left the wire.
    pub fn sent(&mut self, version: ProtocolVersion) {
        self.last = Some((version, Instant::now()));
    }

    pub fn into_delay(self) -> D {
        self.delay
    }
}
