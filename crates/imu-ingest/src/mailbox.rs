use std::sync::atomic::{fence, AtomicBool, AtomicU32, AtomicU8, AtomicUsize, Ordering};

/// Fixed receive window, refreshed out-of-band like a DMA buffer in circular mode.
///
/// Only the interrupt phase reads it, and only as a whole fixed-length copy,
/// since the writer never stops.
#[derive(Debug)]
pub struct RxWindow<const N: usize> {
    bytes: [AtomicU8; N],
    head: AtomicUsize,
}

impl<const N: usize> RxWindow<N> {
    pub fn new() -> Self {
        Self {
            bytes: core::array::from_fn(|_| AtomicU8::new(0)),
            head: AtomicUsize::new(0),
        }
    }

    /// Producer side of the hardware: append `data`, wrapping at the end of the window.
    pub fn feed(&self, data: &[u8]) {
        if N == 0 {
            return;
        }
        let mut head = self.head.load(Ordering::Relaxed);
        for &b in data {
            self.bytes[head].store(b, Ordering::Relaxed);
            head = (head + 1) % N;
        }
        self.head.store(head, Ordering::Release);
    }

    pub fn byte(&self, index: usize) -> u8 {
        self.bytes
            .get(index)
            .map_or(0, |b| b.load(Ordering::Relaxed))
    }
}

impl<const N: usize> Default for RxWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-slot, latest-wins handoff from one producer to one consumer.
///
/// `try_send` never blocks and overwrites an unconsumed snapshot; `try_recv`
/// empties the slot. A sequence counter brackets every write so the consumer
/// can tell when the producer overwrote the slot during its copy; such a copy
/// is discarded and the newer snapshot is received on the next call.
#[derive(Debug)]
pub struct Mailbox<const N: usize> {
    slot: [AtomicU8; N],
    seq: AtomicU32,
    ready: AtomicBool,
    dropped: AtomicU32,
}

impl<const N: usize> Mailbox<N> {
    pub fn new() -> Self {
        Self {
            slot: core::array::from_fn(|_| AtomicU8::new(0)),
            seq: AtomicU32::new(0),
            ready: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    /// Publish `bytes` (zero-padded or truncated to `N`).
    ///
    /// Returns `true` if an unconsumed snapshot was overwritten.
    pub fn try_send(&self, bytes: &[u8]) -> bool {
        self.publish(|i| bytes.get(i).copied().unwrap_or(0))
    }

    /// Publish a full copy of `window`.
    pub fn try_send_window(&self, window: &RxWindow<N>) -> bool {
        self.publish(|i| window.byte(i))
    }

    fn publish(&self, byte_at: impl Fn(usize) -> u8) -> bool {
        self.seq.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        for (i, cell) in self.slot.iter().enumerate() {
            cell.store(byte_at(i), Ordering::Relaxed);
        }
        self.seq.fetch_add(1, Ordering::Release);

        let overwrote = self.ready.swap(true, Ordering::AcqRel);
        if overwrote {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        overwrote
    }

    /// Take the pending snapshot into `out`. Returns `false` if there was none.
    pub fn try_recv(&self, out: &mut [u8; N]) -> bool {
        if !self.ready.swap(false, Ordering::Acquire) {
            return false;
        }
        let before = self.seq.load(Ordering::Acquire);
        if before & 1 == 1 {
            // Write in progress; it raises `ready` again when done. The
            // snapshot taken above is gone.
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        for (dst, cell) in out.iter_mut().zip(self.slot.iter()) {
            *dst = cell.load(Ordering::Relaxed);
        }
        fence(Ordering::Acquire);
        if before != self.seq.load(Ordering::Relaxed) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Snapshots lost without being received: overwritten while pending, or
    /// taken by `try_recv` while a newer one was being written.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl<const N: usize> Default for Mailbox<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_until_sent() {
        let mb = Mailbox::<8>::new();
        let mut out = [0u8; 8];
        assert!(!mb.try_recv(&mut out));
        assert!(!mb.try_send(b"abc"));
        assert!(mb.try_recv(&mut out));
        assert_eq!(&out, b"abc\0\0\0\0\0");
        assert!(!mb.try_recv(&mut out));
    }

    #[test]
    fn test_latest_wins() {
        let mb = Mailbox::<4>::new();
        let mut out = [0u8; 4];
        assert!(!mb.try_send(b"one"));
        assert!(mb.try_send(b"two"));
        assert_eq!(mb.dropped(), 1);
        assert!(mb.try_recv(&mut out));
        assert_eq!(&out, b"two\0");
        assert!(!mb.try_recv(&mut out));
    }

    #[test]
    fn test_window_wraps_and_copies_whole() {
        let window = RxWindow::<4>::new();
        window.feed(b"abcdef");
        let mb = Mailbox::<4>::new();
        mb.try_send_window(&window);
        let mut out = [0u8; 4];
        assert!(mb.try_recv(&mut out));
        assert_eq!(&out, b"efcd");
    }

    #[test]
    fn test_concurrent_receiver_never_sees_torn_snapshot() {
        let mb = Arc::new(Mailbox::<64>::new());
        let producer = {
            let mb = Arc::clone(&mb);
            thread::spawn(move || {
                for k in 0..20_000u32 {
                    let fill = [(k % 251) as u8; 64];
                    mb.try_send(&fill);
                }
            })
        };
        let mut out = [0u8; 64];
        let mut received = 0u32;
        while !producer.is_finished() || mb.is_ready() {
            if mb.try_recv(&mut out) {
                received += 1;
                assert!(out.iter().all(|&b| b == out[0]), "torn snapshot: {out:?}");
            }
        }
        assert!(producer.join().is_ok());
        assert!(received > 0);
        // Every published snapshot is either received or counted as dropped.
        assert_eq!(received + mb.dropped(), 20_000);
    }
}
