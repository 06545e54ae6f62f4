//! The double buffer shared between the bit clock interrupt and the main
//! loop.
//!
//! The engine works through the active buffer one byte at a time.  When its
//! cursor wraps, it flips to the other buffer and posts a refill request for
//! the one it just left.  The main loop picks the request up and has one
//! whole buffer period to refill (emit) or drain (capture) that buffer before
//! the engine comes back to it.
//!
//! There is no lock.  Every index below has exactly one writer while a
//! session is armed:
//!
//! - engine (interrupt): `active`, `cursor`, `wraps`, `posted`, `underruns`
//! - main loop: `serviced`
//!
//! Buffer contents are written by whichever side currently owns that buffer:
//! the engine for the active buffer, the main loop for the other one.
//! [`DoubleBuffer::reset`] rewrites engine-owned fields and may only be
//! called while the engine is disarmed.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use portable_atomic::{AtomicU8, AtomicU16, AtomicU32, Ordering};

use crate::types::BufferId;

pub struct DoubleBuffer<const N: usize> {
    data: [[AtomicU8; N]; 2],

    // Engine owned
    active: AtomicU8,
    cursor: AtomicU16,
    wraps: AtomicU32,
    posted: [AtomicU32; 2],
    underruns: AtomicU32,

    // Main loop owned
    serviced: [AtomicU32; 2],
}

impl<const N: usize> Default for DoubleBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> DoubleBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: [const { [const { AtomicU8::new(0) }; N] }; 2],
            active: AtomicU8::new(0),
            cursor: AtomicU16::new(0),
            wraps: AtomicU32::new(0),
            posted: [const { AtomicU32::new(0) }; 2],
            underruns: AtomicU32::new(0),
            serviced: [const { AtomicU32::new(0) }; 2],
        }
    }

    /// Return to buffer 0, cursor 0, with no requests outstanding.  Only
    /// call while the engine is disarmed.
    pub fn reset(&self) {
        self.active.store(0, Ordering::Relaxed);
        self.cursor.store(0, Ordering::Relaxed);
        self.wraps.store(0, Ordering::Relaxed);
        self.underruns.store(0, Ordering::Relaxed);
        for ii in 0..2 {
            self.posted[ii].store(0, Ordering::Relaxed);
            self.serviced[ii].store(0, Ordering::Release);
        }
    }

    /// The buffer the engine is working through.
    pub fn active(&self) -> BufferId {
        BufferId::from_index(self.active.load(Ordering::Acquire))
    }

    /// Position of the engine within the active buffer.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire) as usize
    }

    /// Number of times the engine entered a buffer whose refill (or drain)
    /// had not been serviced.
    pub fn underruns(&self) -> u32 {
        self.underruns.load(Ordering::Relaxed)
    }

    /// Write `value` at the cursor of the active buffer and advance.
    /// Engine side.
    #[inline(always)]
    pub fn push_byte(&self, value: u8) {
        let active = self.active.load(Ordering::Relaxed) as usize;
        let cursor = self.cursor.load(Ordering::Relaxed) as usize;
        self.data[active][cursor].store(value, Ordering::Relaxed);
        self.advance(active, cursor);
    }

    /// Read the byte at the cursor of the active buffer and advance.
    /// Engine side.
    #[inline(always)]
    pub fn pull_byte(&self) -> u8 {
        let active = self.active.load(Ordering::Relaxed) as usize;
        let cursor = self.cursor.load(Ordering::Relaxed) as usize;
        let value = self.data[active][cursor].load(Ordering::Relaxed);
        self.advance(active, cursor);
        value
    }

    // Move the cursor on.  On wraparound flip buffers and post a request for
    // the one just vacated.
    #[inline(always)]
    fn advance(&self, active: usize, cursor: usize) {
        let next = cursor + 1;
        if next < N {
            self.cursor.store(next as u16, Ordering::Release);
            return;
        }

        let wraps = self.wraps.load(Ordering::Relaxed).wrapping_add(1);
        self.wraps.store(wraps, Ordering::Relaxed);
        self.posted[active].store(wraps, Ordering::Release);

        let entering = active ^ 1;
        if self.is_pending(entering) {
            let underruns = self.underruns.load(Ordering::Relaxed);
            self.underruns
                .store(underruns.wrapping_add(1), Ordering::Relaxed);
        }

        self.cursor.store(0, Ordering::Relaxed);
        self.active.store(entering as u8, Ordering::Release);
    }

    #[inline(always)]
    fn is_pending(&self, index: usize) -> bool {
        self.posted[index].load(Ordering::Acquire) != self.serviced[index].load(Ordering::Acquire)
    }

    /// Whether a request is outstanding for `id`.
    pub fn refill_pending(&self, id: BufferId) -> bool {
        self.is_pending(id.index())
    }

    /// Take the oldest outstanding refill request, if there is one.  Main
    /// loop side.
    pub fn consume_refill_request(&self) -> Option<BufferId> {
        let pending = BufferId::ALL
            .into_iter()
            .filter(|id| self.is_pending(id.index()));
        let id = pending.min_by_key(|id| self.posted[id.index()].load(Ordering::Acquire))?;

        let posted = self.posted[id.index()].load(Ordering::Acquire);
        self.serviced[id.index()].store(posted, Ordering::Release);
        Some(id)
    }

    /// Overwrite buffer `id` from `source`, zero padding anything `source`
    /// doesn't cover.  Main loop side - `id` must not be the active buffer
    /// while the engine is armed.
    pub fn fill(&self, id: BufferId, source: &[u8]) {
        for (ii, byte) in self.data[id.index()].iter().enumerate() {
            byte.store(source.get(ii).copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    /// Copy the first `dest.len()` bytes (at most `N`) of buffer `id` out.
    /// Returns the number of bytes copied.
    pub fn copy_out(&self, id: BufferId, dest: &mut [u8]) -> usize {
        let len = dest.len().min(N);
        for (out, byte) in dest[..len].iter_mut().zip(self.data[id.index()].iter()) {
            *out = byte.load(Ordering::Relaxed);
        }
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const N: usize = 256;

    #[test]
    fn refill_requested_once_per_buffer_alternating() {
        let buffer = DoubleBuffer::<N>::new();
        let mut seen = [BufferId::Zero; 6];
        for slot in &mut seen {
            for ii in 0..N {
                assert_eq!(buffer.consume_refill_request(), None);
                buffer.push_byte(ii as u8);
            }
            *slot = buffer.consume_refill_request().unwrap();
            assert_eq!(buffer.consume_refill_request(), None);
        }
        assert_eq!(
            seen,
            [
                BufferId::Zero,
                BufferId::One,
                BufferId::Zero,
                BufferId::One,
                BufferId::Zero,
                BufferId::One
            ]
        );
        assert_eq!(buffer.underruns(), 0);
    }

    #[test]
    fn two_requests_after_512_pushes_in_order() {
        let buffer = DoubleBuffer::<N>::new();
        for ii in 0..512 {
            buffer.push_byte(ii as u8);
        }
        assert_eq!(buffer.consume_refill_request(), Some(BufferId::Zero));
        assert_eq!(buffer.consume_refill_request(), Some(BufferId::One));
        assert_eq!(buffer.consume_refill_request(), None);

        // The engine re-entered buffer 0 before it was serviced.
        assert_eq!(buffer.underruns(), 1);
    }

    #[test]
    fn cursor_wraps_and_flips_active() {
        let buffer = DoubleBuffer::<N>::new();
        assert_eq!(buffer.active(), BufferId::Zero);
        for _ in 0..N - 1 {
            buffer.pull_byte();
        }
        assert_eq!(buffer.cursor(), N - 1);
        assert_eq!(buffer.active(), BufferId::Zero);
        buffer.pull_byte();
        assert_eq!(buffer.cursor(), 0);
        assert_eq!(buffer.active(), BufferId::One);
        assert!(buffer.refill_pending(BufferId::Zero));
    }

    #[test]
    fn pull_reads_filled_data_across_the_swap() {
        let buffer = DoubleBuffer::<4>::new();
        buffer.fill(BufferId::Zero, &[1, 2, 3, 4]);
        buffer.fill(BufferId::One, &[5, 6]);
        let pulled: [u8; 8] = core::array::from_fn(|_| buffer.pull_byte());
        assert_eq!(pulled, [1, 2, 3, 4, 5, 6, 0, 0]);
    }

    #[test]
    fn pushed_bytes_can_be_copied_out() {
        let buffer = DoubleBuffer::<4>::new();
        for byte in [9, 8, 7, 6, 5] {
            buffer.push_byte(byte);
        }
        let id = buffer.consume_refill_request().unwrap();
        let mut out = [0; 4];
        assert_eq!(buffer.copy_out(id, &mut out), 4);
        assert_eq!(out, [9, 8, 7, 6]);

        let mut partial = [0; 1];
        assert_eq!(buffer.copy_out(buffer.active(), &mut partial), 1);
        assert_eq!(partial, [5]);
    }

    #[test]
    fn reset_clears_requests_and_position() {
        let buffer = DoubleBuffer::<4>::new();
        for _ in 0..9 {
            buffer.push_byte(0xff);
        }
        buffer.reset();
        assert_eq!(buffer.active(), BufferId::Zero);
        assert_eq!(buffer.cursor(), 0);
        assert_eq!(buffer.underruns(), 0);
        assert_eq!(buffer.consume_refill_request(), None);
    }
}
