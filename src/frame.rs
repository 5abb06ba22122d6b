//! Frames in flight.
//!
//! The CPU records frame N while the GPU may still be executing frame N-1.
//! [`FrameRing`] hands out slots in a fixed cycle; beginning a frame returns the
//! fence of the last frame that used the same slot, and the backend must wait on
//! it before touching that slot's per-frame resources.
//!
//! ```text
//! serial:  0    1    2    3    4
//! slot:    0    1    0    1    0
//! waits:   -    -    0    1    2
//! ```

/// Number of frames that may be in flight at once.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Identifies the frame currently being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSlot {
    /// Index into per-frame resources, always `< FRAMES_IN_FLIGHT`.
    pub index: usize,
    /// Monotonically increasing frame number, starting at 0.
    pub serial: u64,
}

/// A ring of frame slots, generic over the backend's fence type.
#[derive(Debug)]
pub struct FrameRing<F> {
    fences: Vec<Option<F>>,
    next_serial: u64,
}

impl<F> FrameRing<F> {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            fences: (0..depth).map(|_| None).collect(),
            next_serial: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.fences.len()
    }

    /// Claim the next slot. The returned fence, if any, belongs to frame
    /// `serial - depth` and must be waited on before the slot is reused.
    pub fn begin_frame(&mut self) -> (FrameSlot, Option<F>) {
        let serial = self.next_serial;
        self.next_serial += 1;
        let index = (serial % self.fences.len() as u64) as usize;
        let fence = self.fences[index].take();
        (FrameSlot { index, serial }, fence)
    }

    /// Record the fence signalled when `slot`'s submission completes.
    pub fn end_frame(&mut self, slot: FrameSlot, fence: F) {
        self.fences[slot.index] = Some(fence);
    }

    /// Remove every outstanding fence, oldest slot first.
    pub fn drain(&mut self) -> Vec<F> {
        self.fences.iter_mut().filter_map(Option::take).collect()
    }

    pub fn frames_begun(&self) -> u64 {
        self.next_serial
    }
}

impl<F> Default for FrameRing<F> {
    fn default() -> Self {
        Self::new(FRAMES_IN_FLIGHT)
    }
}
