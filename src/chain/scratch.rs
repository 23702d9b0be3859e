//! Single-slot buffer recycling for one chain.
//!
//! The first step that leaves the source allocates the chain's working
//! buffer. From then on, steps that keep (width, height, layout) rewrite the
//! working buffer in place, so a run of same-shape steps stays on one buffer.
//! A step that changes the shape borrows the parked buffer when it has
//! exactly the new shape, otherwise it allocates; the buffer it consumed is
//! parked afterwards, dropping the stale slot content.
//!
//! The chain's source buffer is never parked here and never rewritten by a
//! same-shape rotation.

use crate::raster::{BufferId, PixelLayout, RasterImage};

/// How a step obtained its output buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferUse {
    /// The step returned its input buffer (identity or in-place edit).
    InPlace,
    /// The step wrote into the recycled scratch buffer.
    Reused,
    /// The step allocated a new buffer.
    Allocated,
}

impl BufferUse {
    pub fn as_str(self) -> &'static str {
        match self {
            BufferUse::InPlace => "in-place",
            BufferUse::Reused => "reused",
            BufferUse::Allocated => "allocated",
        }
    }
}

#[derive(Debug)]
pub(crate) struct ScratchBuffer {
    slot: Option<RasterImage>,
    source_id: BufferId,
    lent: Option<BufferId>,
    reuses: usize,
    allocations: usize,
}

impl ScratchBuffer {
    pub(crate) fn new(source_id: BufferId) -> Self {
        Self {
            slot: None,
            source_id,
            lent: None,
            reuses: 0,
            allocations: 0,
        }
    }

    /// Whether `image` belongs to the chain rather than the caller's source.
    pub(crate) fn is_working_buffer(&self, image: &RasterImage) -> bool {
        image.id() != self.source_id
    }

    /// Hand out the parked buffer if it has exactly this shape.
    pub(crate) fn lend(
        &mut self,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Option<RasterImage> {
        match self.slot.take() {
            Some(buffer) if buffer.matches_shape(width, height, layout) => {
                self.lent = Some(buffer.id());
                Some(buffer)
            }
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// Park a buffer released by a step, replacing whatever the slot held.
    pub(crate) fn recycle(&mut self, buffer: RasterImage) {
        if buffer.id() == self.source_id {
            return;
        }
        self.slot = Some(buffer);
    }

    /// Classify a finished step and update the counters.
    pub(crate) fn settle(&mut self, input: BufferId, output: BufferId) -> BufferUse {
        let lent = self.lent.take();
        if output == input {
            BufferUse::InPlace
        } else if Some(output) == lent {
            self.reuses += 1;
            BufferUse::Reused
        } else {
            self.allocations += 1;
            BufferUse::Allocated
        }
    }

    pub(crate) fn reuses(&self) -> usize {
        self.reuses
    }

    pub(crate) fn allocations(&self) -> usize {
        self.allocations
    }

    #[cfg(test)]
    pub(crate) fn parked(&self) -> Option<BufferId> {
        self.slot.as_ref().map(RasterImage::id)
    }
}
