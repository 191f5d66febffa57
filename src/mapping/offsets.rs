//! Offset Index
//!
//! Translates offsets between the decoded text of a value and its physical
//! source. Only the regions where the two diverge are recorded, as gaps
//! sorted by both coordinates, so each lookup is a binary search.
//!
//! Boundary rules:
//! - A physical offset equal to a gap's physical start maps to the gap's
//!   display start. So does any offset within the gap's lead, the part
//!   left by regions that decode to nothing, including the start of the
//!   region merged in after them.
//! - A physical offset strictly inside the rest of a gap has no decoded
//!   identity of its own and clamps forward to the gap's display end.
//! - A display offset equal to a gap's display start maps to the gap's
//!   physical start exactly. One strictly inside the decoded extent of an
//!   expansion maps to the gap's physical end.
//! - Outside any gap both directions apply the cumulative shift of the
//!   nearest preceding gap.

/// One region where decoded and physical lengths diverge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub display_start: usize,
    pub physical_start: usize,
    /// Decoded bytes produced by the region
    pub display_len: usize,
    /// Physical bytes consumed by the region
    pub physical_len: usize,
    /// Cumulative `physical - decoded` divergence up to and including
    /// this gap
    pub shift: isize,
    /// Leading physical bytes that decode to nothing, from zero-width
    /// regions merged ahead of the last one
    pub lead: usize,
}

impl Gap {
    #[inline]
    pub fn display_end(&self) -> usize {
        self.display_start + self.display_len
    }

    #[inline]
    pub fn physical_end(&self) -> usize {
        self.physical_start + self.physical_len
    }

    /// End of the lead, where the last merged region starts
    #[inline]
    fn lead_end(&self) -> usize {
        self.physical_start + self.lead
    }

    /// Move the gap by `delta` bytes in both coordinates
    #[inline]
    fn shifted(mut self, delta: isize) -> Self {
        self.display_start = offset_by(self.display_start, delta);
        self.physical_start = offset_by(self.physical_start, delta);
        self
    }
}

#[inline]
fn offset_by(offset: usize, delta: isize) -> usize {
    offset.saturating_add_signed(delta)
}

/// Sorted gap table with the lengths of both coordinate spaces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    gaps: Vec<Gap>,
    display_len: usize,
    physical_len: usize,
}

impl OffsetIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded gaps, ascending in both coordinates
    #[inline]
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    #[inline]
    pub fn display_len(&self) -> usize {
        self.display_len
    }

    #[inline]
    pub fn physical_len(&self) -> usize {
        self.physical_len
    }

    /// Advance both coordinate spaces over a region that maps 1:1
    pub(crate) fn advance(&mut self, len: usize) {
        self.display_len += len;
        self.physical_len += len;
    }

    /// Record a divergent region starting at the current ends.
    ///
    /// A region following directly on one that decoded to nothing is
    /// merged into it, keeping display starts strictly ascending. The
    /// merged gap's lead remembers where the new region starts.
    pub(crate) fn diverge(&mut self, display_len: usize, physical_len: usize) {
        let display_start = self.display_len;
        let physical_start = self.physical_len;
        self.display_len += display_len;
        self.physical_len += physical_len;

        if display_len == physical_len {
            return;
        }
        let delta = physical_len as isize - display_len as isize;

        if let Some(last) = self.gaps.last_mut() {
            if last.display_start == display_start && last.physical_end() == physical_start {
                last.lead = last.physical_len;
                last.display_len += display_len;
                last.physical_len += physical_len;
                last.shift += delta;
                return;
            }
        }

        let shift = self.gaps.last().map_or(0, |g| g.shift) + delta;
        self.gaps.push(Gap {
            display_start,
            physical_start,
            display_len,
            physical_len,
            shift,
            lead: 0,
        });
    }

    /// Map a physical offset to a display offset.
    ///
    /// Returns `None` outside `0..=physical_len`.
    pub fn physical_to_display(&self, physical: usize) -> Option<usize> {
        if physical > self.physical_len {
            return None;
        }
        // Last gap starting at or before the offset
        let idx = self.gaps.partition_point(|g| g.physical_start <= physical);
        let Some(gap) = idx.checked_sub(1).map(|i| &self.gaps[i]) else {
            return Some(physical);
        };

        let display = if physical <= gap.lead_end() {
            gap.display_start
        } else if physical < gap.physical_end() {
            gap.display_end()
        } else {
            offset_by(physical, -gap.shift)
        };
        Some(display.min(self.display_len))
    }

    /// Map a display offset to a physical offset.
    ///
    /// Returns `None` outside `0..=display_len`.
    pub fn display_to_physical(&self, display: usize) -> Option<usize> {
        if display > self.display_len {
            return None;
        }
        let idx = self.gaps.partition_point(|g| g.display_start <= display);
        let Some(gap) = idx.checked_sub(1).map(|i| &self.gaps[i]) else {
            return Some(display);
        };

        let physical = if display == gap.display_start {
            gap.physical_start
        } else if display < gap.display_end() {
            gap.physical_end()
        } else {
            offset_by(display, gap.shift)
        };
        Some(physical.min(self.physical_len))
    }

    /// Index after a 1:1 splice at `physical` (display `display`) that
    /// removed `removed` bytes and inserted `inserted` bytes. Gaps at or
    /// after the end of the removed range move by the length change.
    pub(crate) fn spliced(&self, physical: usize, removed: usize, inserted: usize) -> Self {
        let delta = inserted as isize - removed as isize;
        let edit_end = physical + removed;
        let gaps = self
            .gaps
            .iter()
            .map(|g| if g.physical_start >= edit_end { g.shifted(delta) } else { *g })
            .collect();
        OffsetIndex {
            gaps,
            display_len: offset_by(self.display_len, delta),
            physical_len: offset_by(self.physical_len, delta),
        }
    }
}
