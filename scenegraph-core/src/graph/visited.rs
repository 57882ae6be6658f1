//! Visited-ID Allocation
//!
//! Traversals stamp nodes with a per-walk id instead of clearing a visited
//! flag on every node before each walk. A node is "visited by this walk" when
//! its stamp equals the walk's id. Id 0 is reserved for "never visited".
//!
//! Stamps only need clearing when the 32-bit counter wraps; the graph does
//! that lazily when [`VisitedIds::advance`] reports a wrap.

/// Monotonic visited-id counter.
#[derive(Debug, Clone, Default)]
pub(crate) struct VisitedIds {
    /// The most recently handed out id. Starts at 0 so the first id is 1.
    last: u32,
}

/// Outcome of advancing the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Advance {
    /// A fresh id; existing stamps are all smaller.
    Fresh(u32),

    /// The counter wrapped. Every stamp must be reset to 0 before the id is
    /// used.
    Wrapped(u32),
}

impl VisitedIds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id.
    pub(crate) fn advance(&mut self) -> Advance {
        self.last = self.last.wrapping_add(1);
        if self.last == 0 {
            self.last = 1;
            return Advance::Wrapped(self.last);
        }
        Advance::Fresh(self.last)
    }

    pub(crate) fn reset(&mut self) {
        self.last = 0;
    }

    #[cfg(test)]
    pub(crate) fn set_last(&mut self, last: u32) {
        self.last = last;
    }
}
