//! Block height clock.
//!
//! The state machine never reads ambient time. Every call receives the current
//! height from a [`BlockClock`] supplied by the host, which makes replays
//! reproducible: the same call log and the same heights give the same state.

use std::cell::Cell;

/// Ledger height, monotonically non-decreasing across calls.
pub type BlockHeight = u64;

/// Source of the current block height for a call.
pub trait BlockClock {
    fn current_height(&self) -> BlockHeight;
}

impl BlockClock for BlockHeight {
    fn current_height(&self) -> BlockHeight {
        *self
    }
}

impl<C: BlockClock + ?Sized> BlockClock for &C {
    fn current_height(&self) -> BlockHeight {
        (**self).current_height()
    }
}

/// Offline clock for dry runs and tests.
///
/// Height is a local counter that only moves when explicitly advanced, never
/// derived from confirmed network data.
#[derive(Debug, Default, Clone)]
pub struct LocalClock {
    height: Cell<BlockHeight>,
}

impl LocalClock {
    pub fn new(height: BlockHeight) -> Self {
        Self {
            height: Cell::new(height),
        }
    }

    /// Advance by `blocks`, saturating at `u64::MAX`.
    pub fn increment(&self, blocks: u64) -> BlockHeight {
        let next = self.height.get().saturating_add(blocks);
        self.height.set(next);
        next
    }

    /// Move forward to `height`. Returns false (and leaves the clock alone)
    /// if that would move the clock backwards.
    pub fn advance_to(&self, height: BlockHeight) -> bool {
        if height < self.height.get() {
            return false;
        }
        self.height.set(height);
        true
    }
}

impl BlockClock for LocalClock {
    fn current_height(&self) -> BlockHeight {
        self.height.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_clock_increments() {
        let clock = LocalClock::new(0);
        assert_eq!(clock.current_height(), 0);
        assert_eq!(clock.increment(1), 1);
        assert_eq!(clock.increment(2000), 2001);
        assert_eq!(clock.current_height(), 2001);
    }

    #[test]
    fn test_local_clock_never_moves_backwards() {
        let clock = LocalClock::new(50);
        assert!(!clock.advance_to(10));
        assert_eq!(clock.current_height(), 50);
        assert!(clock.advance_to(50));
        assert!(clock.advance_to(75));
        assert_eq!(clock.current_height(), 75);
    }

    #[test]
    fn test_fixed_height_is_a_clock() {
        let height: BlockHeight = 42;
        assert_eq!(height.current_height(), 42);
        assert_eq!((&height).current_height(), 42);
    }
}
