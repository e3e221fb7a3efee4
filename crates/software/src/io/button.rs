//! Edge detection for momentary pushbuttons.

/// Turns a polled button level into one event per press.
///
/// The latch fires on the first poll that finds the button pressed and then stays quiet until a poll finds it
/// released again, which re-arms it. Contact bounce shorter than the polling interval is absorbed by this; no
/// further debouncing is attempted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeLatch {
    armed: bool,
}

impl EdgeLatch {
    /// Constructs an armed [`EdgeLatch`].
    pub fn new() -> Self {
        Self { armed: true }
    }

    /// Feeds the current button level; returns `true` exactly once per press.
    pub fn pressed(&mut self, is_down: bool) -> bool {
        match (is_down, self.armed) {
            (true, true) => {
                self.armed = false;
                true
            }
            (false, false) => {
                self.armed = true;
                false
            }
            _ => false,
        }
    }
}

impl Default for EdgeLatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_press() {
        let mut latch = EdgeLatch::new();
        assert!(latch.pressed(true), "first poll while down should fire");
        assert!(!latch.pressed(true), "held button should not fire again");
        assert!(!latch.pressed(true));
        assert!(!latch.pressed(false), "release should not fire");
        assert!(latch.pressed(true), "second press should fire");
    }

    #[test]
    fn idle_button_never_fires() {
        let mut latch = EdgeLatch::default();
        for _ in 0..10 {
            assert!(!latch.pressed(false));
        }
    }
}
