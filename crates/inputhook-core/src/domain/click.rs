//! Multi-click counting and drag/move discrimination.
//!
//! [`ClickState`] is the only cross-event state the pipeline keeps.  It is
//! owned by the pipeline and mutated only on the worker thread that receives
//! native events, so it needs no locking.

use std::time::Duration;

/// Click counter and drag flag for one capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickState {
    threshold_ms: u64,
    last_click_ms: u64,
    click_count: u16,
    dragging: bool,
}

impl ClickState {
    /// Creates an empty tracker with the given multi-click threshold.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold_ms: u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX),
            last_click_ms: 0,
            click_count: 0,
            dragging: false,
        }
    }

    /// Records a physical button press at `time_ms` and returns the new count.
    ///
    /// A press within the threshold of the previous one continues the click
    /// sequence; anything slower starts a new sequence at 1.
    pub fn register_press(&mut self, time_ms: u64) -> u16 {
        if self.elapsed_since_click(time_ms) <= self.threshold_ms {
            self.click_count = self.click_count.saturating_add(1);
        } else {
            self.click_count = 1;
        }
        self.last_click_ms = time_ms;
        self.click_count
    }

    /// Records pointer motion at `time_ms`.
    ///
    /// Drops the click count to 0 once the threshold has passed and latches
    /// the drag flag from `buttons_held`.
    pub fn register_motion(&mut self, time_ms: u64, buttons_held: bool) {
        if self.click_count != 0 && self.elapsed_since_click(time_ms) > self.threshold_ms {
            self.click_count = 0;
        }
        self.dragging = buttons_held;
    }

    pub fn click_count(&self) -> u16 {
        self.click_count
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.threshold_ms)
    }

    // Clock skew between events (time going backwards) counts as zero gap.
    fn elapsed_since_click(&self, time_ms: u64) -> u64 {
        time_ms.saturating_sub(self.last_click_ms)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
