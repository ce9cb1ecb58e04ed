//! Completion progress for a day bucket and its console rendering.

use std::fmt::Write as _;

/// Width of the rendered bar in characters. Each cell is two percentage
/// points.
pub const BAR_WIDTH: usize = 50;

/// ANSI sequence that homes the cursor and clears the screen.
pub const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

/// Done and total task counts for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Tasks with `done = true`.
    pub done: u64,
    /// All tasks in the day bucket.
    pub total: u64,
}

impl Progress {
    /// Creates a progress snapshot.
    #[must_use]
    pub const fn new(done: u64, total: u64) -> Self {
        Self { done, total }
    }

    /// Completion percentage in `0.0..=100.0`.
    ///
    /// An empty day is reported as 0% rather than NaN.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.done as f64 / self.total as f64 * 100.0
    }

    /// Renders the bar line, e.g. `[=====     ...] 10.00%`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn bar(&self) -> String {
        let percent = self.percent();
        let mut line = String::with_capacity(BAR_WIDTH + 12);
        line.push('[');
        for i in 0..BAR_WIDTH {
            line.push(if ((i * 2) as f64) < percent { '=' } else { ' ' });
        }
        let _ = write!(line, "] {percent:.2}%");
        line
    }

    /// Renders the full console frame for `day`: clear sequence, header, and
    /// bar, terminated by a newline.
    #[must_use]
    pub fn frame(&self, day: &str) -> String {
        format!("{CLEAR_SCREEN}Progress for {day}:\n{}\n", self.bar())
    }
}
