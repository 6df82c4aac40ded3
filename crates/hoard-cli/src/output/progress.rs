//! Progress display for multi-file operations.

use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

/// Single-line progress counter, drawn only on a terminal
pub struct ProgressBar {
    total: u64,
    current: u64,
    start_time: Instant,
    last_update: Option<Instant>,
    message: String,
    visible: bool,
}

impl ProgressBar {
    /// Create a new progress bar
    pub fn new(total: u64, message: impl Into<String>) -> Self {
        Self {
            total,
            current: 0,
            start_time: Instant::now(),
            last_update: None,
            message: message.into(),
            visible: io::stdout().is_terminal(),
        }
    }

    pub fn position(&self) -> u64 {
        self.current
    }

    /// Update progress
    pub fn update(&mut self, current: u64) {
        self.current = current.min(self.total);
        let now = Instant::now();

        // Redraw at most every 100ms
        let due = self
            .last_update
            .map_or(true, |last| now.duration_since(last) > Duration::from_millis(100));
        if due {
            self.display();
            self.last_update = Some(now);
        }
    }

    /// Increment progress by 1
    pub fn increment(&mut self) {
        self.update(self.current + 1);
    }

    /// Draw the final state and end the line
    pub fn finish(&self) {
        if self.visible {
            self.display();
            println!();
        }
    }

    pub fn percentage(&self) -> u64 {
        if self.total > 0 {
            self.current * 100 / self.total
        } else {
            100
        }
    }

    fn display(&self) {
        if !self.visible {
            return;
        }
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            self.current as f64 / elapsed
        } else {
            0.0
        };

        let mut stdout = io::stdout();
        // Progress output is best effort
        let _ = write!(
            stdout,
            "\r{} [{}/{}] {}% ({:.1}/s)",
            self.message,
            self.current,
            self.total,
            self.percentage(),
            rate
        );
        let _ = stdout.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counts() {
        let mut progress = ProgressBar::new(4, "Uploading");
        progress.increment();
        progress.increment();
        assert_eq!(progress.position(), 2);
        assert_eq!(progress.percentage(), 50);

        progress.update(10);
        assert_eq!(progress.position(), 4);
        assert_eq!(progress.percentage(), 100);
    }

    #[test]
    fn test_empty_total() {
        assert_eq!(ProgressBar::new(0, "Nothing").percentage(), 100);
    }
}
