//! Timing
//!
//! Wall-clock timing for kernel passes and host CPU detection.

use std::time::{Duration, Instant};

/// Timer for measuring a batch of kernel passes
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer
    #[inline(always)]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return the elapsed wall time
    #[inline(always)]
    pub fn stop(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Convert a duration to fractional milliseconds
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Number of logical CPUs, or 0 when the platform cannot tell
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = timer.stop();

        // Should be at least 5ms
        assert!(elapsed >= Duration::from_millis(5));
    }

    #[test]
    fn test_duration_ms() {
        assert!((duration_ms(Duration::from_micros(1500)) - 1.5).abs() < 1e-9);
        assert_eq!(duration_ms(Duration::ZERO), 0.0);
    }
}
