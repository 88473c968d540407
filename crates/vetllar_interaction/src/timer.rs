//! # Schedules
//!
//! Two independently switchable clocks:
//!
//! - [`PollTimer`]: coarse, fires once per interval. Drives focus scans.
//! - [`ProgressTimer`]: per-frame accumulator. Drives interaction progress.
//!
//! Both are advanced by the host's update loop with the frame delta and do
//! nothing while disabled.

/// Fires at most once per `interval` seconds while enabled.
#[derive(Clone, Debug)]
pub struct PollTimer {
    interval: f32,
    accumulated: f32,
    enabled: bool,
}

impl PollTimer {
    /// Creates a disabled timer.
    #[must_use]
    pub const fn new(interval: f32) -> Self {
        Self {
            interval,
            accumulated: 0.0,
            enabled: false,
        }
    }

    /// Polling interval in seconds.
    #[inline]
    #[must_use]
    pub const fn interval(&self) -> f32 {
        self.interval
    }

    /// Returns true while the timer is running.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts or stops the timer. Re-enabling restarts the interval.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.accumulated = 0.0;
        }
        self.enabled = enabled;
    }

    /// Advances by `dt`. Returns true when the interval elapsed.
    ///
    /// A long frame fires once; missed polls are not replayed.
    pub fn advance(&mut self, dt: f32) -> bool {
        if !self.enabled {
            return false;
        }
        self.accumulated += dt.max(0.0);
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated -= self.interval;
        if self.accumulated >= self.interval {
            self.accumulated = 0.0;
        }
        true
    }
}

/// Accumulates frame time toward a fixed duration.
#[derive(Clone, Debug, Default)]
pub struct ProgressTimer {
    elapsed: f32,
    enabled: bool,
}

impl ProgressTimer {
    /// Creates a stopped timer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elapsed: 0.0,
            enabled: false,
        }
    }

    /// Seconds accumulated since the last start.
    #[inline]
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Returns true while accumulating.
    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Starts accumulating from the current elapsed time.
    pub fn start(&mut self) {
        self.enabled = true;
    }

    /// Stops accumulating and resets to zero.
    pub fn stop(&mut self) {
        self.enabled = false;
        self.elapsed = 0.0;
    }

    /// Advances by `dt`, clamping to `duration`.
    ///
    /// Returns true once `duration` has been reached.
    pub fn advance(&mut self, dt: f32, duration: f32) -> bool {
        if !self.enabled {
            return false;
        }
        self.elapsed += dt.max(0.0);
        if self.elapsed >= duration {
            self.elapsed = duration;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timer_disabled_never_fires() {
        let mut timer = PollTimer::new(0.25);
        assert!(!timer.advance(10.0));
    }

    #[test]
    fn test_poll_timer_fires_each_interval() {
        let mut timer = PollTimer::new(0.25);
        timer.set_enabled(true);
        assert!(!timer.advance(0.125));
        assert!(timer.advance(0.125));
        assert!(!timer.advance(0.125));
        assert!(timer.advance(0.125));
    }

    #[test]
    fn test_poll_timer_long_frame_fires_once() {
        let mut timer = PollTimer::new(0.25);
        timer.set_enabled(true);
        assert!(timer.advance(5.0));
        assert!(!timer.advance(0.0));
    }

    #[test]
    fn test_progress_timer_clamps() {
        let mut timer = ProgressTimer::new();
        timer.start();
        assert!(!timer.advance(0.5, 1.0));
        assert!(timer.advance(0.75, 1.0));
        assert_eq!(timer.elapsed(), 1.0);

        timer.stop();
        assert_eq!(timer.elapsed(), 0.0);
        assert!(!timer.advance(5.0, 1.0));
    }
}
