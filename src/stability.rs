//! Lock-on timer: turns a noisy per-frame validity stream into a single
//! capture trigger after a continuous dwell.

use crate::{config::StabilityConfig, Result};
use std::time::{Duration, Instant};

/// Result of feeding one frame to the timer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityUpdate {
    /// Continuous valid time so far
    pub elapsed: Duration,
    /// `elapsed / dwell`, clamped to `[0, 1]`
    pub progress: f64,
    /// Whole seconds left, only inside the countdown window
    pub countdown: Option<u64>,
    /// Set on exactly the frame that completed the dwell
    pub triggered: bool,
}

impl StabilityUpdate {
    fn idle() -> Self {
        Self {
            elapsed: Duration::ZERO,
            progress: 0.0,
            countdown: None,
            triggered: false,
        }
    }
}

/// Dwell timer owned by one capture session
#[derive(Debug, Clone)]
pub struct StabilityTimer {
    dwell: Duration,
    countdown_window: Duration,
    start: Option<Instant>,
    elapsed: Duration,
}

impl StabilityTimer {
    /// # Errors
    ///
    /// Returns an error if the dwell duration is zero
    pub fn new(config: &StabilityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            dwell: Duration::from_millis(config.dwell_ms),
            countdown_window: Duration::from_millis(config.countdown_ms),
            start: None,
            elapsed: Duration::ZERO,
        })
    }

    /// Feed one frame's validity
    pub fn update(&mut self, valid: bool, now: Instant) -> StabilityUpdate {
        if !valid {
            self.reset();
            return StabilityUpdate::idle();
        }

        let start = *self.start.get_or_insert(now);
        self.elapsed = now.saturating_duration_since(start);

        if self.elapsed >= self.dwell {
            log::debug!("Stability dwell reached after {:?}", self.elapsed);
            let elapsed = self.elapsed;
            self.reset();
            return StabilityUpdate {
                elapsed,
                progress: 1.0,
                countdown: None,
                triggered: true,
            };
        }

        let remaining = self.dwell - self.elapsed;
        let countdown = (remaining <= self.countdown_window).then(|| {
            let ms = remaining.as_millis() as u64;
            ms.div_ceil(1000)
        });

        StabilityUpdate {
            elapsed: self.elapsed,
            progress: self.progress(),
            countdown,
            triggered: false,
        }
    }

    /// Current progress in `[0, 1]`
    pub fn progress(&self) -> f64 {
        (self.elapsed.as_secs_f64() / self.dwell.as_secs_f64()).min(1.0)
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.elapsed = Duration::ZERO;
    }
}
