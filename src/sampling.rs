//! Adaptive sampling of the fine angle path.
//!
//! Face-center motion over a rolling window decides how often the fine pose
//! estimate is recomputed. In between, the last result is reused as long as
//! the face has not moved, and small angle changes on a fresh estimate are
//! treated as noise.

use crate::{
    config::SamplingConfig,
    keypoints::FrameSize,
    pose_estimation::PoseAngles,
    Result,
};
use std::collections::VecDeque;

/// Rolling window of normalized face-center displacement
#[derive(Debug, Clone)]
pub struct MotionHistory {
    window_size: usize,
    samples: VecDeque<f64>,
}

impl MotionHistory {
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            samples: VecDeque::with_capacity(window_size),
        }
    }

    pub fn push(&mut self, displacement: f64) {
        if self.samples.len() >= self.window_size {
            self.samples.pop_front();
        }
        self.samples.push_back(displacement);
    }

    /// Mean displacement, `None` while empty
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Last fine angle and its target classification
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedAngle {
    pub angles: PoseAngles,
    pub valid: bool,
}

/// What to do about the fine angle on this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingDecision {
    /// Compute a fresh fine angle and hand it to [`AdaptiveSampler::record_detection`]
    Detect,
    /// Skip frame with a still face; use the cached result
    Reuse(CachedAngle),
    /// Skip frame after a jump; the cache was dropped and no angle is known
    Invalidated,
}

/// Per-session sampling state
#[derive(Debug, Clone)]
pub struct AdaptiveSampler {
    config: SamplingConfig,
    history: MotionHistory,
    last_center: Option<(f64, f64)>,
    frames_since_detect: u32,
    cache: Option<CachedAngle>,
}

impl AdaptiveSampler {
    /// # Errors
    ///
    /// Returns an error if the sampling configuration is invalid
    pub fn new(config: SamplingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history: MotionHistory::new(config.window_size),
            config,
            last_center: None,
            frames_since_detect: 0,
            cache: None,
        })
    }

    /// Map mean motion to a detection interval
    pub fn interval_for(&self, mean_motion: f64) -> u32 {
        if mean_motion > self.config.high_motion {
            self.config.fast_interval
        } else if mean_motion < self.config.low_motion {
            self.config.slow_interval
        } else {
            self.config.normal_interval
        }
    }

    /// Current detection interval (slow when no motion has been observed)
    pub fn skip_interval(&self) -> u32 {
        self.interval_for(self.history.mean().unwrap_or(0.0))
    }

    /// Feed the face center (pixels) of a frame that has a face
    pub fn observe(&mut self, center: (f64, f64), frame: FrameSize) -> SamplingDecision {
        let previous = self.last_center.replace(center);
        if let Some(prev) = previous {
            let displacement = (center.0 - prev.0).hypot(center.1 - prev.1) / frame.max_side();
            self.history.push(displacement);
        }

        let interval = self.skip_interval();
        self.frames_since_detect = self.frames_since_detect.saturating_add(1);

        let Some(cached) = self.cache else {
            self.frames_since_detect = 0;
            return SamplingDecision::Detect;
        };
        if self.frames_since_detect >= interval {
            self.frames_since_detect = 0;
            return SamplingDecision::Detect;
        }

        let still = previous.map_or(false, |prev| {
            (center.0 - prev.0).abs() < self.config.cache_position_delta * frame.width
                && (center.1 - prev.1).abs() < self.config.cache_position_delta * frame.height
        });
        if still {
            SamplingDecision::Reuse(cached)
        } else {
            log::debug!("Face moved on a skip frame, dropping angle cache");
            self.cache = None;
            self.history.clear();
            SamplingDecision::Invalidated
        }
    }

    /// Store a fresh fine angle. Returns the classification to act on.
    ///
    /// A change larger than the threshold on any axis replaces the cache;
    /// anything smaller keeps the previous classification.
    pub fn record_detection(&mut self, angles: Option<PoseAngles>, valid: bool) -> Option<CachedAngle> {
        let Some(angles) = angles else {
            self.cache = None;
            return None;
        };
        let fresh = CachedAngle { angles, valid };
        match self.cache {
            Some(prev) if prev.angles.max_delta(&angles) <= self.config.angle_change_threshold => Some(prev),
            _ => {
                self.cache = Some(fresh);
                Some(fresh)
            }
        }
    }

    /// No usable face: forget everything
    pub fn invalidate(&mut self) {
        self.cache = None;
        self.last_center = None;
        self.frames_since_detect = 0;
        self.history.clear();
    }

    pub fn cached(&self) -> Option<CachedAngle> {
        self.cache
    }

    pub fn history(&self) -> &MotionHistory {
        &self.history
    }
}
