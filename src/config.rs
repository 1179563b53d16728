//! Configuration management for the capture engine
//!
//! Every threshold the engine uses lives here. Components validate their own
//! section when constructed, so a bad value fails before the first frame.

use crate::{constants::*, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Brightness gate
    pub lighting: LightingConfig,

    /// Coarse pose bounds for on-screen guidance
    pub guidance: GuidanceConfig,

    /// Position and distance tolerances
    pub framing: FramingConfig,

    /// Default guide box geometry
    pub guide: GuideConfig,

    /// Target-angle validation
    pub angle: AngleConfig,

    /// Lock-on timing
    pub stability: StabilityConfig,

    /// Adaptive sampling of the fine angle path
    pub sampling: SamplingConfig,

    /// Capture stage durations
    pub stages: StageConfig,
}

/// Brightness gate parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Minimum mean luma (0-255) of the center crop
    pub min_brightness: f64,

    /// Side of the centered crop as a fraction of the frame
    pub sample_region: f64,

    /// Pixel stride inside the crop
    pub sample_stride: u32,
}

/// Coarse pose bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuidanceConfig {
    /// Lower bound of the nose-to-ear distance ratio
    pub yaw_ratio_min: f64,

    /// Upper bound of the nose-to-ear distance ratio
    pub yaw_ratio_max: f64,

    /// Maximum eye-line tilt in degrees
    pub max_roll: f64,

    /// Lowest accepted nose-below-ears offset (chin up)
    pub pitch_min: f64,

    /// Highest accepted nose-below-ears offset (chin down)
    pub pitch_max: f64,
}

/// Position and distance tolerances, all fractions of the frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Glabella y beyond which the device must be raised
    pub max_glabella_y: f64,

    /// Ideal glabella y
    pub ideal_glabella_y: f64,

    /// Allowed deviation from the ideal y
    pub vertical_tolerance: f64,

    /// Allowed glabella offset from the guide center, in frame widths
    pub horizontal_tolerance: f64,

    /// Smallest accepted face width / guide width
    pub min_size_ratio: f64,

    /// Largest accepted face width / guide width
    pub max_size_ratio: f64,
}

/// Guide box used when the host does not supply one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Guide width as a fraction of the frame width
    pub width_fraction: f64,

    /// Guide height as a fraction of the frame height
    pub height_fraction: f64,
}

/// Target-angle validation parameters (degrees)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AngleConfig {
    /// Base tolerance
    pub tolerance: f64,

    /// Pitch tolerance multiplier for side targets
    pub side_pitch_factor: f64,

    /// Yaw beyond which a side pose is too far turned
    pub max_side_yaw: f64,
}

/// Lock-on timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Continuous validity required before capture fires
    pub dwell_ms: u64,

    /// Countdown window at the end of the dwell
    pub countdown_ms: u64,
}

/// Adaptive sampling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Number of displacement samples kept
    pub window_size: usize,

    /// Mean motion above which the fast interval is used
    pub high_motion: f64,

    /// Mean motion below which the slow interval is used
    pub low_motion: f64,

    /// Detect every Nth frame under high motion
    pub fast_interval: u32,

    /// Detect every Nth frame under moderate motion
    pub normal_interval: u32,

    /// Detect every Nth frame when nearly still
    pub slow_interval: u32,

    /// Max per-axis position change (fraction of frame) for cache reuse
    pub cache_position_delta: f64,

    /// Per-axis angle change (degrees) treated as a genuine pose change
    pub angle_change_threshold: f64,
}

/// Capture stage durations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Frozen-frame scanning phase
    pub scanning_ms: u64,

    /// Processing phase
    pub processing_ms: u64,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            min_brightness: DEFAULT_MIN_BRIGHTNESS,
            sample_region: DEFAULT_BRIGHTNESS_REGION,
            sample_stride: DEFAULT_BRIGHTNESS_STRIDE,
        }
    }
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            yaw_ratio_min: DEFAULT_YAW_RATIO_MIN,
            yaw_ratio_max: DEFAULT_YAW_RATIO_MAX,
            max_roll: DEFAULT_MAX_ROLL,
            pitch_min: DEFAULT_PITCH_MIN,
            pitch_max: DEFAULT_PITCH_MAX,
        }
    }
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_glabella_y: DEFAULT_MAX_GLABELLA_Y,
            ideal_glabella_y: DEFAULT_IDEAL_GLABELLA_Y,
            vertical_tolerance: DEFAULT_VERTICAL_TOLERANCE,
            horizontal_tolerance: DEFAULT_HORIZONTAL_TOLERANCE,
            min_size_ratio: DEFAULT_MIN_SIZE_RATIO,
            max_size_ratio: DEFAULT_MAX_SIZE_RATIO,
        }
    }
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            width_fraction: DEFAULT_GUIDE_WIDTH,
            height_fraction: DEFAULT_GUIDE_HEIGHT,
        }
    }
}

impl Default for AngleConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_ANGLE_TOLERANCE,
            side_pitch_factor: DEFAULT_SIDE_PITCH_FACTOR,
            max_side_yaw: DEFAULT_MAX_SIDE_YAW,
        }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            dwell_ms: DEFAULT_DWELL_MS,
            countdown_ms: DEFAULT_COUNTDOWN_MS,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_MOTION_WINDOW,
            high_motion: DEFAULT_HIGH_MOTION,
            low_motion: DEFAULT_LOW_MOTION,
            fast_interval: DEFAULT_FAST_INTERVAL,
            normal_interval: DEFAULT_NORMAL_INTERVAL,
            slow_interval: DEFAULT_SLOW_INTERVAL,
            cache_position_delta: DEFAULT_CACHE_POSITION_DELTA,
            angle_change_threshold: DEFAULT_ANGLE_CHANGE_THRESHOLD,
        }
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            scanning_ms: DEFAULT_SCANNING_MS,
            processing_ms: DEFAULT_PROCESSING_MS,
        }
    }
}

fn require(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::ConfigError(message.to_string()))
    }
}

impl LightingConfig {
    /// # Errors
    ///
    /// Returns an error if the threshold, region or stride is out of range
    pub fn validate(&self) -> Result<()> {
        require(
            (0.0..=255.0).contains(&self.min_brightness),
            "Minimum brightness must be between 0 and 255",
        )?;
        require(
            self.sample_region > 0.0 && self.sample_region <= 1.0,
            "Brightness sample region must be in (0, 1]",
        )?;
        require(self.sample_stride > 0, "Brightness sample stride must be greater than 0")
    }
}

impl GuidanceConfig {
    /// # Errors
    ///
    /// Returns an error if a bound pair is inverted or the roll limit is not positive
    pub fn validate(&self) -> Result<()> {
        require(
            self.yaw_ratio_min > 0.0 && self.yaw_ratio_min < self.yaw_ratio_max,
            "Yaw ratio bounds must satisfy 0 < min < max",
        )?;
        require(self.max_roll > 0.0, "Maximum roll must be greater than 0")?;
        require(self.pitch_min < self.pitch_max, "Pitch minimum must be below pitch maximum")
    }
}

impl FramingConfig {
    /// # Errors
    ///
    /// Returns an error if a tolerance is not positive or the size range is inverted
    pub fn validate(&self) -> Result<()> {
        require(
            self.vertical_tolerance > 0.0 && self.horizontal_tolerance > 0.0,
            "Position tolerances must be greater than 0",
        )?;
        require(
            (0.0..=1.0).contains(&self.ideal_glabella_y) && (0.0..=1.0).contains(&self.max_glabella_y),
            "Glabella positions must be between 0.0 and 1.0",
        )?;
        require(
            self.min_size_ratio > 0.0 && self.min_size_ratio < self.max_size_ratio,
            "Size ratio bounds must satisfy 0 < min < max",
        )
    }
}

impl GuideConfig {
    /// # Errors
    ///
    /// Returns an error if a fraction is outside (0, 1]
    pub fn validate(&self) -> Result<()> {
        require(
            self.width_fraction > 0.0 && self.width_fraction <= 1.0,
            "Guide width fraction must be in (0, 1]",
        )?;
        require(
            self.height_fraction > 0.0 && self.height_fraction <= 1.0,
            "Guide height fraction must be in (0, 1]",
        )
    }
}

impl AngleConfig {
    /// # Errors
    ///
    /// Returns an error if the tolerance is not positive or leaves no room for side poses
    pub fn validate(&self) -> Result<()> {
        require(self.tolerance > 0.0, "Angle tolerance must be greater than 0")?;
        require(self.side_pitch_factor > 0.0, "Side pitch factor must be greater than 0")?;
        require(
            self.max_side_yaw > self.tolerance,
            "Maximum side yaw must exceed the angle tolerance",
        )
    }
}

impl StabilityConfig {
    /// # Errors
    ///
    /// Returns an error if the dwell duration is zero
    pub fn validate(&self) -> Result<()> {
        require(self.dwell_ms > 0, "Dwell duration must be greater than 0")
    }
}

impl SamplingConfig {
    /// # Errors
    ///
    /// Returns an error if the window or an interval is zero or the motion bands overlap
    pub fn validate(&self) -> Result<()> {
        require(self.window_size > 0, "Motion window size must be greater than 0")?;
        require(
            self.low_motion >= 0.0 && self.low_motion <= self.high_motion,
            "Motion bands must satisfy 0 <= low <= high",
        )?;
        require(
            self.fast_interval > 0 && self.normal_interval > 0 && self.slow_interval > 0,
            "Skip intervals must be greater than 0",
        )?;
        require(
            self.cache_position_delta > 0.0,
            "Cache position delta must be greater than 0",
        )?;
        require(
            self.angle_change_threshold > 0.0,
            "Angle change threshold must be greater than 0",
        )
    }
}

impl StageConfig {
    /// # Errors
    ///
    /// Returns an error if a stage duration is zero
    pub fn validate(&self) -> Result<()> {
        require(
            self.scanning_ms > 0 && self.processing_ms > 0,
            "Stage durations must be greater than 0",
        )
    }
}

impl Config {
    /// Tighter bands for controlled environments
    pub fn strict() -> Self {
        Self {
            angle: AngleConfig {
                tolerance: 10.0,
                ..AngleConfig::default()
            },
            framing: FramingConfig {
                vertical_tolerance: 0.08,
                horizontal_tolerance: 0.08,
                ..FramingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Looser bands and a shorter dwell for hand-held use
    pub fn lenient() -> Self {
        Self {
            angle: AngleConfig {
                tolerance: 20.0,
                ..AngleConfig::default()
            },
            stability: StabilityConfig {
                dwell_ms: 2000,
                ..StabilityConfig::default()
            },
            ..Self::default()
        }
    }

    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate every section
    ///
    /// # Errors
    ///
    /// Returns the first section error found
    pub fn validate(&self) -> Result<()> {
        self.lighting.validate()?;
        self.guidance.validate()?;
        self.framing.validate()?;
        self.guide.validate()?;
        self.angle.validate()?;
        self.stability.validate()?;
        self.sampling.validate()?;
        self.stages.validate()
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face Capture Engine Configuration

# Brightness gate
lighting:
  min_brightness: 80.0
  sample_region: 0.3
  sample_stride: 10

# Coarse pose bounds for guidance
guidance:
  yaw_ratio_min: 0.7
  yaw_ratio_max: 1.4
  max_roll: 10.0
  pitch_min: -10.0
  pitch_max: 22.0

# Position and distance
framing:
  max_glabella_y: 0.5
  ideal_glabella_y: 0.4
  vertical_tolerance: 0.12
  horizontal_tolerance: 0.12
  min_size_ratio: 0.5
  max_size_ratio: 0.9

# Default guide box
guide:
  width_fraction: 0.45
  height_fraction: 0.6

# Target angle validation
angle:
  tolerance: 15.0
  side_pitch_factor: 1.5
  max_side_yaw: 60.0

# Lock-on timing
stability:
  dwell_ms: 3000
  countdown_ms: 2000

# Adaptive sampling
sampling:
  window_size: 10
  high_motion: 0.05
  low_motion: 0.01
  fast_interval: 2
  normal_interval: 3
  slow_interval: 5
  cache_position_delta: 0.02
  angle_change_threshold: 5.0

# Capture stages
stages:
  scanning_ms: 3500
  processing_ms: 1500
"#;
