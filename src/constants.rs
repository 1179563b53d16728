//! Constants used throughout the engine

/// Number of keypoints in a full face mesh
pub const NUM_FACE_KEYPOINTS: usize = 468;

/// Mesh indices of the keypoints the geometry layer reads.
/// "Left" and "right" refer to image sides, not the subject's.
pub const NOSE_TIP: usize = 1;
pub const FOREHEAD: usize = 10;
pub const LEFT_EYE_OUTER: usize = 33;
pub const GLABELLA: usize = 168;
pub const CHIN: usize = 152;
pub const LEFT_EAR: usize = 234;
pub const RIGHT_EYE_OUTER: usize = 263;
pub const RIGHT_EAR: usize = 454;

/// Rec. 601 luma weights
pub const LUMA_RED: f64 = 0.299;
pub const LUMA_GREEN: f64 = 0.587;
pub const LUMA_BLUE: f64 = 0.114;

/// Default lighting parameters
pub const DEFAULT_MIN_BRIGHTNESS: f64 = 80.0;
pub const DEFAULT_BRIGHTNESS_REGION: f64 = 0.3;
pub const DEFAULT_BRIGHTNESS_STRIDE: u32 = 10;

/// Default coarse pose bounds
pub const DEFAULT_YAW_RATIO_MIN: f64 = 0.7;
pub const DEFAULT_YAW_RATIO_MAX: f64 = 1.4;
pub const DEFAULT_MAX_ROLL: f64 = 10.0;
pub const DEFAULT_PITCH_MIN: f64 = -10.0;
pub const DEFAULT_PITCH_MAX: f64 = 22.0;

/// Default framing tolerances (fractions of the frame)
pub const DEFAULT_MAX_GLABELLA_Y: f64 = 0.50;
pub const DEFAULT_IDEAL_GLABELLA_Y: f64 = 0.40;
pub const DEFAULT_VERTICAL_TOLERANCE: f64 = 0.12;
pub const DEFAULT_HORIZONTAL_TOLERANCE: f64 = 0.12;
pub const DEFAULT_MIN_SIZE_RATIO: f64 = 0.50;
pub const DEFAULT_MAX_SIZE_RATIO: f64 = 0.90;

/// Default guide box as fractions of the frame
pub const DEFAULT_GUIDE_WIDTH: f64 = 0.45;
pub const DEFAULT_GUIDE_HEIGHT: f64 = 0.6;

/// Default target-angle parameters (degrees)
pub const DEFAULT_ANGLE_TOLERANCE: f64 = 15.0;
pub const DEFAULT_SIDE_PITCH_FACTOR: f64 = 1.5;
pub const DEFAULT_MAX_SIDE_YAW: f64 = 60.0;

/// Default lock-on timing (milliseconds)
pub const DEFAULT_DWELL_MS: u64 = 3000;
pub const DEFAULT_COUNTDOWN_MS: u64 = 2000;

/// Default adaptive sampling parameters
pub const DEFAULT_MOTION_WINDOW: usize = 10;
pub const DEFAULT_HIGH_MOTION: f64 = 0.05;
pub const DEFAULT_LOW_MOTION: f64 = 0.01;
pub const DEFAULT_FAST_INTERVAL: u32 = 2;
pub const DEFAULT_NORMAL_INTERVAL: u32 = 3;
pub const DEFAULT_SLOW_INTERVAL: u32 = 5;
pub const DEFAULT_CACHE_POSITION_DELTA: f64 = 0.02;
pub const DEFAULT_ANGLE_CHANGE_THRESHOLD: f64 = 5.0;

/// Default stage durations (milliseconds)
pub const DEFAULT_SCANNING_MS: u64 = 3500;
pub const DEFAULT_PROCESSING_MS: u64 = 1500;

/// Nose position along the forehead-chin line for a level head
pub const NEUTRAL_NOSE_RATIO: f64 = 0.5;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
