//! Frame geometry derived from a keypoint set: face bounds, exposure and the
//! coarse symmetry-based pose used for live guidance.

use crate::{
    config::{GuidanceConfig, LightingConfig},
    constants::{
        EPSILON, LEFT_EAR, LEFT_EYE_OUTER, LUMA_BLUE, LUMA_GREEN, LUMA_RED, NOSE_TIP, RIGHT_EAR,
        RIGHT_EYE_OUTER,
    },
    keypoints::{FrameSize, KeypointSet},
    utils::{safe_cast::f64_to_u32_clamp, PixelSource},
};
use serde::Serialize;

/// Axis-aligned face box in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub center_x: f64,
    pub center_y: f64,
}

impl FaceBounds {
    /// Min/max over every keypoint, scaled to the frame resolution
    pub fn from_keypoints(keypoints: &KeypointSet, frame: FrameSize) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in keypoints.points() {
            let (px, py) = (p.x * frame.width, p.y * frame.height);
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        let width = max_x - min_x;
        let height = max_y - min_y;
        Self {
            x: min_x,
            y: min_y,
            width,
            height,
            center_x: min_x + width / 2.0,
            center_y: min_y + height / 2.0,
        }
    }
}

/// Mean luma (0-255) of the centered crop, sampled every `sample_stride` pixels.
///
/// Returns `None` for an empty frame.
pub fn sample_brightness<P: PixelSource + ?Sized>(frame: &P, config: &LightingConfig) -> Option<f64> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let region = config.sample_region.clamp(0.0, 1.0);
    let crop_w = f64::from(width) * region;
    let crop_h = f64::from(height) * region;
    let x0 = f64_to_u32_clamp((f64::from(width) - crop_w) / 2.0, 0, width - 1);
    let y0 = f64_to_u32_clamp((f64::from(height) - crop_h) / 2.0, 0, height - 1);
    let x1 = f64_to_u32_clamp(f64::from(x0) + crop_w, x0 + 1, width);
    let y1 = f64_to_u32_clamp(f64::from(y0) + crop_h, y0 + 1, height);
    let stride = config.sample_stride.max(1) as usize;

    let mut total = 0.0;
    let mut samples = 0u32;
    for y in (y0..y1).step_by(stride) {
        for x in (x0..x1).step_by(stride) {
            let [r, g, b] = frame.rgb(x, y);
            total += LUMA_RED * f64::from(r) + LUMA_GREEN * f64::from(g) + LUMA_BLUE * f64::from(b);
            samples += 1;
        }
    }

    (samples > 0).then(|| total / f64::from(samples))
}

/// Brightness verdict for the lighting check
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Exposure {
    /// Mean luma, `None` when the frame could not be sampled
    pub level: Option<f64>,
    pub too_dark: bool,
}

impl Exposure {
    pub fn measure<P: PixelSource + ?Sized>(frame: &P, config: &LightingConfig) -> Self {
        let level = sample_brightness(frame, config);
        Self {
            level,
            too_dark: level.map_or(false, |l| l < config.min_brightness),
        }
    }
}

/// Coarse pose from landmark symmetry. Cheap enough to run every frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuidancePose {
    /// `dist(nose, left ear) / dist(nose, right ear)`, 1.0 when symmetric
    pub yaw_ratio: f64,

    /// Unsigned eye-line tilt in degrees
    pub roll: f64,

    /// Vertical eye offset (right minus left, pixels); its sign picks the tilt side
    pub roll_delta_y: f64,

    /// `(noseY - earCenterY) * 100` in normalized coordinates
    pub pitch: f64,
}

impl GuidancePose {
    pub fn from_keypoints(keypoints: &KeypointSet, frame: FrameSize) -> Self {
        let nose = keypoints.pixel(NOSE_TIP, frame);
        let left_ear = keypoints.pixel(LEFT_EAR, frame);
        let right_ear = keypoints.pixel(RIGHT_EAR, frame);

        let to_left = distance(nose, left_ear);
        let to_right = distance(nose, right_ear);
        let yaw_ratio = if to_right < EPSILON {
            f64::INFINITY
        } else {
            to_left / to_right
        };

        let left_eye = keypoints.pixel(LEFT_EYE_OUTER, frame);
        let right_eye = keypoints.pixel(RIGHT_EYE_OUTER, frame);
        let dx = right_eye.0 - left_eye.0;
        let dy = right_eye.1 - left_eye.1;
        let roll = dy.abs().atan2(dx.abs()).to_degrees();

        let ear_center_y = (keypoints.get(LEFT_EAR).y + keypoints.get(RIGHT_EAR).y) / 2.0;
        let pitch = (keypoints.get(NOSE_TIP).y - ear_center_y) * 100.0;

        Self {
            yaw_ratio,
            roll,
            roll_delta_y: dy,
            pitch,
        }
    }
}

/// Named coarse pose checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoseCheck {
    Yaw,
    Roll,
    Pitch,
}

/// Evaluation order; the first failing check decides the instruction shown
pub const POSE_CHECK_ORDER: [PoseCheck; 3] = [PoseCheck::Yaw, PoseCheck::Roll, PoseCheck::Pitch];

/// Corrective instruction for a failed coarse pose check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PoseIssue {
    TurnLeft,
    TurnRight,
    TiltLeft,
    TiltRight,
    LowerChin,
    RaiseChin,
}

impl PoseCheck {
    /// Run a single check
    ///
    /// # Errors
    ///
    /// Returns the corrective instruction when the pose is outside the bounds
    pub fn run(self, pose: &GuidancePose, config: &GuidanceConfig) -> Result<(), PoseIssue> {
        match self {
            Self::Yaw if pose.yaw_ratio < config.yaw_ratio_min => Err(PoseIssue::TurnRight),
            Self::Yaw if pose.yaw_ratio > config.yaw_ratio_max || pose.yaw_ratio.is_nan() => {
                Err(PoseIssue::TurnLeft)
            }
            Self::Roll if pose.roll > config.max_roll => {
                if pose.roll_delta_y > 0.0 {
                    Err(PoseIssue::TiltLeft)
                } else {
                    Err(PoseIssue::TiltRight)
                }
            }
            Self::Pitch if pose.pitch < config.pitch_min => Err(PoseIssue::LowerChin),
            Self::Pitch if pose.pitch > config.pitch_max => Err(PoseIssue::RaiseChin),
            _ => Ok(()),
        }
    }
}

/// Run [`POSE_CHECK_ORDER`] and report the first failure
///
/// # Errors
///
/// Returns the first failing check's instruction
pub fn evaluate_pose(pose: &GuidancePose, config: &GuidanceConfig) -> Result<(), PoseIssue> {
    POSE_CHECK_ORDER.iter().try_for_each(|check| check.run(pose, config))
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}
