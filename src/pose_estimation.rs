//! Fine head pose from nose, eye, chin and forehead keypoints.
//!
//! When every required keypoint carries depth, a face basis is built from the
//! eye line and the forehead-chin line and converted to Euler angles. Without
//! depth the angles fall back to planar trigonometry on the same keypoints.
//!
//! Sign conventions: yaw is negative when the nose points toward image-left,
//! pitch is positive when the face tilts down, roll is positive when the
//! image-right eye sits lower.

use crate::{
    constants::{CHIN, EPSILON, FOREHEAD, LEFT_EYE_OUTER, NEUTRAL_NOSE_RATIO, NOSE_TIP, RIGHT_EYE_OUTER},
    keypoints::{FrameSize, Keypoint, KeypointSet},
};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseAngles {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl PoseAngles {
    pub const fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Largest per-axis absolute difference
    pub fn max_delta(&self, other: &Self) -> f64 {
        (self.yaw - other.yaw)
            .abs()
            .max((self.pitch - other.pitch).abs())
            .max((self.roll - other.roll).abs())
    }
}

/// Estimate head pose from a validated keypoint set.
///
/// Returns `None` when the reference keypoints are degenerate (coincident
/// eyes, zero face height, or a nose that does not stand out toward the
/// camera on a depth mesh).
pub fn estimate_pose(keypoints: &KeypointSet, frame: FrameSize) -> Option<PoseAngles> {
    let required = [NOSE_TIP, LEFT_EYE_OUTER, RIGHT_EYE_OUTER, FOREHEAD, CHIN];
    let aspect = frame.height / frame.width;

    if required.iter().all(|&i| keypoints.get(i).z.is_some()) {
        let point = |i: usize| to_vector(keypoints.get(i), aspect);
        estimate_from_depth(
            point(NOSE_TIP),
            point(LEFT_EYE_OUTER),
            point(RIGHT_EYE_OUTER),
            point(FOREHEAD),
            point(CHIN),
        )
    } else {
        estimate_planar(keypoints, frame)
    }
}

/// Points in a width-normalized space so that x, y and z share one scale
fn to_vector(p: Keypoint, aspect: f64) -> Vector3<f64> {
    Vector3::new(p.x, p.y * aspect, p.z.unwrap_or(0.0))
}

fn estimate_from_depth(
    nose: Vector3<f64>,
    left_eye: Vector3<f64>,
    right_eye: Vector3<f64>,
    forehead: Vector3<f64>,
    chin: Vector3<f64>,
) -> Option<PoseAngles> {
    let across = right_eye - left_eye;
    if across.norm() < EPSILON {
        return None;
    }
    let x_axis = across.normalize();

    // Gram-Schmidt: face "down" direction orthogonal to the eye line
    let down = chin - forehead;
    let down = down - x_axis * down.dot(&x_axis);
    if down.norm() < EPSILON {
        return None;
    }
    let y_axis = down.normalize();
    let z_axis = x_axis.cross(&y_axis);

    // z points away from the camera; the nose tip must lie in front of the eyes
    let eye_mid = (left_eye + right_eye) / 2.0;
    if (nose - eye_mid).dot(&z_axis) >= 0.0 {
        return None;
    }

    let rotation = Matrix3::from_columns(&[x_axis, y_axis, z_axis]);
    Some(rotation_matrix_to_euler(&rotation))
}

/// Convert a face basis rotation matrix to Euler angles
pub fn rotation_matrix_to_euler(rotation: &Matrix3<f64>) -> PoseAngles {
    let r13 = rotation[(0, 2)];
    let r21 = rotation[(1, 0)];
    let r22 = rotation[(1, 1)];
    let r23 = rotation[(1, 2)];
    let r33 = rotation[(2, 2)];

    let pitch = (-r23).clamp(-1.0, 1.0).asin();
    let yaw = (-r13).atan2(r33);
    let roll = r21.atan2(r22);

    PoseAngles::new(yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees())
}

fn estimate_planar(keypoints: &KeypointSet, frame: FrameSize) -> Option<PoseAngles> {
    let (lx, ly) = keypoints.pixel(LEFT_EYE_OUTER, frame);
    let (rx, ry) = keypoints.pixel(RIGHT_EYE_OUTER, frame);
    let (nx, _) = keypoints.pixel(NOSE_TIP, frame);

    let half_span = (rx - lx).hypot(ry - ly) / 2.0;
    if half_span < EPSILON {
        return None;
    }
    let mid_x = (lx + rx) / 2.0;
    let yaw = ((nx - mid_x) / half_span).clamp(-1.0, 1.0).asin();

    let top = keypoints.get(FOREHEAD).y;
    let bottom = keypoints.get(CHIN).y;
    let face_height = bottom - top;
    if face_height.abs() < EPSILON {
        return None;
    }
    let nose_ratio = (keypoints.get(NOSE_TIP).y - top) / face_height;
    let pitch = (2.0 * (nose_ratio - NEUTRAL_NOSE_RATIO)).clamp(-1.0, 1.0).asin();

    let roll = (ry - ly).atan2(rx - lx);

    Some(PoseAngles::new(yaw.to_degrees(), pitch.to_degrees(), roll.to_degrees()))
}
