//! Validated face keypoint sets.
//!
//! The inference backend hands back loosely shaped point lists. Nothing
//! enters the geometry layer until it has passed [`KeypointSet::new`]:
//! exactly [`NUM_FACE_KEYPOINTS`] points with finite coordinates.

use crate::{constants::NUM_FACE_KEYPOINTS, Error, Result};
use serde::{Deserialize, Serialize};

/// One normalized face landmark. `x`/`y` are frame-relative in `0..=1`,
/// `z` is relative depth when the backend provides it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Keypoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub const fn with_depth(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// Frame resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: f64,
    pub height: f64,
}

impl FrameSize {
    /// # Errors
    ///
    /// Returns an error if either dimension is not a positive finite number
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::InvalidInput(format!(
                "Frame size must be positive, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Larger of the two dimensions
    pub fn max_side(&self) -> f64 {
        self.width.max(self.height)
    }
}

/// Exactly one face worth of keypoints
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointSet {
    points: Vec<Keypoint>,
}

impl KeypointSet {
    /// Validate a raw point list.
    ///
    /// # Errors
    ///
    /// Returns an error if the count differs from [`NUM_FACE_KEYPOINTS`] or any
    /// coordinate is NaN or infinite.
    pub fn new(points: Vec<Keypoint>) -> Result<Self> {
        if points.len() != NUM_FACE_KEYPOINTS {
            return Err(Error::InvalidInput(format!(
                "Expected {} keypoints, got {}",
                NUM_FACE_KEYPOINTS,
                points.len()
            )));
        }
        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            return Err(Error::InvalidInput(format!("Keypoint {idx} has a non-finite coordinate")));
        }
        Ok(Self { points })
    }

    /// Reduce a detector result to the single usable face, if any.
    ///
    /// Zero faces, more than one face, or a malformed face all map to `None`.
    pub fn from_faces(faces: Vec<Vec<Keypoint>>) -> Option<Self> {
        if faces.len() > 1 {
            log::debug!("{} faces in frame, treating as no usable face", faces.len());
            return None;
        }
        let face = faces.into_iter().next()?;
        match Self::new(face) {
            Ok(set) => Some(set),
            Err(e) => {
                log::debug!("Rejected keypoint payload: {e}");
                None
            }
        }
    }

    /// Keypoint by mesh index. Indices are always in range once validated.
    pub fn get(&self, index: usize) -> Keypoint {
        self.points[index]
    }

    pub fn points(&self) -> &[Keypoint] {
        &self.points
    }

    /// Pixel position of a keypoint
    pub fn pixel(&self, index: usize, frame: FrameSize) -> (f64, f64) {
        let p = self.points[index];
        (p.x * frame.width, p.y * frame.height)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_count() {
        assert!(KeypointSet::new(vec![Keypoint::new(0.5, 0.5); 467]).is_err());
        assert!(KeypointSet::new(vec![Keypoint::new(0.5, 0.5); 469]).is_err());
        assert!(KeypointSet::new(Vec::new()).is_err());
        assert!(KeypointSet::new(vec![Keypoint::new(0.5, 0.5); NUM_FACE_KEYPOINTS]).is_ok());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut points = fixtures::frontal_points();
        points[100] = Keypoint::new(f64::NAN, 0.5);
        assert!(KeypointSet::new(points).is_err());

        let mut points = fixtures::frontal_points();
        points[7] = Keypoint::with_depth(0.5, 0.5, f64::INFINITY);
        assert!(KeypointSet::new(points).is_err());
    }

    #[test]
    fn test_from_faces() {
        assert!(KeypointSet::from_faces(Vec::new()).is_none());
        assert!(KeypointSet::from_faces(vec![fixtures::frontal_points()]).is_some());
        assert!(KeypointSet::from_faces(vec![fixtures::frontal_points(), fixtures::frontal_points()]).is_none());
        assert!(KeypointSet::from_faces(vec![vec![Keypoint::new(0.5, 0.5); 10]]).is_none());
    }

    #[test]
    fn test_frame_size_validation() {
        assert!(FrameSize::new(0.0, 480.0).is_err());
        assert!(FrameSize::new(640.0, -1.0).is_err());
        assert!(FrameSize::new(f64::NAN, 480.0).is_err());
        assert_eq!(FrameSize::new(640.0, 480.0).unwrap().max_side(), 640.0);
    }
}
