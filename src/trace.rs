//! Recorded keypoint traces for offline replay.
//!
//! A trace is a YAML document holding a frame resolution, a dictionary of
//! named face meshes, and a timeline of frames referring to those meshes by
//! name:
//!
//! ```yaml
//! width: 640
//! height: 480
//! faces:
//!   frontal: [{x: 0.5, y: 0.45}, ...]   # 468 points
//! frames:
//!   - {t_ms: 0, luma: 150, faces: [frontal]}
//!   - {t_ms: 100, luma: 150, faces: []}
//!   - {t_ms: 200, error: "backend timeout"}
//! ```

use crate::{
    constants::NUM_FACE_KEYPOINTS, inference::LandmarkDetector, keypoints::Keypoint, utils::SolidFrame, Error,
    Result,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, collections::VecDeque, fs, path::Path, time::Duration};

fn default_luma() -> u8 {
    150
}

/// One recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Milliseconds since the start of the trace
    pub t_ms: u64,
    /// Uniform brightness of the frame
    #[serde(default = "default_luma")]
    pub luma: u8,
    /// Names of meshes detected in this frame
    #[serde(default)]
    pub faces: Vec<String>,
    /// Inference failure recorded for this frame
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub faces: BTreeMap<String, Vec<Keypoint>>,
    pub frames: Vec<TraceFrame>,
}

impl Trace {
    /// Parse and validate a YAML trace
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the trace is inconsistent
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let trace: Self = serde_yaml::from_str(yaml)?;
        trace.validate()?;
        Ok(trace)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid trace
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error for a zero resolution, decreasing timestamps,
    /// undefined mesh names, or meshes without the full keypoint count
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidInput(format!(
                "Trace resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        for (name, mesh) in &self.faces {
            if mesh.len() != NUM_FACE_KEYPOINTS {
                return Err(Error::InvalidInput(format!(
                    "Face '{name}' has {} keypoints, expected {NUM_FACE_KEYPOINTS}",
                    mesh.len()
                )));
            }
        }
        let mut last = 0;
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.t_ms < last {
                return Err(Error::InvalidInput(format!("Frame {i} goes back in time ({} ms)", frame.t_ms)));
            }
            last = frame.t_ms;
            if let Some(name) = frame.faces.iter().find(|n| !self.faces.contains_key(*n)) {
                return Err(Error::InvalidInput(format!("Frame {i} refers to unknown face '{name}'")));
            }
        }
        Ok(())
    }

    /// Synthetic pixels for a frame
    pub fn image(&self, frame: &TraceFrame) -> SolidFrame {
        SolidFrame::gray(self.width, self.height, frame.luma)
    }

    /// Offset of a frame from the start of the trace
    pub fn offset(frame: &TraceFrame) -> Duration {
        Duration::from_millis(frame.t_ms)
    }

    /// What the detector reported for a frame
    ///
    /// # Errors
    ///
    /// Returns the recorded inference error, if any
    pub fn detections(&self, frame: &TraceFrame) -> Result<Vec<Vec<Keypoint>>> {
        if let Some(message) = &frame.error {
            return Err(Error::InferenceError(message.clone()));
        }
        Ok(frame
            .faces
            .iter()
            .filter_map(|name| self.faces.get(name).cloned())
            .collect())
    }

    /// Detector that replays this trace's results in order
    pub fn detector(&self) -> TraceDetector {
        TraceDetector {
            queue: self.frames.iter().map(|f| self.detections(f)).collect(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.frames.last().map_or(Duration::ZERO, Self::offset)
    }
}

/// [`LandmarkDetector`] returning recorded results one frame at a time
#[derive(Debug)]
pub struct TraceDetector {
    queue: VecDeque<Result<Vec<Vec<Keypoint>>>>,
}

impl TraceDetector {
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl LandmarkDetector<SolidFrame> for TraceDetector {
    fn detect(&mut self, _frame: &SolidFrame) -> Result<Vec<Vec<Keypoint>>> {
        self.queue.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }

    fn release(&mut self) {
        self.queue.clear();
    }

    fn name(&self) -> &str {
        "TraceDetector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::fixtures;

    fn trace() -> Trace {
        let mut faces = BTreeMap::new();
        faces.insert("frontal".to_string(), fixtures::frontal_points());
        Trace {
            width: 640,
            height: 480,
            faces,
            frames: vec![
                TraceFrame {
                    t_ms: 0,
                    luma: 150,
                    faces: vec!["frontal".into()],
                    error: None,
                },
                TraceFrame {
                    t_ms: 100,
                    luma: 40,
                    faces: Vec::new(),
                    error: None,
                },
                TraceFrame {
                    t_ms: 200,
                    luma: 150,
                    faces: Vec::new(),
                    error: Some("timeout".into()),
                },
            ],
        }
    }

    #[test]
    fn test_yaml_round_trip() {
        let original = trace();
        let yaml = serde_yaml::to_string(&original).unwrap();
        assert_eq!(Trace::from_yaml(&yaml).unwrap(), original);
    }

    #[test]
    fn test_frame_defaults() {
        let yaml = "width: 320\nheight: 240\nframes:\n  - t_ms: 5\n";
        let trace = Trace::from_yaml(yaml).unwrap();
        assert_eq!(trace.frames[0].luma, 150);
        assert!(trace.frames[0].faces.is_empty());
        assert_eq!(trace.duration(), Duration::from_millis(5));
    }

    #[test]
    fn test_rejects_unknown_face() {
        let mut t = trace();
        t.frames[1].faces.push("profile".into());
        assert!(matches!(t.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_time_travel() {
        let mut t = trace();
        t.frames[2].t_ms = 50;
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_rejects_short_mesh() {
        let mut t = trace();
        t.faces.insert("tiny".into(), vec![Keypoint::new(0.5, 0.5); 10]);
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_detector_replays_in_order() {
        let t = trace();
        let mut detector = t.detector();
        let frame = t.image(&t.frames[0]);
        assert_eq!(detector.detect(&frame).unwrap().len(), 1);
        assert!(detector.detect(&frame).unwrap().is_empty());
        assert!(matches!(detector.detect(&frame), Err(Error::InferenceError(_))));
        assert!(detector.detect(&frame).unwrap().is_empty());
        assert_eq!(detector.remaining(), 0);
    }
}
