//! Face alignment guidance and adaptive auto-capture.
//!
//! The engine consumes 468-point face meshes from a landmark backend, one
//! frame at a time, and decides:
//! - whether the face is lit, framed, sized and posed well enough to capture,
//!   and which single instruction to show the user when it is not
//! - whether the head is turned to a requested target angle (front, left, right)
//! - when the face has been held steady long enough to trigger a capture
//!
//! Fine head-pose estimation is sampled adaptively: frames with little motion
//! reuse the last result, fast motion forces a fresh estimate.
//!
//! # Examples
//!
//! ## Single capture
//!
//! ```no_run
//! use face_capture::{config::Config, session::CaptureSession, utils::SolidFrame};
//! use std::time::Instant;
//!
//! # fn main() -> face_capture::Result<()> {
//! let mut session = CaptureSession::<SolidFrame>::new(&Config::default(), None)?;
//! let frame = SolidFrame::gray(640, 480, 150);
//!
//! // One keypoint list per face reported by the landmark backend
//! let faces = Vec::new();
//! let report = session.process_frame(&frame, faces, Instant::now());
//! println!("{} ({:?})", report.alignment.message, report.stage);
//! # Ok(())
//! # }
//! ```
//!
//! ## Multi-angle capture
//!
//! ```no_run
//! use face_capture::{config::Config, session::MultiAngleSession, utils::SolidFrame};
//! use std::time::Instant;
//!
//! # fn main() -> face_capture::Result<()> {
//! let mut session = MultiAngleSession::<SolidFrame>::new(&Config::default())?;
//! while !session.is_done() {
//!     let frame = SolidFrame::gray(640, 480, 150);
//!     if let Some(report) = session.process_frame(&frame, Vec::new(), Instant::now()) {
//!         println!("{}", report.alignment.message);
//!     }
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

/// Alignment checks and guidance messages
pub mod alignment;

/// Target-angle acceptance for front and profile captures
pub mod angle_validator;

/// Post-trigger capture lifecycle
pub mod capture_stage;

/// Configuration management
pub mod config;

/// Landmark indices and default thresholds
pub mod constants;

/// Error types and result handling
pub mod error;

/// Face bounds, exposure and coarse guidance pose
pub mod geometry;

/// Landmark backend boundary and request tracking
pub mod inference;

/// Validated keypoint sets
pub mod keypoints;

/// Fine head-pose estimation from a face mesh
pub mod pose_estimation;

/// Synchronous detector-to-session driver
pub mod pump;

/// Motion-adaptive sampling of fine pose estimation
pub mod sampling;

/// Front, left, right capture plan
pub mod sequencer;

/// Per-frame orchestration
pub mod session;

/// Dwell timer for auto-capture
pub mod stability;

/// Recorded keypoint traces
pub mod trace;

/// Pixel access and numeric helpers
pub mod utils;

pub use error::{Error, Result};
