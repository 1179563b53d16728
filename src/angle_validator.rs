//! Target pose validation for the front/left/right capture steps.

use crate::{config::AngleConfig, pose_estimation::PoseAngles, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Desired head orientation for a capture step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureTargetAngle {
    Front,
    Left,
    Right,
}

impl CaptureTargetAngle {
    /// Fixed output order of a multi-angle session
    pub const ALL: [Self; 3] = [Self::Front, Self::Left, Self::Right];

    pub fn is_side(self) -> bool {
        !matches!(self, Self::Front)
    }
}

impl fmt::Display for CaptureTargetAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Front => "front",
            Self::Left => "left",
            Self::Right => "right",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for CaptureTargetAngle {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "front" => Ok(Self::Front),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            _ => Err(crate::Error::InvalidInput(format!("Unknown target angle: {s}"))),
        }
    }
}

/// Why a pose misses its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AngleDeviation {
    /// No angle could be computed
    Missing,
    /// Head is tilted sideways
    Roll,
    /// Head is tilted up or down
    Pitch,
    /// Not turned far enough toward the target (or off-center for front)
    TurnMore,
    /// Turned past the side limit
    TurnLess,
}

/// Angle validator bound to a tolerance configuration
#[derive(Debug, Clone)]
pub struct AngleValidator {
    config: AngleConfig,
}

impl AngleValidator {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid (tolerance <= 0, ...)
    pub fn new(config: AngleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    /// Check a pose against a target
    ///
    /// # Errors
    ///
    /// Returns the first deviation found, checking roll, pitch, then yaw
    pub fn check(&self, angles: Option<&PoseAngles>, target: CaptureTargetAngle) -> std::result::Result<(), AngleDeviation> {
        let angles = angles.ok_or(AngleDeviation::Missing)?;
        let tolerance = self.config.tolerance;

        if angles.roll.abs() > tolerance || angles.roll.is_nan() {
            return Err(AngleDeviation::Roll);
        }

        let pitch_tolerance = if target.is_side() {
            tolerance * self.config.side_pitch_factor
        } else {
            tolerance
        };
        if angles.pitch.abs() > pitch_tolerance || angles.pitch.is_nan() {
            return Err(AngleDeviation::Pitch);
        }

        let max_side = self.config.max_side_yaw;
        let yaw = angles.yaw;
        match target {
            CaptureTargetAngle::Front if yaw.abs() < tolerance => Ok(()),
            CaptureTargetAngle::Front => Err(AngleDeviation::TurnMore),
            CaptureTargetAngle::Left if yaw <= -max_side => Err(AngleDeviation::TurnLess),
            CaptureTargetAngle::Left if yaw < -tolerance => Ok(()),
            CaptureTargetAngle::Right if yaw >= max_side => Err(AngleDeviation::TurnLess),
            CaptureTargetAngle::Right if yaw > tolerance => Ok(()),
            CaptureTargetAngle::Left | CaptureTargetAngle::Right => Err(AngleDeviation::TurnMore),
        }
    }

    pub fn is_valid(&self, angles: Option<&PoseAngles>, target: CaptureTargetAngle) -> bool {
        self.check(angles, target).is_ok()
    }
}

/// One-shot validity check with the default band shape and an explicit tolerance.
///
/// A non-positive tolerance never validates anything.
pub fn is_angle_valid(angles: Option<&PoseAngles>, target: CaptureTargetAngle, tolerance: f64) -> bool {
    let config = AngleConfig {
        tolerance,
        ..AngleConfig::default()
    };
    AngleValidator::new(config).map_or(false, |v| v.is_valid(angles, target))
}
