//! Per-frame alignment verdict.
//!
//! The classifier runs an ordered list of named checks and reports the first
//! failure. Position and distance come before pose since they are easier for
//! the user to correct.

use crate::{
    angle_validator::{AngleDeviation, CaptureTargetAngle},
    config::{Config, FramingConfig, GuideConfig, GuidanceConfig},
    geometry::{evaluate_pose, Exposure, FaceBounds, GuidancePose, PoseIssue},
    keypoints::{FrameSize, Keypoint},
    Error, Result,
};
use serde::Serialize;

/// Indicator color for the guidance layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidanceColor {
    Neutral,
    Caution,
    Success,
}

/// Guide overlay geometry in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GuideBox {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

impl GuideBox {
    /// Guide centered on the frame, sized by the configured fractions
    pub fn centered(frame: FrameSize, config: &GuideConfig) -> Self {
        Self {
            center_x: frame.width / 2.0,
            center_y: frame.height / 2.0,
            width: frame.width * config.width_fraction,
            height: frame.height * config.height_fraction,
        }
    }
}

/// Named alignment checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlignmentCheck {
    Lighting,
    VerticalFraming,
    HorizontalCentering,
    Distance,
    Pose,
}

/// Default evaluation order
pub const DEFAULT_CHECK_ORDER: [AlignmentCheck; 5] = [
    AlignmentCheck::Lighting,
    AlignmentCheck::VerticalFraming,
    AlignmentCheck::HorizontalCentering,
    AlignmentCheck::Distance,
    AlignmentCheck::Pose,
];

/// Typed reason a frame is not aligned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlignmentFailure {
    NoFace,
    TooDark,
    RaiseDevice,
    LowerDevice,
    MoveLeft,
    MoveRight,
    MoveCloser,
    MoveFarther,
    Pose(PoseIssue),
    TargetAngle {
        target: CaptureTargetAngle,
        deviation: AngleDeviation,
    },
}

impl AlignmentFailure {
    /// Instruction shown to the user
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoFace => "Position your face inside the frame",
            Self::TooDark => "Find better lighting",
            Self::RaiseDevice => "Raise your device",
            Self::LowerDevice => "Lower your device",
            Self::MoveLeft => "Move slightly to the left",
            Self::MoveRight => "Move slightly to the right",
            Self::MoveCloser => "Move closer",
            Self::MoveFarther => "Move farther away",
            Self::Pose(PoseIssue::TurnLeft) => "Turn your head slightly left",
            Self::Pose(PoseIssue::TurnRight) => "Turn your head slightly right",
            Self::Pose(PoseIssue::TiltLeft) => "Tilt your head to the left",
            Self::Pose(PoseIssue::TiltRight) => "Tilt your head to the right",
            Self::Pose(PoseIssue::LowerChin) => "Lower your chin slightly",
            Self::Pose(PoseIssue::RaiseChin) => "Raise your chin slightly",
            Self::TargetAngle { target, deviation } => match (target, deviation) {
                (_, AngleDeviation::Missing) => "Hold still",
                (_, AngleDeviation::Roll) => "Keep your head level",
                (_, AngleDeviation::Pitch) => "Keep your chin level",
                (CaptureTargetAngle::Front, _) => "Look straight at the camera",
                (CaptureTargetAngle::Left, AngleDeviation::TurnMore) => "Turn your head further to the left",
                (CaptureTargetAngle::Right, AngleDeviation::TurnMore) => "Turn your head further to the right",
                (_, AngleDeviation::TurnLess) => "Turn back slightly",
            },
        }
    }

    pub fn color(&self) -> GuidanceColor {
        match self {
            Self::NoFace => GuidanceColor::Neutral,
            _ => GuidanceColor::Caution,
        }
    }
}

/// Per-frame verdict surfaced to the guidance layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentResult {
    pub aligned: bool,
    pub message: &'static str,
    pub color: GuidanceColor,
    pub failure: Option<AlignmentFailure>,
}

impl AlignmentResult {
    pub fn success() -> Self {
        Self {
            aligned: true,
            message: "Perfect, hold still",
            color: GuidanceColor::Success,
            failure: None,
        }
    }

    pub fn failed(failure: AlignmentFailure) -> Self {
        Self {
            aligned: false,
            message: failure.message(),
            color: failure.color(),
            failure: Some(failure),
        }
    }

    pub fn no_face() -> Self {
        Self::failed(AlignmentFailure::NoFace)
    }
}

/// Everything the checks read for one frame
#[derive(Debug, Clone, Copy)]
pub struct AlignmentInput {
    pub frame: FrameSize,
    pub bounds: FaceBounds,
    pub exposure: Exposure,
    pub pose: GuidancePose,
    pub glabella: Keypoint,
    pub guide: GuideBox,
    pub supplemental_light: bool,
}

/// Runs alignment checks in a configurable order
#[derive(Debug, Clone)]
pub struct AlignmentClassifier {
    framing: FramingConfig,
    guidance: GuidanceConfig,
    order: Vec<AlignmentCheck>,
}

impl AlignmentClassifier {
    /// # Errors
    ///
    /// Returns an error if the framing or guidance configuration is invalid
    pub fn new(config: &Config) -> Result<Self> {
        config.framing.validate()?;
        config.guidance.validate()?;
        Ok(Self {
            framing: config.framing.clone(),
            guidance: config.guidance.clone(),
            order: DEFAULT_CHECK_ORDER.to_vec(),
        })
    }

    /// Replace the evaluation order
    ///
    /// # Errors
    ///
    /// Returns an error if a check appears more than once
    pub fn with_order(mut self, order: Vec<AlignmentCheck>) -> Result<Self> {
        for (i, check) in order.iter().enumerate() {
            if order[..i].contains(check) {
                return Err(Error::ConfigError(format!("Duplicate alignment check: {check:?}")));
            }
        }
        self.order = order;
        Ok(self)
    }

    /// Drop one check from the order (e.g. coarse pose when a target angle gates instead)
    #[must_use]
    pub fn without(mut self, check: AlignmentCheck) -> Self {
        self.order.retain(|c| *c != check);
        self
    }

    pub fn order(&self) -> &[AlignmentCheck] {
        &self.order
    }

    /// Run one check in isolation
    ///
    /// # Errors
    ///
    /// Returns the failure reason when the check does not pass
    pub fn run_check(&self, check: AlignmentCheck, input: &AlignmentInput) -> std::result::Result<(), AlignmentFailure> {
        let framing = &self.framing;
        match check {
            AlignmentCheck::Lighting => {
                if input.exposure.too_dark && !input.supplemental_light {
                    return Err(AlignmentFailure::TooDark);
                }
            }
            AlignmentCheck::VerticalFraming => {
                let y = input.glabella.y;
                if y > framing.max_glabella_y {
                    return Err(AlignmentFailure::RaiseDevice);
                }
                let deviation = y - framing.ideal_glabella_y;
                if deviation.abs() > framing.vertical_tolerance {
                    return Err(if deviation > 0.0 {
                        AlignmentFailure::RaiseDevice
                    } else {
                        AlignmentFailure::LowerDevice
                    });
                }
            }
            AlignmentCheck::HorizontalCentering => {
                let offset = (input.glabella.x * input.frame.width - input.guide.center_x) / input.frame.width;
                if offset > framing.horizontal_tolerance {
                    return Err(AlignmentFailure::MoveLeft);
                }
                if offset < -framing.horizontal_tolerance {
                    return Err(AlignmentFailure::MoveRight);
                }
            }
            AlignmentCheck::Distance => {
                let ratio = input.bounds.width / input.guide.width;
                if ratio < framing.min_size_ratio {
                    return Err(AlignmentFailure::MoveCloser);
                }
                if ratio > framing.max_size_ratio {
                    return Err(AlignmentFailure::MoveFarther);
                }
            }
            AlignmentCheck::Pose => {
                evaluate_pose(&input.pose, &self.guidance).map_err(AlignmentFailure::Pose)?;
            }
        }
        Ok(())
    }

    /// First failing check wins; all passing yields success
    pub fn classify(&self, input: &AlignmentInput) -> AlignmentResult {
        match self.order.iter().try_for_each(|&check| self.run_check(check, input)) {
            Ok(()) => AlignmentResult::success(),
            Err(failure) => AlignmentResult::failed(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constants::GLABELLA,
        keypoints::{fixtures, KeypointSet},
    };

    fn input_for(set: &KeypointSet) -> AlignmentInput {
        let frame = fixtures::frame();
        AlignmentInput {
            frame,
            bounds: FaceBounds::from_keypoints(set, frame),
            exposure: Exposure {
                level: Some(150.0),
                too_dark: false,
            },
            pose: GuidancePose::from_keypoints(set, frame),
            glabella: set.get(GLABELLA),
            guide: GuideBox::centered(frame, &GuideConfig::default()),
            supplemental_light: false,
        }
    }

    fn classifier() -> AlignmentClassifier {
        AlignmentClassifier::new(&Config::default()).unwrap()
    }

    #[test]
    fn test_frontal_is_aligned() {
        let result = classifier().classify(&input_for(&fixtures::frontal()));
        assert!(result.aligned);
        assert_eq!(result.color, GuidanceColor::Success);
        assert!(result.failure.is_none());
    }

    #[test]
    fn test_darkness_and_supplemental_light() {
        let mut input = input_for(&fixtures::frontal());
        input.exposure.too_dark = true;
        let result = classifier().classify(&input);
        assert_eq!(result.failure, Some(AlignmentFailure::TooDark));
        assert_eq!(result.color, GuidanceColor::Caution);

        input.supplemental_light = true;
        assert!(classifier().classify(&input).aligned);
    }

    #[test]
    fn test_vertical_framing() {
        let mut input = input_for(&fixtures::frontal());
        input.glabella.y = 0.51;
        assert_eq!(
            classifier().run_check(AlignmentCheck::VerticalFraming, &input),
            Err(AlignmentFailure::RaiseDevice)
        );
        input.glabella.y = 0.27;
        assert_eq!(
            classifier().run_check(AlignmentCheck::VerticalFraming, &input),
            Err(AlignmentFailure::LowerDevice)
        );
        input.glabella.y = 0.30;
        assert_eq!(classifier().run_check(AlignmentCheck::VerticalFraming, &input), Ok(()));
    }

    #[test]
    fn test_horizontal_centering() {
        let mut input = input_for(&fixtures::frontal());
        input.glabella.x = 0.63;
        assert_eq!(
            classifier().run_check(AlignmentCheck::HorizontalCentering, &input),
            Err(AlignmentFailure::MoveLeft)
        );
        input.glabella.x = 0.37;
        assert_eq!(
            classifier().run_check(AlignmentCheck::HorizontalCentering, &input),
            Err(AlignmentFailure::MoveRight)
        );
        input.glabella.x = 0.61;
        assert_eq!(classifier().run_check(AlignmentCheck::HorizontalCentering, &input), Ok(()));
    }

    #[test]
    fn test_distance() {
        let mut input = input_for(&fixtures::frontal());
        input.bounds.width = input.guide.width * 0.4;
        assert_eq!(
            classifier().run_check(AlignmentCheck::Distance, &input),
            Err(AlignmentFailure::MoveCloser)
        );
        input.bounds.width = input.guide.width * 0.95;
        assert_eq!(
            classifier().run_check(AlignmentCheck::Distance, &input),
            Err(AlignmentFailure::MoveFarther)
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let mut input = input_for(&fixtures::frontal());
        input.exposure.too_dark = true;
        input.glabella.y = 0.9;
        input.bounds.width = 1.0;
        input.pose.yaw_ratio = 3.0;
        assert_eq!(classifier().classify(&input).failure, Some(AlignmentFailure::TooDark));

        input.exposure.too_dark = false;
        assert_eq!(classifier().classify(&input).failure, Some(AlignmentFailure::RaiseDevice));

        input.glabella.y = 0.4;
        assert_eq!(classifier().classify(&input).failure, Some(AlignmentFailure::MoveCloser));

        input.bounds.width = input.guide.width * 0.8;
        assert_eq!(
            classifier().classify(&input).failure,
            Some(AlignmentFailure::Pose(PoseIssue::TurnLeft))
        );
    }

    #[test]
    fn test_custom_order() {
        let mut input = input_for(&fixtures::frontal());
        input.exposure.too_dark = true;
        input.pose.yaw_ratio = 3.0;
        let reordered = classifier()
            .with_order(vec![AlignmentCheck::Pose, AlignmentCheck::Lighting])
            .unwrap();
        assert_eq!(
            reordered.classify(&input).failure,
            Some(AlignmentFailure::Pose(PoseIssue::TurnLeft))
        );

        let without_pose = classifier().without(AlignmentCheck::Pose);
        assert_eq!(without_pose.order().len(), 4);

        assert!(classifier()
            .with_order(vec![AlignmentCheck::Pose, AlignmentCheck::Pose])
            .is_err());
    }

    #[test]
    fn test_messages_differ_by_direction() {
        assert_ne!(
            AlignmentFailure::Pose(PoseIssue::TurnLeft).message(),
            AlignmentFailure::Pose(PoseIssue::TurnRight).message()
        );
        assert_eq!(AlignmentResult::no_face().color, GuidanceColor::Neutral);
        let left = AlignmentFailure::TargetAngle {
            target: CaptureTargetAngle::Left,
            deviation: AngleDeviation::TurnMore,
        };
        assert!(left.message().contains("left"));
    }
}
