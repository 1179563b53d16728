//! Coarse guidance pose and fine target pose must agree on near-frontal faces


use face_capture::{
    angle_validator::{is_angle_valid, CaptureTargetAngle},
    config::GuidanceConfig,
    geometry::{evaluate_pose, GuidancePose},
    keypoints::{FrameSize, KeypointSet},
    pose_estimation::estimate_pose,
};
use proptest::prelude::*;
use test_helpers::FaceBuilder;

proptest! {
    #[test]
    fn prop_near_frontal_accepted_by_both(yaw in -10.0f64..10.0, dx in -0.05f64..0.05) {
        let frame = FrameSize::new(640.0, 480.0).unwrap();
        let keypoints = KeypointSet::new(FaceBuilder::frontal().turned(yaw).shifted(dx, 0.0).build()).unwrap();

        let coarse = GuidancePose::from_keypoints(&keypoints, frame);
        prop_assert!(evaluate_pose(&coarse, &GuidanceConfig::default()).is_ok());

        let fine = estimate_pose(&keypoints, frame);
        prop_assert!(fine.is_some());
        prop_assert!((fine.unwrap().yaw - yaw).abs() < 1e-6);
        prop_assert!(is_angle_valid(fine.as_ref(), CaptureTargetAngle::Front, 15.0));
    }

    #[test]
    fn prop_turn_direction_agrees(yaw in 15.0f64..25.0, left in any::<bool>()) {
        let frame = FrameSize::new(640.0, 480.0).unwrap();
        let signed = if left { -yaw } else { yaw };
        let keypoints = KeypointSet::new(FaceBuilder::frontal().turned(signed).build()).unwrap();

        // Nose closer to the left ear lowers the ratio and the fine yaw alike
        let coarse = GuidancePose::from_keypoints(&keypoints, frame);
        let fine = estimate_pose(&keypoints, frame).unwrap();
        prop_assert_eq!(coarse.yaw_ratio < 1.0, fine.yaw < 0.0);
    }

    #[test]
    fn prop_near_frontal_accepted_by_both_with_depth(yaw in -10.0f64..10.0, dx in -0.05f64..0.05) {
        let frame = FrameSize::new(640.0, 480.0).unwrap();
        let keypoints = KeypointSet::new(FaceBuilder::frontal().rotated(yaw).shifted(dx, 0.0).build()).unwrap();

        let coarse = GuidancePose::from_keypoints(&keypoints, frame);
        prop_assert!(evaluate_pose(&coarse, &GuidanceConfig::default()).is_ok());

        // Only the depth basis recovers the rotation exactly; the planar
        // reading of this mesh is smaller
        let fine = estimate_pose(&keypoints, frame);
        prop_assert!(fine.is_some());
        let fine = fine.unwrap();
        prop_assert!((fine.yaw - yaw).abs() < 1e-6, "yaw {} vs {}", fine.yaw, yaw);
        prop_assert!(fine.pitch.abs() < 1e-6);
        prop_assert!(fine.roll.abs() < 1e-6);
        prop_assert!(is_angle_valid(Some(&fine), CaptureTargetAngle::Front, 15.0));
    }

    #[test]
    fn prop_turn_direction_agrees_with_depth(yaw in 15.0f64..25.0, left in any::<bool>()) {
        let frame = FrameSize::new(640.0, 480.0).unwrap();
        let signed = if left { -yaw } else { yaw };
        let keypoints = KeypointSet::new(FaceBuilder::frontal().rotated(signed).build()).unwrap();

        let coarse = GuidancePose::from_keypoints(&keypoints, frame);
        let fine = estimate_pose(&keypoints, frame).unwrap();
        prop_assert_eq!(coarse.yaw_ratio < 1.0, fine.yaw < 0.0);
        prop_assert!((fine.yaw - signed).abs() < 1e-6);
    }
}
