//! End-to-end tests of single-target capture sessions


use face_capture::{
    alignment::AlignmentFailure,
    angle_validator::{AngleDeviation, CaptureTargetAngle},
    capture_stage::CaptureStage,
    config::Config,
    geometry::PoseIssue,
    session::{AngleSource, CaptureSession, SessionEvent},
    utils::SolidFrame,
};
use std::time::Instant;
use test_helpers::{at, dark_frame, lit_frame, FaceBuilder, Recorded, Recorder};

fn session(target: Option<CaptureTargetAngle>) -> CaptureSession<SolidFrame> {
    CaptureSession::new(&Config::default(), target).unwrap()
}

fn count_captures(events: &[SessionEvent<SolidFrame>]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, SessionEvent::Captured { .. }))
        .count()
}

#[test]
fn test_auto_capture_after_dwell() {
    let t0 = Instant::now();
    let recorder = Recorder::default();
    let mut session = session(None);
    session.set_listener(Box::new(recorder.clone()));

    let mut captures = 0;
    let mut trigger_frame = None;
    for i in 0..=80u64 {
        let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().faces(), at(t0, i * 100));
        captures += count_captures(&report.events);
        if trigger_frame.is_none() && report.stage != CaptureStage::Idle {
            trigger_frame = Some(i);
        }
    }

    assert_eq!(trigger_frame, Some(30), "dwell of 3 s at 10 fps");
    assert_eq!(captures, 1);
    assert_eq!(session.stage(), CaptureStage::Complete);
    assert_eq!(recorder.take(), vec![Recorded::Captured(None, 150)]);
}

#[test]
fn test_countdown_during_last_two_seconds() {
    let t0 = Instant::now();
    let mut session = session(None);
    let mut countdowns = Vec::new();
    for i in 0..30u64 {
        let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().faces(), at(t0, i * 100));
        countdowns.push(report.countdown);
    }
    assert_eq!(countdowns[5], None);
    assert_eq!(countdowns[10], Some(2));
    assert_eq!(countdowns[25], Some(1));
}

#[test]
fn test_capture_completes_without_frames() {
    let t0 = Instant::now();
    let mut session = session(None);
    for i in 0..=30u64 {
        session.process_frame(&lit_frame(), FaceBuilder::frontal().faces(), at(t0, i * 100));
    }
    assert_eq!(session.stage(), CaptureStage::Scanning);

    // Frames stop arriving; one late tick finishes both timed stages
    let events = session.tick(at(t0, 60_000));
    let stages: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::StageChanged { to, .. } => Some(*to),
            _ => None,
        })
        .collect();
    assert_eq!(stages, vec![CaptureStage::Processing, CaptureStage::Complete]);
    assert_eq!(count_captures(&events), 1);
    assert!(session.tick(at(t0, 70_000)).is_empty());
}

#[test]
fn test_misalignment_restarts_dwell() {
    let t0 = Instant::now();
    let mut session = session(None);
    for i in 0..20u64 {
        session.process_frame(&lit_frame(), FaceBuilder::frontal().faces(), at(t0, i * 100));
    }
    let report = session.process_frame(
        &lit_frame(),
        FaceBuilder::frontal().shifted(0.2, 0.0).faces(),
        at(t0, 2000),
    );
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::MoveLeft));
    assert_eq!(report.stability_progress, 0.0);

    let mut trigger = None;
    for i in 21..=60u64 {
        let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().faces(), at(t0, i * 100));
        if trigger.is_none() && report.stage == CaptureStage::Scanning {
            trigger = Some(i);
        }
    }
    assert_eq!(trigger, Some(51));
}

#[test]
fn test_no_face_and_multiple_faces() {
    let t0 = Instant::now();
    let mut session = session(None);
    let report = session.process_frame(&lit_frame(), Vec::new(), t0);
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::NoFace));
    assert_eq!(report.alignment.message, AlignmentFailure::NoFace.message());

    let two = vec![FaceBuilder::frontal().build(), FaceBuilder::frontal().build()];
    let report = session.process_frame(&lit_frame(), two, t0);
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::NoFace));
}

#[test]
fn test_guidance_priority() {
    let t0 = Instant::now();
    let mut session = session(None);
    let off_center_small = FaceBuilder::frontal().shifted(0.2, 0.0).scaled(0.5);

    let report = session.process_frame(&dark_frame(), off_center_small.clone().faces(), t0);
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::TooDark));

    let report = session.process_frame(&lit_frame(), off_center_small.faces(), t0);
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::MoveLeft));

    let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().scaled(0.5).faces(), t0);
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::MoveCloser));

    let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().shifted(0.0, 0.2).faces(), t0);
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::RaiseDevice));

    let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().tilted(0.05).faces(), t0);
    assert_eq!(report.alignment.failure, Some(AlignmentFailure::Pose(PoseIssue::TiltLeft)));
}

#[test]
fn test_torch_unblocks_dark_frames() {
    let t0 = Instant::now();
    let mut session = session(None);
    session.set_supplemental_light(true);
    for i in 0..=30u64 {
        session.process_frame(&dark_frame(), FaceBuilder::frontal().faces(), at(t0, i * 100));
    }
    assert_eq!(session.stage(), CaptureStage::Scanning);
}

#[test]
fn test_left_profile_capture() {
    let t0 = Instant::now();
    let mut session = session(Some(CaptureTargetAngle::Left));
    let face = FaceBuilder::for_target(CaptureTargetAngle::Left);

    let first = session.process_frame(&lit_frame(), face.clone().faces(), t0);
    assert!(first.alignment.aligned, "coarse yaw check is skipped for profiles");
    assert_eq!(first.angle_source, AngleSource::Fresh);
    let yaw = first.angles.unwrap().yaw;
    assert!((yaw + 30.0).abs() < 1e-6, "yaw was {yaw}");

    let mut captured = 0;
    for i in 1..=90u64 {
        let report = session.process_frame(&lit_frame(), face.clone().faces(), at(t0, i * 100));
        captured += count_captures(&report.events);
    }
    assert_eq!(captured, 1);
}

#[test]
fn test_front_target_rejects_turned_face() {
    let t0 = Instant::now();
    let mut session = session(Some(CaptureTargetAngle::Front));
    let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().turned(-20.0).faces(), t0);
    assert_eq!(report.angle_valid, Some(false));
    assert_eq!(
        report.alignment.failure,
        Some(AlignmentFailure::TargetAngle {
            target: CaptureTargetAngle::Front,
            deviation: AngleDeviation::TurnMore,
        })
    );
}

#[test]
fn test_right_target_overturned() {
    let t0 = Instant::now();
    let mut session = session(Some(CaptureTargetAngle::Right));
    let report = session.process_frame(&lit_frame(), FaceBuilder::frontal().turned(70.0).faces(), t0);
    assert_eq!(
        report.alignment.failure,
        Some(AlignmentFailure::TargetAngle {
            target: CaptureTargetAngle::Right,
            deviation: AngleDeviation::TurnLess,
        })
    );
}

#[test]
fn test_jump_on_skip_frame_drops_cached_angle() {
    let t0 = Instant::now();
    let mut session = session(Some(CaptureTargetAngle::Left));
    let face = FaceBuilder::for_target(CaptureTargetAngle::Left);

    let report = session.process_frame(&lit_frame(), face.clone().faces(), t0);
    assert_eq!(report.angle_source, AngleSource::Fresh);
    let report = session.process_frame(&lit_frame(), face.clone().faces(), at(t0, 100));
    assert_eq!(report.angle_source, AngleSource::Cached);
    assert!(report.stability_progress > 0.0);

    let moved = face.shifted(0.05, 0.0);
    let report = session.process_frame(&lit_frame(), moved.clone().faces(), at(t0, 200));
    assert_eq!(report.angle_source, AngleSource::Unavailable);
    assert_eq!(report.angle_valid, Some(false));
    assert_eq!(report.stability_progress, 0.0);

    let report = session.process_frame(&lit_frame(), moved.faces(), at(t0, 300));
    assert_eq!(report.angle_source, AngleSource::Fresh);
    assert_eq!(report.angle_valid, Some(true));
}

#[test]
fn test_manual_capture_overrides_guidance() {
    let t0 = Instant::now();
    let mut session = session(Some(CaptureTargetAngle::Front));
    let report = session.process_frame(&dark_frame(), Vec::new(), t0);
    assert!(!report.alignment.aligned);

    session.capture_now(&dark_frame(), at(t0, 10)).unwrap();
    assert_eq!(session.stage(), CaptureStage::Scanning);
    let events = session.tick(at(t0, 5010));
    assert_eq!(count_captures(&events), 1);
}

#[test]
fn test_reset_abandons_running_capture() {
    let t0 = Instant::now();
    let mut session = session(None);
    session.capture_now(&lit_frame(), t0).unwrap();
    session.reset();
    assert_eq!(session.stage(), CaptureStage::Idle);
    assert!(session.tick(at(t0, 10_000)).is_empty());
}
