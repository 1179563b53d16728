//! Per-frame orchestration of the capture engine.
//!
//! A [`CaptureSession`] owns one set of engine state (sampler, stability
//! timer, stage machine, inference slot) for a single capture target. A
//! [`MultiAngleSession`] runs one `CaptureSession` per step of the
//! front/left/right sequence.

use crate::{
    alignment::{AlignmentCheck, AlignmentClassifier, AlignmentFailure, AlignmentInput, AlignmentResult, GuideBox},
    angle_validator::{AngleDeviation, AngleValidator, CaptureTargetAngle},
    capture_stage::{CaptureStage, CaptureTrigger, StageMachine, StageTransition},
    config::Config,
    constants::GLABELLA,
    geometry::{Exposure, FaceBounds, GuidancePose},
    inference::{InferenceSlot, RequestTicket},
    keypoints::{FrameSize, Keypoint, KeypointSet},
    pose_estimation::{estimate_pose, PoseAngles},
    sampling::{AdaptiveSampler, SamplingDecision},
    sequencer::{CaptureStep, MultiAngleSequencer},
    stability::StabilityTimer,
    utils::PixelSource,
    Error, Result,
};
use log::{debug, info, warn};
use std::time::Instant;

/// Hooks for the surrounding application
pub trait CaptureListener<F> {
    /// A stage-machine run completed; called once per run
    fn on_captured(&mut self, target: Option<CaptureTargetAngle>, image: &F);

    /// Every step of a multi-angle session has an image, in `[front, left, right]` order
    fn on_all_complete(&mut self, _images: [&F; 3]) {}

    fn on_stage_changed(&mut self, _from: CaptureStage, _to: CaptureStage) {}
}

/// Something that happened while processing a frame or tick
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent<F> {
    StageChanged {
        from: CaptureStage,
        to: CaptureStage,
    },
    Captured {
        target: Option<CaptureTargetAngle>,
        image: F,
    },
    AllComplete([F; 3]),
}

/// Where this frame's fine angle came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleSource {
    /// No target angle in use, or no face
    NotEvaluated,
    Fresh,
    Cached,
    /// Cache dropped after movement on a skip frame
    Unavailable,
}

/// Everything the guidance layer needs for one frame
#[derive(Debug, Clone)]
pub struct FrameReport<F> {
    pub alignment: AlignmentResult,
    pub angles: Option<PoseAngles>,
    pub angle_valid: Option<bool>,
    pub angle_source: AngleSource,
    pub stability_progress: f64,
    pub countdown: Option<u64>,
    pub stage: CaptureStage,
    pub events: Vec<SessionEvent<F>>,
}

impl<F> FrameReport<F> {
    /// Frame passed every active check
    pub fn is_valid(&self) -> bool {
        self.alignment.aligned && self.angle_valid.unwrap_or(true)
    }

    pub fn captured(&self) -> impl Iterator<Item = &F> {
        self.events.iter().filter_map(|e| match e {
            SessionEvent::Captured { image, .. } => Some(image),
            _ => None,
        })
    }
}

/// Common driving surface of single- and multi-angle sessions
pub trait FrameSink<F> {
    /// Reserve the inference slot; `None` while a request is pending or after teardown
    fn begin_request(&mut self) -> Option<RequestTicket>;

    /// Deliver a resolved inference result. Stale tickets yield `None`.
    fn complete_request(
        &mut self,
        ticket: RequestTicket,
        frame: &F,
        outcome: Result<Vec<Vec<Keypoint>>>,
        now: Instant,
    ) -> Option<FrameReport<F>>;

    /// Advance timers without a frame
    fn tick(&mut self, now: Instant) -> Vec<SessionEvent<F>>;

    /// Stop processing and invalidate in-flight requests
    fn cancel(&mut self);
}

fn frame_size<F: PixelSource>(frame: &F) -> Option<FrameSize> {
    let (w, h) = frame.dimensions();
    FrameSize::new(f64::from(w), f64::from(h)).ok()
}

fn log_outcome(outcome: Result<Vec<Vec<Keypoint>>>) -> Vec<Vec<Keypoint>> {
    outcome.unwrap_or_else(|e| {
        warn!("Inference failed, treating frame as no face: {e}");
        Vec::new()
    })
}

/// Capture engine for one target
pub struct CaptureSession<F> {
    config: Config,
    target: Option<CaptureTargetAngle>,
    classifier: AlignmentClassifier,
    validator: AngleValidator,
    sampler: AdaptiveSampler,
    stability: StabilityTimer,
    stages: StageMachine<F>,
    slot: InferenceSlot,
    guide: Option<GuideBox>,
    supplemental_light: bool,
    cancelled: bool,
    listener: Option<Box<dyn CaptureListener<F>>>,
}

impl<F: PixelSource + Clone> CaptureSession<F> {
    /// Build a session. With a side target, the coarse pose check is left to
    /// the angle validator, since a turned head fails the symmetry check by
    /// construction.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration section is invalid
    pub fn new(config: &Config, target: Option<CaptureTargetAngle>) -> Result<Self> {
        config.validate()?;
        let mut classifier = AlignmentClassifier::new(config)?;
        if target.map_or(false, CaptureTargetAngle::is_side) {
            classifier = classifier.without(AlignmentCheck::Pose);
        }
        info!(
            "Starting capture session (target: {})",
            target.map_or_else(|| "none".to_string(), |t| t.to_string())
        );
        Ok(Self {
            config: config.clone(),
            target,
            classifier,
            validator: AngleValidator::new(config.angle.clone())?,
            sampler: AdaptiveSampler::new(config.sampling.clone())?,
            stability: StabilityTimer::new(&config.stability)?,
            stages: StageMachine::new(&config.stages)?,
            slot: InferenceSlot::new(),
            guide: None,
            supplemental_light: false,
            cancelled: false,
            listener: None,
        })
    }

    pub fn set_listener(&mut self, listener: Box<dyn CaptureListener<F>>) {
        self.listener = Some(listener);
    }

    /// Use a host-supplied guide box instead of the configured default
    pub fn set_guide(&mut self, guide: GuideBox) {
        self.guide = Some(guide);
    }

    /// A torch or screen flash is lighting the face
    pub fn set_supplemental_light(&mut self, on: bool) {
        self.supplemental_light = on;
    }

    pub fn target(&self) -> Option<CaptureTargetAngle> {
        self.target
    }

    pub fn stage(&self) -> CaptureStage {
        self.stages.stage()
    }

    pub fn stability_progress(&self) -> f64 {
        self.stability.progress()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Process a detector result for `frame`
    pub fn process_frame(&mut self, frame: &F, faces: Vec<Vec<Keypoint>>, now: Instant) -> FrameReport<F> {
        let keypoints = KeypointSet::from_faces(faces);
        self.process_keypoints(frame, keypoints.as_ref(), now)
    }

    /// Process an already validated keypoint set (or its absence)
    pub fn process_keypoints(&mut self, frame: &F, keypoints: Option<&KeypointSet>, now: Instant) -> FrameReport<F> {
        let mut events = self.tick(now);
        if self.cancelled {
            return self.report(AlignmentResult::no_face(), None, AngleSource::NotEvaluated, events);
        }

        let (Some(keypoints), Some(size)) = (keypoints, frame_size(frame)) else {
            if self.stages.is_idle() {
                self.stability.reset();
                self.sampler.invalidate();
            }
            return self.report(AlignmentResult::no_face(), None, AngleSource::NotEvaluated, events);
        };

        let bounds = FaceBounds::from_keypoints(keypoints, size);
        let input = AlignmentInput {
            frame: size,
            bounds,
            exposure: Exposure::measure(frame, &self.config.lighting),
            pose: GuidancePose::from_keypoints(keypoints, size),
            glabella: keypoints.get(GLABELLA),
            guide: self.guide.unwrap_or_else(|| GuideBox::centered(size, &self.config.guide)),
            supplemental_light: self.supplemental_light,
        };
        let mut alignment = self.classifier.classify(&input);

        if !self.stages.is_idle() {
            return self.report(alignment, None, AngleSource::NotEvaluated, events);
        }

        let (angles, angle_check) = match self.target {
            Some(target) => {
                let (angles, valid, source) = self.evaluate_target(keypoints, size, &bounds, target);
                (angles, Some((target, valid, source)))
            }
            None => (None, None),
        };

        let mut angle_valid = None;
        let mut source = AngleSource::NotEvaluated;
        if let Some((target, valid, angle_source)) = angle_check {
            angle_valid = Some(valid);
            source = angle_source;
            if alignment.aligned && !valid {
                let deviation = self
                    .validator
                    .check(angles.as_ref(), target)
                    .err()
                    .unwrap_or(AngleDeviation::Missing);
                alignment = AlignmentResult::failed(AlignmentFailure::TargetAngle { target, deviation });
            }
        }

        let update = self.stability.update(alignment.aligned, now);
        if update.triggered {
            if let Ok(transition) = self.stages.start(frame.clone(), CaptureTrigger::Stability, now) {
                self.push_transition(transition, &mut events);
            }
        }

        let mut report = self.report(alignment, angles, source, events);
        report.angle_valid = angle_valid;
        report.countdown = update.countdown;
        report.stability_progress = if update.triggered { 1.0 } else { update.progress };
        report
    }

    fn evaluate_target(
        &mut self,
        keypoints: &KeypointSet,
        size: FrameSize,
        bounds: &FaceBounds,
        target: CaptureTargetAngle,
    ) -> (Option<PoseAngles>, bool, AngleSource) {
        match self.sampler.observe((bounds.center_x, bounds.center_y), size) {
            SamplingDecision::Detect => {
                let angles = estimate_pose(keypoints, size);
                let valid = self.validator.is_valid(angles.as_ref(), target);
                match self.sampler.record_detection(angles, valid) {
                    Some(effective) => (Some(effective.angles), effective.valid, AngleSource::Fresh),
                    None => (None, false, AngleSource::Fresh),
                }
            }
            SamplingDecision::Reuse(cached) => (Some(cached.angles), cached.valid, AngleSource::Cached),
            SamplingDecision::Invalidated => (None, false, AngleSource::Unavailable),
        }
    }

    fn report(
        &self,
        alignment: AlignmentResult,
        angles: Option<PoseAngles>,
        angle_source: AngleSource,
        events: Vec<SessionEvent<F>>,
    ) -> FrameReport<F> {
        FrameReport {
            alignment,
            angles,
            angle_valid: None,
            angle_source,
            stability_progress: self.stability.progress(),
            countdown: None,
            stage: self.stages.stage(),
            events,
        }
    }

    fn push_transition(&mut self, transition: StageTransition, events: &mut Vec<SessionEvent<F>>) {
        if let Some(listener) = self.listener.as_mut() {
            listener.on_stage_changed(transition.from, transition.to);
        }
        events.push(SessionEvent::StageChanged {
            from: transition.from,
            to: transition.to,
        });
    }

    /// Advance the stage machine; hands off the image when it completes
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent<F>> {
        let mut events = Vec::new();
        for transition in self.stages.tick(now) {
            self.push_transition(transition, &mut events);
        }
        if let Some(image) = self.stages.take_image() {
            info!("Capture complete");
            if let Some(listener) = self.listener.as_mut() {
                listener.on_captured(self.target, &image);
            }
            events.push(SessionEvent::Captured {
                target: self.target,
                image,
            });
        }
        events
    }

    /// Manual shutter: freeze `frame` and start scanning immediately
    ///
    /// # Errors
    ///
    /// Returns an error if the session was cancelled or a capture is already running
    pub fn capture_now(&mut self, frame: &F, now: Instant) -> Result<Vec<SessionEvent<F>>> {
        if self.cancelled {
            return Err(Error::InvalidInput("Session was cancelled".to_string()));
        }
        let transition = self.stages.start(frame.clone(), CaptureTrigger::Manual, now)?;
        self.stability.reset();
        let mut events = Vec::new();
        self.push_transition(transition, &mut events);
        Ok(events)
    }

    /// Return every component to cold start
    pub fn reset(&mut self) {
        debug!("Resetting capture session");
        self.slot.cancel();
        self.stages.reset();
        self.stability.reset();
        self.sampler.invalidate();
        self.cancelled = false;
    }
}

impl<F: PixelSource + Clone> FrameSink<F> for CaptureSession<F> {
    fn begin_request(&mut self) -> Option<RequestTicket> {
        if self.cancelled {
            return None;
        }
        self.slot.try_issue()
    }

    fn complete_request(
        &mut self,
        ticket: RequestTicket,
        frame: &F,
        outcome: Result<Vec<Vec<Keypoint>>>,
        now: Instant,
    ) -> Option<FrameReport<F>> {
        let outcome = self.slot.resolve(ticket, outcome)?;
        Some(self.process_frame(frame, log_outcome(outcome), now))
    }

    fn tick(&mut self, now: Instant) -> Vec<SessionEvent<F>> {
        CaptureSession::tick(self, now)
    }

    fn cancel(&mut self) {
        if !self.cancelled {
            info!("Capture session cancelled");
        }
        self.cancelled = true;
        self.slot.cancel();
        self.stability.reset();
        self.sampler.invalidate();
    }
}

/// Front, left and right captures in sequence
pub struct MultiAngleSession<F> {
    config: Config,
    sequencer: MultiAngleSequencer<F>,
    current: Option<CaptureSession<F>>,
    supplemental_light: bool,
    listener: Option<Box<dyn CaptureListener<F>>>,
}

impl<F: PixelSource + Clone> MultiAngleSession<F> {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid
    pub fn new(config: &Config) -> Result<Self> {
        let sequencer = MultiAngleSequencer::new();
        let current = match sequencer.active_angle() {
            Some(angle) => Some(CaptureSession::new(config, Some(angle))?),
            None => None,
        };
        Ok(Self {
            config: config.clone(),
            sequencer,
            current,
            supplemental_light: false,
            listener: None,
        })
    }

    pub fn set_listener(&mut self, listener: Box<dyn CaptureListener<F>>) {
        self.listener = Some(listener);
    }

    pub fn set_supplemental_light(&mut self, on: bool) {
        self.supplemental_light = on;
        if let Some(session) = self.current.as_mut() {
            session.set_supplemental_light(on);
        }
    }

    pub fn steps(&self) -> &[CaptureStep<F>] {
        self.sequencer.steps()
    }

    pub fn active_angle(&self) -> Option<CaptureTargetAngle> {
        self.sequencer.active_angle()
    }

    pub fn is_done(&self) -> bool {
        self.sequencer.is_done()
    }

    /// `[front, left, right]` once every step is complete
    pub fn images(&self) -> Option<[&F; 3]> {
        self.sequencer.images()
    }

    /// Session for the active step
    pub fn current(&self) -> Option<&CaptureSession<F>> {
        self.current.as_ref()
    }

    /// Process a detector result; `None` once every step is complete
    pub fn process_frame(&mut self, frame: &F, faces: Vec<Vec<Keypoint>>, now: Instant) -> Option<FrameReport<F>> {
        let session = self.current.as_mut()?;
        let mut report = session.process_frame(frame, faces, now);
        self.absorb(&mut report.events);
        Some(report)
    }

    /// Manual shutter for the active step
    ///
    /// # Errors
    ///
    /// Returns an error if no step is active or a capture is already running
    pub fn capture_now(&mut self, frame: &F, now: Instant) -> Result<Vec<SessionEvent<F>>> {
        let session = self
            .current
            .as_mut()
            .ok_or_else(|| Error::SequenceError("All capture steps are complete".to_string()))?;
        let mut events = session.capture_now(frame, now)?;
        self.absorb(&mut events);
        Ok(events)
    }

    /// Clear one step and capture it again, leaving the others untouched
    ///
    /// # Errors
    ///
    /// Returns an error if a new session cannot be built
    pub fn retake(&mut self, angle: CaptureTargetAngle) -> Result<()> {
        if let Some(session) = self.current.as_mut() {
            session.cancel();
        }
        self.sequencer.retake(angle);
        self.current = Some(self.session_for(angle)?);
        Ok(())
    }

    fn session_for(&self, angle: CaptureTargetAngle) -> Result<CaptureSession<F>> {
        let mut session = CaptureSession::new(&self.config, Some(angle))?;
        session.set_supplemental_light(self.supplemental_light);
        Ok(session)
    }

    /// Forward step events to the listener, move captured images into the
    /// sequencer and advance to the next step
    fn absorb(&mut self, events: &mut Vec<SessionEvent<F>>) {
        let mut captured = Vec::new();
        for event in events.iter() {
            match event {
                SessionEvent::StageChanged { from, to } => {
                    if let Some(listener) = self.listener.as_mut() {
                        listener.on_stage_changed(*from, *to);
                    }
                }
                SessionEvent::Captured { image, .. } => captured.push(image.clone()),
                SessionEvent::AllComplete(_) => {}
            }
        }

        for image in captured {
            let target = self.sequencer.active_angle();
            if let Some(listener) = self.listener.as_mut() {
                listener.on_captured(target, &image);
            }
            let next = match self.sequencer.complete_active(image) {
                Ok(next) => next,
                Err(e) => {
                    warn!("Dropping capture: {e}");
                    continue;
                }
            };

            self.current = match next {
                Some(angle) => match self.session_for(angle) {
                    Ok(session) => Some(session),
                    Err(e) => {
                        warn!("Could not start capture step {angle}: {e}");
                        None
                    }
                },
                None => None,
            };

            if let Some(images) = self.sequencer.images() {
                info!("All capture steps complete");
                if let Some(listener) = self.listener.as_mut() {
                    listener.on_all_complete(images);
                }
                let [front, left, right] = images;
                events.push(SessionEvent::AllComplete([front.clone(), left.clone(), right.clone()]));
            }
        }
    }

    /// Consume the session, yielding `[front, left, right]` when done
    pub fn into_images(self) -> Option<[F; 3]> {
        self.sequencer.into_images()
    }
}

impl<F: PixelSource + Clone> FrameSink<F> for MultiAngleSession<F> {
    fn begin_request(&mut self) -> Option<RequestTicket> {
        self.current.as_mut()?.begin_request()
    }

    fn complete_request(
        &mut self,
        ticket: RequestTicket,
        frame: &F,
        outcome: Result<Vec<Vec<Keypoint>>>,
        now: Instant,
    ) -> Option<FrameReport<F>> {
        let mut report = self.current.as_mut()?.complete_request(ticket, frame, outcome, now)?;
        self.absorb(&mut report.events);
        Some(report)
    }

    fn tick(&mut self, now: Instant) -> Vec<SessionEvent<F>> {
        let Some(session) = self.current.as_mut() else {
            return Vec::new();
        };
        let mut events = CaptureSession::tick(session, now);
        self.absorb(&mut events);
        events
    }

    fn cancel(&mut self) {
        if let Some(session) = self.current.as_mut() {
            session.cancel();
        }
        self.current = None;
    }
}
