//! Three-shot capture plan: front, left, right.
//!
//! Pure bookkeeping over the steps. Driving a capture session for the active
//! step lives in [`crate::session::MultiAngleSession`].

use crate::{angle_validator::CaptureTargetAngle, Error, Result};

/// One slot of the sequence
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureStep<F> {
    pub angle: CaptureTargetAngle,
    pub label: &'static str,
    pub instruction: &'static str,
    pub completed: bool,
    pub image: Option<F>,
}

impl<F> CaptureStep<F> {
    fn new(angle: CaptureTargetAngle) -> Self {
        let (label, instruction) = match angle {
            CaptureTargetAngle::Front => ("Front", "Look straight at the camera"),
            CaptureTargetAngle::Left => ("Left side", "Slowly turn your head to the left"),
            CaptureTargetAngle::Right => ("Right side", "Slowly turn your head to the right"),
        };
        Self {
            angle,
            label,
            instruction,
            completed: false,
            image: None,
        }
    }
}

/// Ordered steps plus the currently active one
#[derive(Debug, Clone)]
pub struct MultiAngleSequencer<F> {
    steps: Vec<CaptureStep<F>>,
    active: Option<usize>,
}

impl<F> Default for MultiAngleSequencer<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F> MultiAngleSequencer<F> {
    pub fn new() -> Self {
        Self {
            steps: CaptureTargetAngle::ALL.iter().map(|&a| CaptureStep::new(a)).collect(),
            active: Some(0),
        }
    }

    pub fn steps(&self) -> &[CaptureStep<F>] {
        &self.steps
    }

    /// Step currently being captured, `None` once all are complete
    pub fn active(&self) -> Option<&CaptureStep<F>> {
        self.active.map(|i| &self.steps[i])
    }

    pub fn active_angle(&self) -> Option<CaptureTargetAngle> {
        self.active().map(|s| s.angle)
    }

    fn index_of(angle: CaptureTargetAngle) -> usize {
        match angle {
            CaptureTargetAngle::Front => 0,
            CaptureTargetAngle::Left => 1,
            CaptureTargetAngle::Right => 2,
        }
    }

    /// Store the image for the active step and move to the next incomplete one.
    /// Returns the newly active angle.
    ///
    /// # Errors
    ///
    /// Returns an error when no step is active
    pub fn complete_active(&mut self, image: F) -> Result<Option<CaptureTargetAngle>> {
        let index = self
            .active
            .ok_or_else(|| Error::SequenceError("No active capture step".to_string()))?;
        let step = &mut self.steps[index];
        step.completed = true;
        step.image = Some(image);
        log::info!("Capture step '{}' complete", step.label);

        self.active = self.next_incomplete(index);
        Ok(self.active_angle())
    }

    /// Search forward from `after`, wrapping around
    fn next_incomplete(&self, after: usize) -> Option<usize> {
        let n = self.steps.len();
        (1..=n).map(|offset| (after + offset) % n).find(|&i| !self.steps[i].completed)
    }

    /// Clear one step and make it active; other steps keep their images.
    pub fn retake(&mut self, angle: CaptureTargetAngle) {
        let index = Self::index_of(angle);
        let step = &mut self.steps[index];
        step.completed = false;
        step.image = None;
        self.active = Some(index);
        log::info!("Retaking capture step '{}'", step.label);
    }

    /// True exactly when every step has an image
    pub fn is_done(&self) -> bool {
        self.steps.iter().all(|s| s.completed)
    }

    /// Images in `[front, left, right]` order once every step is complete
    pub fn images(&self) -> Option<[&F; 3]> {
        match (&self.steps[0].image, &self.steps[1].image, &self.steps[2].image) {
            (Some(front), Some(left), Some(right)) if self.is_done() => Some([front, left, right]),
            _ => None,
        }
    }

    /// Consume the sequence, yielding `[front, left, right]` when done
    pub fn into_images(self) -> Option<[F; 3]> {
        if !self.is_done() {
            return None;
        }
        let mut images = self.steps.into_iter().map(|s| s.image);
        match (images.next()?, images.next()?, images.next()?) {
            (Some(front), Some(left), Some(right)) => Some([front, left, right]),
            _ => None,
        }
    }
}
