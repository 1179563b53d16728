//! Capture lifecycle: idle → scanning → processing → complete.
//!
//! Transitions after the trigger are driven by wall-clock deadlines through
//! [`StageMachine::tick`], so they advance even when frames stop arriving.
//! A late tick may cross several deadlines at once; each stage still spans
//! its full configured duration measured from the previous deadline.

use crate::{config::StageConfig, Error, Result};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Stage reported to the visual-effects layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStage {
    Idle,
    Scanning,
    Processing,
    Complete,
}

/// What started the capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureTrigger {
    Stability,
    Manual,
}

/// Stage change produced by a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTransition {
    pub from: CaptureStage,
    pub to: CaptureStage,
    pub at: Instant,
}

#[derive(Debug, Clone)]
enum State<F> {
    Idle,
    Scanning { entered: Instant, frame: F },
    Processing { entered: Instant, frame: F },
    Complete { image: Option<F> },
}

/// Stage machine for one capture target. `F` is the frozen frame type.
#[derive(Debug, Clone)]
pub struct StageMachine<F> {
    scanning: Duration,
    processing: Duration,
    state: State<F>,
    trigger: Option<CaptureTrigger>,
}

impl<F> StageMachine<F> {
    /// # Errors
    ///
    /// Returns an error if a stage duration is zero
    pub fn new(config: &StageConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scanning: Duration::from_millis(config.scanning_ms),
            processing: Duration::from_millis(config.processing_ms),
            state: State::Idle,
            trigger: None,
        })
    }

    pub fn stage(&self) -> CaptureStage {
        match self.state {
            State::Idle => CaptureStage::Idle,
            State::Scanning { .. } => CaptureStage::Scanning,
            State::Processing { .. } => CaptureStage::Processing,
            State::Complete { .. } => CaptureStage::Complete,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    pub fn trigger(&self) -> Option<CaptureTrigger> {
        self.trigger
    }

    /// Freeze `frame` and enter scanning.
    ///
    /// # Errors
    ///
    /// Returns an error unless the machine is idle
    pub fn start(&mut self, frame: F, trigger: CaptureTrigger, now: Instant) -> Result<StageTransition> {
        if !self.is_idle() {
            return Err(Error::InvalidInput(format!(
                "Capture already in progress ({:?})",
                self.stage()
            )));
        }
        log::info!("Capture triggered ({trigger:?})");
        self.state = State::Scanning { entered: now, frame };
        self.trigger = Some(trigger);
        Ok(StageTransition {
            from: CaptureStage::Idle,
            to: CaptureStage::Scanning,
            at: now,
        })
    }

    /// Advance past every deadline that has elapsed by `now`
    pub fn tick(&mut self, now: Instant) -> Vec<StageTransition> {
        let mut transitions = Vec::new();
        loop {
            let (next, transition) = match std::mem::replace(&mut self.state, State::Idle) {
                State::Scanning { entered, frame } if now >= entered + self.scanning => {
                    let at = entered + self.scanning;
                    (
                        State::Processing { entered: at, frame },
                        StageTransition {
                            from: CaptureStage::Scanning,
                            to: CaptureStage::Processing,
                            at,
                        },
                    )
                }
                State::Processing { entered, frame } if now >= entered + self.processing => {
                    let at = entered + self.processing;
                    (
                        State::Complete { image: Some(frame) },
                        StageTransition {
                            from: CaptureStage::Processing,
                            to: CaptureStage::Complete,
                            at,
                        },
                    )
                }
                other => {
                    self.state = other;
                    break;
                }
            };
            log::debug!("Capture stage {:?} -> {:?}", transition.from, transition.to);
            self.state = next;
            transitions.push(transition);
        }
        transitions
    }

    /// Hand off the captured frame. Yields it once per completed run.
    pub fn take_image(&mut self) -> Option<F> {
        match &mut self.state {
            State::Complete { image } => image.take(),
            _ => None,
        }
    }

    /// Time until the next automatic transition
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match &self.state {
            State::Scanning { entered, .. } => Some((*entered + self.scanning).saturating_duration_since(now)),
            State::Processing { entered, .. } => Some((*entered + self.processing).saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Back to idle, dropping any frozen frame
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.trigger = None;
    }
}
