//! Synchronous driver connecting a [`LandmarkDetector`] to a session.

use crate::{
    inference::LandmarkDetector,
    session::{FrameReport, FrameSink, SessionEvent},
};
use log::{info, warn};
use std::marker::PhantomData;
use std::time::Instant;

/// Runs detection for each frame and feeds the result to a session
pub struct FramePump<F, D, S> {
    detector: D,
    sink: S,
    running: bool,
    frames: u64,
    _frame: PhantomData<fn(&F)>,
}

impl<F, D, S> FramePump<F, D, S>
where
    D: LandmarkDetector<F>,
    S: FrameSink<F>,
{
    pub fn new(detector: D, sink: S) -> Self {
        info!("Frame pump started with {}", detector.name());
        Self {
            detector,
            sink,
            running: true,
            frames: 0,
            _frame: PhantomData,
        }
    }

    /// Detect and process one frame. `None` after shutdown, once a
    /// multi-angle session has finished, or when the result was stale.
    pub fn pump(&mut self, frame: &F, now: Instant) -> Option<FrameReport<F>> {
        if !self.running {
            return None;
        }
        let ticket = self.sink.begin_request()?;
        self.frames += 1;
        let outcome = self.detector.detect(frame);
        if let Err(e) = &outcome {
            warn!("{} failed on frame {}: {e}", self.detector.name(), self.frames);
        }
        self.sink.complete_request(ticket, frame, outcome, now)
    }

    /// Advance timers between frames
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent<F>> {
        if !self.running {
            return Vec::new();
        }
        self.sink.tick(now)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Cancel outstanding work and release the detector
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.sink.cancel();
        self.detector.release();
        info!("Frame pump stopped after {} frames", self.frames);
    }

    /// Shut down and hand back the session
    pub fn into_sink(mut self) -> S {
        self.shutdown();
        let Self { sink, .. } = self;
        sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        alignment::AlignmentFailure,
        config::Config,
        keypoints::{fixtures, Keypoint},
        session::CaptureSession,
        utils::SolidFrame,
        Error, Result,
    };

    struct Scripted {
        results: Vec<Result<Vec<Vec<Keypoint>>>>,
        released: bool,
    }

    impl LandmarkDetector<SolidFrame> for Scripted {
        fn detect(&mut self, _frame: &SolidFrame) -> Result<Vec<Vec<Keypoint>>> {
            if self.results.is_empty() {
                return Ok(Vec::new());
            }
            self.results.remove(0)
        }

        fn release(&mut self) {
            self.released = true;
        }
    }

    fn session() -> CaptureSession<SolidFrame> {
        CaptureSession::new(&Config::default(), None).unwrap()
    }

    #[test]
    fn test_pump_feeds_session() {
        let detector = Scripted {
            results: vec![Ok(vec![fixtures::frontal_points()]), Err(Error::InferenceError("boom".into()))],
            released: false,
        };
        let mut pump = FramePump::new(detector, session());
        let frame = SolidFrame::gray(640, 480, 150);
        let t0 = Instant::now();

        let first = pump.pump(&frame, t0).unwrap();
        assert!(first.alignment.aligned);
        let second = pump.pump(&frame, t0).unwrap();
        assert_eq!(second.alignment.failure, Some(AlignmentFailure::NoFace));
        assert_eq!(pump.frames(), 2);
    }

    #[test]
    fn test_shutdown_releases_detector() {
        let detector = Scripted {
            results: Vec::new(),
            released: false,
        };
        let mut pump = FramePump::new(detector, session());
        pump.shutdown();
        assert!(pump.detector.released);
        assert!(pump.sink().is_cancelled());
        assert!(pump.pump(&SolidFrame::gray(640, 480, 150), Instant::now()).is_none());
    }
}
