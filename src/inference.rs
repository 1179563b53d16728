//! Boundary to the landmark-inference backend.
//!
//! Requests are tracked through an [`InferenceSlot`]: at most one request is
//! in flight, and every request carries a [`RequestTicket`]. Cancelling the
//! slot (teardown, retake) bumps its generation so that results resolving
//! later are recognized as stale and dropped.

use crate::{keypoints::Keypoint, Result};
use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket ids are unique across all slots
static NEXT_TICKET_ID: AtomicU64 = AtomicU64::new(1);

/// Landmark backend: one keypoint list per detected face
pub trait LandmarkDetector<F> {
    /// Run inference on a frame
    ///
    /// # Errors
    ///
    /// Backend-specific failures; callers treat them as "no face"
    fn detect(&mut self, frame: &F) -> Result<Vec<Vec<Keypoint>>>;

    /// Release backend resources at teardown
    fn release(&mut self) {}

    /// Backend name for logs
    fn name(&self) -> &str {
        "LandmarkDetector"
    }
}

/// Handle for one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    id: u64,
    generation: u64,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

/// In-flight request bookkeeping for one session
#[derive(Debug, Clone, Default)]
pub struct InferenceSlot {
    generation: u64,
    pending: Option<RequestTicket>,
}

impl InferenceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket unless a request is already pending
    pub fn try_issue(&mut self) -> Option<RequestTicket> {
        if self.pending.is_some() {
            return None;
        }
        let ticket = RequestTicket {
            id: NEXT_TICKET_ID.fetch_add(1, Ordering::Relaxed),
            generation: self.generation,
        };
        self.pending = Some(ticket);
        Some(ticket)
    }

    /// Accept a resolved result. Returns `None` for stale tickets.
    pub fn resolve<T>(&mut self, ticket: RequestTicket, result: T) -> Option<T> {
        if self.pending != Some(ticket) {
            log::debug!("Discarding stale inference result #{}", ticket.id);
            return None;
        }
        self.pending = None;
        Some(result)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Invalidate every outstanding ticket
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(ticket) = self.pending.take() {
            log::debug!("Cancelled in-flight inference request #{}", ticket.id);
        }
    }
}
