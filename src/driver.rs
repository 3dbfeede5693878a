//! Cancellation-safe self-rescheduling frame loop.
//!
//! The host supplies a [`FrameScheduler`] (a display-refresh callback in a UI, a synchronous
//! [`ManualScheduler`] in tests and offline rendering). The [`Driver`] requests one frame at a
//! time and checks its [`CancelToken`] both before running a tick and before rescheduling, so a
//! tick already in flight when teardown happens is the last one.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// Handle for one requested frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Host "next frame" primitive.
pub trait FrameScheduler {
    /// Ask for one callback at the next display refresh.
    fn request_frame(&mut self) -> FrameRequest;

    /// Withdraw a request that has not fired yet. Unknown requests are ignored.
    fn cancel_frame(&mut self, request: FrameRequest);
}

/// Shared stop flag. Cancelling is idempotent and visible through every clone.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Result of delivering a frame callback to the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Stale or unexpected request; nothing ran.
    Ignored,
    /// Cancelled before or during the tick; nothing was rescheduled.
    Stopped,
    /// Work ran and the next frame was requested.
    Continued,
}

pub struct Driver {
    scheduler: Box<dyn FrameScheduler>,
    token: CancelToken,
    pending: Option<FrameRequest>,
    ticks: u64,
}

impl Driver {
    pub fn new(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            scheduler,
            token: CancelToken::new(),
            pending: None,
            ticks: 0,
        }
    }

    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Request the first frame. Does nothing once cancelled or while a frame is pending.
    pub fn start(&mut self) {
        if self.token.is_cancelled() || self.pending.is_some() {
            return;
        }
        self.pending = Some(self.scheduler.request_frame());
    }

    /// Deliver the callback for `request`, running `work` if the loop is still live.
    pub fn on_frame(&mut self, request: FrameRequest, work: impl FnOnce()) -> TickOutcome {
        if self.pending != Some(request) {
            return TickOutcome::Ignored;
        }
        self.pending = None;
        if self.token.is_cancelled() {
            return TickOutcome::Stopped;
        }

        work();
        self.ticks += 1;

        if self.token.is_cancelled() {
            return TickOutcome::Stopped;
        }
        self.pending = Some(self.scheduler.request_frame());
        TickOutcome::Continued
    }

    /// Cancel the token and withdraw any pending request. Idempotent.
    pub fn stop(&mut self) {
        self.token.cancel();
        if let Some(req) = self.pending.take() {
            self.scheduler.cancel_frame(req);
        }
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Number of ticks whose work ran.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("pending", &self.pending)
            .field("stopped", &self.token.is_cancelled())
            .field("ticks", &self.ticks)
            .finish()
    }
}

#[derive(Debug, Default)]
struct ManualQueue {
    next_id: u64,
    queue: VecDeque<FrameRequest>,
    cancelled: u64,
}

/// Scheduler whose requests are fired by hand.
///
/// Clones share one queue: hand one clone to the driver and keep another to pop requests.
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualQueue>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest outstanding request.
    pub fn take_pending(&self) -> Option<FrameRequest> {
        self.inner.borrow_mut().queue.pop_front()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    /// Number of requests withdrawn through [`FrameScheduler::cancel_frame`].
    pub fn cancelled_count(&self) -> u64 {
        self.inner.borrow().cancelled
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let req = FrameRequest(inner.next_id);
        inner.queue.push_back(req);
        req
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let mut inner = self.inner.borrow_mut();
        let before = inner.queue.len();
        inner.queue.retain(|r| *r != request);
        if inner.queue.len() != before {
            inner.cancelled += 1;
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/driver.rs"]
mod tests;
