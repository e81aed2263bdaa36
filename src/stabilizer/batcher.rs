//! Frame batching - defers pipeline work to the next frame boundary

use crate::input::PointerSample;

/// Handle to a scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

/// Capability for scheduling work at the next animation-frame boundary.
///
/// Production hosts back this with their compositor or timer; tests and
/// native builds drive it manually through the facade's `pump()`. The
/// batcher keeps at most one request outstanding.
pub trait FrameScheduler {
    /// Request a callback at the next frame tick.
    fn schedule(&mut self) -> TaskHandle;

    /// Release a request, whether it fired or is being cancelled.
    /// Unknown handles are ignored.
    fn cancel(&mut self, handle: TaskHandle);
}

/// Scheduler with no timer of its own: requests stay outstanding until
/// the host drains them via the facade's `pump()`.
#[derive(Debug, Default)]
pub struct ManualFrameScheduler {
    next_id: u64,
    outstanding: Vec<TaskHandle>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of requests not yet fired or cancelled.
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn schedule(&mut self) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.outstanding.push(handle);
        handle
    }

    fn cancel(&mut self, handle: TaskHandle) {
        self.outstanding.retain(|&pending| pending != handle);
    }
}

/// Coalesces same-frame submissions into one pipeline pass.
///
/// While enabled, submitted samples accumulate in a pending queue and a
/// single frame callback is kept scheduled; the queue drains atomically
/// when the frame tick arrives. While disabled, submissions are handed
/// straight back to the caller for synchronous processing.
pub(crate) struct FrameBatcher {
    enabled: bool,
    pending: Vec<PointerSample>,
    scheduled: Option<TaskHandle>,
    scheduler: Box<dyn FrameScheduler>,
}

impl FrameBatcher {
    pub fn new() -> Self {
        Self::with_scheduler(Box::new(ManualFrameScheduler::new()))
    }

    pub fn with_scheduler(scheduler: Box<dyn FrameScheduler>) -> Self {
        Self {
            enabled: false,
            pending: Vec::new(),
            scheduled: None,
            scheduler,
        }
    }

    /// Swap the scheduling backend. An outstanding request moves to the
    /// new scheduler so queued samples are not stranded.
    pub fn set_scheduler(&mut self, scheduler: Box<dyn FrameScheduler>) {
        if let Some(handle) = self.scheduled.take() {
            self.scheduler.cancel(handle);
        }
        self.scheduler = scheduler;
        if !self.pending.is_empty() {
            self.scheduled = Some(self.scheduler.schedule());
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Toggle batching. Turning it off releases whatever was queued so
    /// the caller can process it synchronously.
    pub fn set_enabled(&mut self, enabled: bool) -> Vec<PointerSample> {
        self.enabled = enabled;
        if enabled {
            return Vec::new();
        }
        self.drain()
    }

    /// Queue samples for the next frame. Returns `false` when batching is
    /// disabled, leaving the samples for the caller to process now.
    pub fn submit(&mut self, samples: &[PointerSample]) -> bool {
        if !self.enabled {
            return false;
        }
        self.pending.extend_from_slice(samples);
        if self.scheduled.is_none() {
            self.scheduled = Some(self.scheduler.schedule());
        }
        true
    }

    /// Frame tick: hand back the queued batch if a callback was
    /// scheduled, releasing the request.
    pub fn take_due(&mut self) -> Option<Vec<PointerSample>> {
        let handle = self.scheduled.take()?;
        self.scheduler.cancel(handle);
        tracing::trace!(count = self.pending.len(), "draining frame batch");
        Some(std::mem::take(&mut self.pending))
    }

    /// Cancel any scheduled callback and hand back the queue (used by
    /// `finish()` and the batching toggle).
    pub fn drain(&mut self) -> Vec<PointerSample> {
        if let Some(handle) = self.scheduled.take() {
            self.scheduler.cancel(handle);
        }
        std::mem::take(&mut self.pending)
    }

    /// Cancel any scheduled callback and discard the queue (used by
    /// `reset()` - an aborted stroke's tail is not processed).
    pub fn clear(&mut self) {
        if let Some(handle) = self.scheduled.take() {
            self.scheduler.cancel(handle);
        }
        self.pending.clear();
    }
}
