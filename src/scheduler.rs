//! Frame scheduling - one callback per display frame.
//!
//! A [`Scheduler`] hands out frame requests and can cancel them; the host
//! fires a request when its display frame comes due and passes it back to
//! [`FrameLoop::run_frame`]. Only the request the loop is currently waiting
//! on is honoured, so a cancelled or stale callback can never render.

use crate::error::RenderResult;
use crate::surface::Viewport;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Timing of one rendered frame, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameTime {
    /// Time since the loop started.
    pub elapsed: f32,
    /// Time since the previous frame.
    pub delta: f32,
}

impl FrameTime {
    pub fn new(elapsed: f32, delta: f32) -> Self {
        Self { elapsed, delta }
    }

    /// Timing of frame `index` on an ideal display running at `fps`.
    pub fn nth(index: u32, fps: f32) -> Self {
        let delta = 1.0 / fps;
        Self::new(index as f32 * delta, delta)
    }
}

/// Wall-clock frame timer.
#[derive(Clone, Copy, Debug)]
pub struct FrameClock {
    start: Instant,
    last: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last: now,
        }
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let delta = now.saturating_duration_since(self.last).as_secs_f32();
        self.last = now;
        FrameTime::new(
            now.saturating_duration_since(self.start).as_secs_f32(),
            delta,
        )
    }
}

/// Opaque handle for one scheduled frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRequest(u64);

/// Frame scheduling capability.
pub trait Scheduler {
    fn request_frame(&mut self) -> FrameRequest;
    fn cancel_frame(&mut self, request: FrameRequest);
}

#[derive(Debug, Default)]
struct ManualState {
    next_id: u64,
    queue: Vec<FrameRequest>,
    requested: usize,
    cancelled: usize,
}

/// Host-driven scheduler: frames run when the host calls [`take_due`].
///
/// Clones share state, so a host (or a test) can keep a handle while the
/// [`FrameLoop`] owns another.
///
/// [`take_due`]: ManualScheduler::take_due
#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest outstanding request.
    pub fn take_due(&self) -> Option<FrameRequest> {
        let mut state = self.state.borrow_mut();
        if state.queue.is_empty() {
            None
        } else {
            Some(state.queue.remove(0))
        }
    }

    pub fn outstanding(&self) -> usize {
        self.state.borrow().queue.len()
    }

    /// Total frames ever requested.
    pub fn requested(&self) -> usize {
        self.state.borrow().requested
    }

    pub fn cancelled(&self) -> usize {
        self.state.borrow().cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let mut state = self.state.borrow_mut();
        let request = FrameRequest(state.next_id);
        state.next_id += 1;
        state.requested += 1;
        state.queue.push(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        let mut state = self.state.borrow_mut();
        let before = state.queue.len();
        state.queue.retain(|r| *r != request);
        if state.queue.len() != before {
            state.cancelled += 1;
        }
    }
}

/// Wall-clock scheduler pacing frames at a fixed rate.
#[derive(Debug)]
pub struct FixedRateScheduler {
    interval: Duration,
    deadline: Instant,
    next_id: u64,
    outstanding: Option<FrameRequest>,
}

impl FixedRateScheduler {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps.max(1),
            deadline: Instant::now(),
            next_id: 0,
            outstanding: None,
        }
    }

    /// Block until the outstanding frame is due and hand it out.
    ///
    /// Returns `None` once nothing is scheduled, e.g. after teardown.
    pub fn wait(&mut self) -> Option<FrameRequest> {
        let request = self.outstanding.take()?;
        let now = Instant::now();
        if self.deadline > now {
            std::thread::sleep(self.deadline - now);
        }
        Some(request)
    }
}

impl Scheduler for FixedRateScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        // Never try to catch up on missed frames.
        self.deadline = (self.deadline + self.interval).max(Instant::now());
        let request = FrameRequest(self.next_id);
        self.next_id += 1;
        self.outstanding = Some(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.outstanding == Some(request) {
            self.outstanding = None;
        }
    }
}

/// Something drawn once per frame.
pub trait Renderer {
    /// Advance state and draw. Errors skip the frame, never the loop.
    fn render_frame(&mut self, time: FrameTime) -> RenderResult<()>;

    /// Record a new viewport; applied before the next frame draws.
    fn resize(&mut self, viewport: Viewport);

    /// Unsubscribe from signals and release every GPU resource.
    fn teardown(&mut self);
}

/// Frame counters for a mounted loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub rendered: u64,
    pub skipped: u64,
    /// Callbacks ignored because they were stale or cancelled.
    pub ignored: u64,
}

/// One renderer mounted on one scheduler.
pub struct FrameLoop<R: Renderer, S: Scheduler> {
    renderer: R,
    scheduler: S,
    pending: Option<FrameRequest>,
    mounted: bool,
    stats: LoopStats,
}

impl<R: Renderer, S: Scheduler> FrameLoop<R, S> {
    /// Mount `renderer` and schedule its first frame.
    pub fn mount(renderer: R, mut scheduler: S) -> Self {
        let pending = Some(scheduler.request_frame());
        tracing::debug!("frame loop mounted");
        Self {
            renderer,
            scheduler,
            pending,
            mounted: true,
            stats: LoopStats::default(),
        }
    }

    /// Run the frame for `request`. Returns false if the request was ignored.
    pub fn run_frame(&mut self, request: FrameRequest, time: FrameTime) -> bool {
        if !self.mounted || self.pending != Some(request) {
            self.stats.ignored += 1;
            tracing::trace!(?request, "ignoring stale frame callback");
            return false;
        }

        self.pending = Some(self.scheduler.request_frame());
        match self.renderer.render_frame(time) {
            Ok(()) => self.stats.rendered += 1,
            Err(err) => {
                self.stats.skipped += 1;
                tracing::warn!(error = %err, "frame skipped");
            }
        }
        true
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if self.mounted {
            self.renderer.resize(viewport);
        }
    }

    /// Cancel the pending frame and tear the renderer down. Idempotent.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        if let Some(request) = self.pending.take() {
            self.scheduler.cancel_frame(request);
        }
        self.renderer.teardown();
        tracing::debug!(
            rendered = self.stats.rendered,
            skipped = self.stats.skipped,
            "frame loop unmounted"
        );
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn pending(&self) -> Option<FrameRequest> {
        self.pending
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }
}

impl<R: Renderer, S: Scheduler> Drop for FrameLoop<R, S> {
    fn drop(&mut self) {
        self.unmount();
    }
}
