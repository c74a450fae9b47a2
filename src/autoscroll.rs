//! Timed autoscroll of the script view
//!
//! The scroll offset is interpolated linearly from 0 to the view's
//! overflow over a duration derived from the script's word count and the
//! words-per-minute setting. Frames are driven by an injected [`Ticker`];
//! the engine itself only reacts to [`AutoscrollEngine::tick`] calls, so a
//! test can step time deterministically.

use std::cell::Cell;

use tracing::{debug, info};

use crate::config::AutoscrollConfig;

/// Scrollable text surface
pub trait ScrollView {
    fn content_height(&self) -> f64;
    fn viewport_height(&self) -> f64;
    fn scroll_offset(&self) -> f64;
    fn set_scroll_offset(&self, offset: f64);

    /// Scrollable overflow; zero when the content fits
    fn max_offset(&self) -> f64 {
        (self.content_height() - self.viewport_height()).max(0.0)
    }
}

/// Frame callback source (animation frames in the browser)
pub trait Ticker {
    fn start(&self);
    fn stop(&self);
}

/// Monotonic time source in milliseconds
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Bookkeeping for a self-rescheduling frame loop
///
/// Keeps at most one frame request pending. A request that is still
/// pending when the loop stops is handed back for cancellation.
#[derive(Debug, Default)]
pub struct FrameSchedule {
    running: Cell<bool>,
    pending: Cell<Option<i32>>,
}

impl FrameSchedule {
    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Start the loop; true when a frame must be requested
    pub fn start(&self) -> bool {
        self.running.set(true);
        self.needs_request()
    }

    /// Stop the loop, returning the pending request to cancel
    pub fn stop(&self) -> Option<i32> {
        self.running.set(false);
        self.pending.take()
    }

    /// Record the handle of a new frame request
    pub fn requested(&self, id: i32) {
        self.pending.set(Some(id));
    }

    /// A requested frame fired; true when it should be handled
    pub fn fired(&self) -> bool {
        self.pending.set(None);
        self.running.get()
    }

    /// Running with no frame pending
    pub fn needs_request(&self) -> bool {
        self.running.get() && self.pending.get().is_none()
    }
}

/// Number of whitespace-separated words in a script
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Scroll duration in milliseconds: `words / wpm / divisor * 60000`
pub fn scroll_duration_ms(words: usize, wpm: u32, divisor: f64) -> f64 {
    words as f64 / f64::from(wpm.max(1)) / divisor * 60_000.0
}

/// One scroll pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollJob {
    pub start_time: f64,
    pub duration_ms: f64,
    pub max_offset: f64,
    pub current_offset: f64,
}

impl ScrollJob {
    pub fn progress(&self, now: f64) -> f64 {
        ((now - self.start_time) / self.duration_ms).clamp(0.0, 1.0)
    }
}

/// Result of a single frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// No job is running
    Idle,
    /// The job advanced to the given offset
    Scrolled(f64),
    /// The job finished on this frame
    Finished,
}

pub struct AutoscrollEngine {
    ticker: Box<dyn Ticker>,
    config: AutoscrollConfig,
    job: Option<ScrollJob>,
}

impl AutoscrollEngine {
    pub fn new(ticker: Box<dyn Ticker>, config: AutoscrollConfig) -> Self {
        Self {
            ticker,
            config,
            job: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.job.is_some()
    }

    pub fn job(&self) -> Option<&ScrollJob> {
        self.job.as_ref()
    }

    /// Start a pass from offset 0, replacing any running job
    ///
    /// Returns false when there is nothing to scroll (empty script or no
    /// overflow); that is not an error.
    pub fn start<V: ScrollView + ?Sized>(
        &mut self,
        view: &V,
        script: &str,
        wpm: u32,
        now: f64,
    ) -> bool {
        if self.job.is_some() {
            self.cancel(view);
        }

        let max_offset = view.max_offset();
        let words = word_count(script);
        if max_offset <= 0.0 || words == 0 {
            debug!(
                "Nothing to scroll (overflow {:.0}px, {} words)",
                max_offset, words
            );
            return false;
        }

        let duration_ms = scroll_duration_ms(words, wpm, self.config.speed_divisor);
        view.set_scroll_offset(0.0);
        self.job = Some(ScrollJob {
            start_time: now,
            duration_ms,
            max_offset,
            current_offset: 0.0,
        });
        self.ticker.start();
        info!(
            "Autoscroll started: {} words at {} wpm over {:.0}ms ({:.0}px)",
            words, wpm, duration_ms, max_offset
        );
        true
    }

    /// Advance the running job to `now`
    pub fn tick<V: ScrollView + ?Sized>(&mut self, view: &V, now: f64) -> Tick {
        let Some(mut job) = self.job else {
            return Tick::Idle;
        };

        // Reader scrolled to the end by hand
        if view.scroll_offset() >= job.max_offset - self.config.bottom_tolerance_px {
            self.finish();
            return Tick::Finished;
        }

        let progress = job.progress(now);
        let target = (progress * job.max_offset).clamp(0.0, job.max_offset);
        job.current_offset = job.current_offset.max(target);
        view.set_scroll_offset(job.current_offset);

        if progress >= 1.0 {
            self.finish();
            return Tick::Finished;
        }

        self.job = Some(job);
        Tick::Scrolled(job.current_offset)
    }

    /// Stop scrolling and reset the view to the top
    pub fn cancel<V: ScrollView + ?Sized>(&mut self, view: &V) {
        if self.job.take().is_some() {
            self.ticker.stop();
            info!("Autoscroll cancelled");
        }
        view.set_scroll_offset(0.0);
    }

    fn finish(&mut self) {
        self.job = None;
        self.ticker.stop();
        info!("Autoscroll reached the end");
    }
}
