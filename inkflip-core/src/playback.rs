//! Fixed-rate frame advance, independent of how often it is polled.
//!
//! The host calls [`PlaybackScheduler::tick`] whenever it gets a chance to redraw.
//! Late ticks skip as many frames as have elapsed, and the leftover fraction of an
//! interval is carried into the new baseline so the phase never drifts.

use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Copy, Clone, Default, Debug)]
pub struct SystemClock;
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<parking_lot::Mutex<Duration>>,
}
impl Default for ManualClock {
    fn default() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::default(),
        }
    }
}
impl ManualClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }
}
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum PlaybackError {
    #[error("frame rate {0} is not a usable positive number")]
    InvalidRate(f32),
}

fn interval_for(rate: f32) -> Result<Duration, PlaybackError> {
    if !(rate.is_finite() && rate > 0.0) {
        return Err(PlaybackError::InvalidRate(rate));
    }
    Duration::try_from_secs_f64(1.0 / f64::from(rate))
        .ok()
        .filter(|interval| !interval.is_zero())
        .ok_or(PlaybackError::InvalidRate(rate))
}

pub struct PlaybackScheduler<C: Clock> {
    clock: C,
    state: PlaybackState,
    rate: f32,
    interval: Duration,
    /// Time at which the current frame was due.
    baseline: Instant,
    current: usize,
}
impl<C: Clock> PlaybackScheduler<C> {
    pub fn new(clock: C, rate: f32) -> Result<Self, PlaybackError> {
        let interval = interval_for(rate)?;
        let baseline = clock.now();
        Ok(Self {
            clock,
            state: PlaybackState::Stopped,
            rate,
            interval,
            baseline,
            current: 0,
        })
    }
    pub fn start(&mut self, from: usize) {
        self.state = PlaybackState::Playing;
        self.current = from;
        self.baseline = self.clock.now();
        log::debug!("playback started at frame {from}, {} fps", self.rate);
    }
    /// Takes effect at the next tick.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
    }
    /// Change the rate. The time already elapsed toward the next frame is measured against the new interval.
    pub fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError> {
        self.interval = interval_for(rate)?;
        self.rate = rate;
        Ok(())
    }
    #[must_use]
    pub fn rate(&self) -> f32 {
        self.rate
    }
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }
    /// Advance by however many whole intervals have passed, wrapping at `frame_count`.
    ///
    /// Returns the new index if at least one interval passed, at most once per call no
    /// matter how many frames were skipped. `None` while stopped.
    pub fn tick(&mut self, frame_count: usize) -> Option<usize> {
        if self.state != PlaybackState::Playing || frame_count == 0 {
            return None;
        }
        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(self.baseline).as_nanos();
        let interval = self.interval.as_nanos();
        if elapsed < interval {
            return None;
        }
        let steps = elapsed / interval;
        let remainder = elapsed % interval;

        let count = frame_count as u128;
        // Both operands are below `count`, so the result fits back in usize.
        #[allow(clippy::cast_possible_truncation)]
        let next = ((self.current as u128 % count + steps % count) % count) as usize;
        self.current = next;
        // remainder < interval, which came from a Duration.
        #[allow(clippy::cast_possible_truncation)]
        let remainder = Duration::from_nanos(remainder as u64);
        self.baseline = now.checked_sub(remainder).unwrap_or(now);

        if steps > 1 {
            log::trace!("playback skipped {} frames", steps - 1);
        }
        Some(next)
    }
}
