use std::sync::Arc;

use crate::compose::canvas::CompositedFrame;
use crate::compose::store::FrameStore;
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::decoded::DecodedImage;
use crate::playback::cancel::CancelToken;
use crate::playback::sink::{PlaybackEvent, PlaybackSink};
use crate::timing::delay::SpeedRatio;

/// What happens when a non-repeating sequence reaches its end.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndBehavior {
    /// Drop the image entirely.
    UnloadOnEnd,
    /// Keep the last shown frame on screen.
    #[default]
    FreezeOnEnd,
}

/// Per-session scheduling options.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScheduleOpts {
    /// Restart at frame 0 after the last frame instead of ending.
    pub repeat: bool,
    /// End-of-sequence action when `repeat` is off.
    pub end_behavior: EndBehavior,
    /// Playback speed multiplier.
    pub speed_ratio: SpeedRatio,
}

/// Scheduler state machine: `Idle -> Playing -> (Looping | Ended | Cancelled | Failed)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// Created, not yet run.
    Idle,
    /// Walking the first pass of the sequence.
    Playing,
    /// Walking a repeat pass.
    Looping,
    /// Reached the end without repeat.
    Ended,
    /// Stopped by its cancel token.
    Cancelled,
    /// Stopped by a compositing error.
    Failed,
}

/// How a finished [`Scheduler::run`] terminated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Natural end. `unload` is set when the end behavior asks the owner to drop the image.
    Ended {
        /// Whether the owner should unload the image.
        unload: bool,
    },
    /// Cancelled before the natural end.
    Cancelled,
}

/// Paced, cancellable walk over a decoded image's frames.
///
/// Frames are produced through a [`FrameStore`] one step ahead of display, emitted to a
/// [`PlaybackSink`], then held for their normalized delay. The delay wait is the only point
/// where the loop suspends.
#[derive(Debug)]
pub struct Scheduler {
    image: Arc<DecodedImage>,
    store: FrameStore,
    opts: ScheduleOpts,
    state: PlaybackState,
    current_index: i64,
    loops_completed: u64,
}

impl Scheduler {
    /// Create an idle scheduler. `store` must have been built for the same image.
    pub fn new(image: Arc<DecodedImage>, store: FrameStore, opts: ScheduleOpts) -> ApngResult<Self> {
        if store.frame_count() != image.frame_count() {
            return Err(ApngError::invalid_state(format!(
                "frame store holds {} frames, image has {}",
                store.frame_count(),
                image.frame_count()
            )));
        }
        Ok(Self {
            image,
            store,
            opts,
            state: PlaybackState::Idle,
            current_index: -1,
            loops_completed: 0,
        })
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the frame on display, `-1` before the first one.
    pub fn current_index(&self) -> i64 {
        self.current_index
    }

    /// Number of times the sequence wrapped back to frame 0.
    pub fn loops_completed(&self) -> u64 {
        self.loops_completed
    }

    /// The frame store backing this scheduler.
    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Run the playback loop on the current thread until it ends, is cancelled, or fails.
    ///
    /// Still images skip the loop: their only frame is emitted once, with no `Started` or
    /// `Ended` notification.
    pub fn run(
        &mut self,
        sink: &dyn PlaybackSink,
        cancel: &CancelToken,
    ) -> ApngResult<PlaybackOutcome> {
        if self.state != PlaybackState::Idle {
            return Err(ApngError::invalid_state(format!(
                "scheduler cannot start from {:?}",
                self.state
            )));
        }

        if self.image.is_single_frame() {
            let frame = self.produce(0, sink)?;
            sink.deliver(PlaybackEvent::Frame(frame));
            self.current_index = 0;
            self.state = PlaybackState::Ended;
            return Ok(PlaybackOutcome::Ended { unload: false });
        }

        self.state = PlaybackState::Playing;
        self.current_index = -1;
        let len = self.image.frame_count() as i64;

        loop {
            if cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            let mut next = self.current_index + 1;
            if next == len {
                if self.opts.repeat {
                    next = 0;
                    self.loops_completed += 1;
                    self.state = PlaybackState::Looping;
                } else {
                    let unload = self.opts.end_behavior == EndBehavior::UnloadOnEnd;
                    if unload {
                        sink.deliver(PlaybackEvent::Unloaded);
                    }
                    sink.deliver(PlaybackEvent::Ended);
                    self.state = PlaybackState::Ended;
                    tracing::info!(frames = len, unload, "playback ended");
                    return Ok(PlaybackOutcome::Ended { unload });
                }
            }

            self.current_index = next;
            let idx = next as usize;
            if idx == 0 {
                sink.deliver(PlaybackEvent::Started);
            }

            let frame = self.produce(idx, sink)?;
            let delay = self.image.frames()[idx]
                .delay()
                .to_duration(self.opts.speed_ratio);
            sink.deliver(PlaybackEvent::Frame(frame));

            if !cancel.sleep(delay) {
                return Ok(self.cancelled());
            }
        }
    }

    fn produce(
        &mut self,
        idx: usize,
        sink: &dyn PlaybackSink,
    ) -> ApngResult<Arc<CompositedFrame>> {
        self.store.frame(idx).inspect_err(|e| {
            self.state = PlaybackState::Failed;
            tracing::error!(frame = idx, error = %e, "playback session failed");
            sink.deliver(PlaybackEvent::Failed(e.to_string()));
        })
    }

    fn cancelled(&mut self) -> PlaybackOutcome {
        self.state = PlaybackState::Cancelled;
        tracing::debug!(at = self.current_index, "playback cancelled");
        PlaybackOutcome::Cancelled
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/scheduler.rs"]
mod tests;
