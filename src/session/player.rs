use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::assets::apng::PngDecoder;
use crate::assets::decoder::{ImageDecoder, Resource};
use crate::compose::canvas::CompositedFrame;
use crate::compose::store::FrameStore;
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::decoded::DecodedImage;
use crate::playback::cancel::CancelToken;
use crate::playback::scheduler::{PlaybackOutcome, Scheduler};
use crate::playback::sink::{PlaybackEvent, PlaybackSink};
use crate::session::opts::PlayerOpts;

/// Lifecycle controller for one animated image display.
///
/// A player owns at most one playback session at a time. `load`, `reload` and `unload` are
/// serialized through an internal gate, and every transition cancels and joins the previous
/// session before anything new starts. All methods take `&self`, so a player can be shared
/// across threads behind an `Arc`.
pub struct Player {
    decoder: Arc<dyn ImageDecoder>,
    sink: Arc<dyn PlaybackSink>,
    gate: Mutex<()>,
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    opts: PlayerOpts,
    resource: Resource,
    loaded: Option<Loaded>,
    session: Option<ActiveSession>,
    generation: u64,
}

struct Loaded {
    image: Arc<DecodedImage>,
    default_frame: Arc<CompositedFrame>,
}

struct ActiveSession {
    cancel: CancelToken,
    handle: JoinHandle<()>,
    done: Receiver<()>,
}

impl Player {
    /// Create an idle player with a custom upstream decoder.
    pub fn new(
        decoder: impl ImageDecoder + 'static,
        sink: impl PlaybackSink + 'static,
        opts: PlayerOpts,
    ) -> Self {
        Self {
            decoder: Arc::new(decoder),
            sink: Arc::new(sink),
            gate: Mutex::new(()),
            inner: Arc::new(Mutex::new(Inner {
                opts,
                resource: Resource::Empty,
                loaded: None,
                session: None,
                generation: 0,
            })),
        }
    }

    /// Create an idle player decoding PNG/APNG resources.
    pub fn with_png(sink: impl PlaybackSink + 'static, opts: PlayerOpts) -> Self {
        Self::new(PngDecoder::new(), sink, opts)
    }

    /// Current options.
    pub fn options(&self) -> PlayerOpts {
        lock(&self.inner).opts.clone()
    }

    /// Replace the options. They apply from the next `load` or `reload`.
    pub fn set_options(&self, opts: PlayerOpts) {
        lock(&self.inner).opts = opts;
    }

    /// Load `resource` and start playing it, replacing whatever was loaded before.
    ///
    /// An empty resource unloads. On error nothing is left running and the player ends up
    /// unloaded; the display keeps whatever it last received.
    #[tracing::instrument(skip(self, resource), fields(resource = %resource.describe()))]
    pub fn load(&self, resource: Resource) -> ApngResult<()> {
        let _gate = lock(&self.gate);
        self.stop_session();

        let opts = {
            let mut inner = lock(&self.inner);
            inner.resource = resource.clone();
            inner.opts.clone()
        };

        if resource.is_empty() {
            self.clear_loaded();
            return Ok(());
        }

        let (image, store, default_frame) = match self.prepare(&resource, &opts) {
            Ok(prepared) => prepared,
            Err(e) => {
                let mut inner = lock(&self.inner);
                inner.loaded = None;
                inner.generation += 1;
                tracing::warn!(error = %e, "load failed");
                return Err(e);
            }
        };

        let mut inner = lock(&self.inner);
        inner.generation += 1;
        let generation = inner.generation;
        inner.loaded = Some(Loaded {
            image: image.clone(),
            default_frame: default_frame.clone(),
        });

        if image.is_single_frame() {
            drop(inner);
            tracing::info!("loaded still image");
            self.sink.deliver(PlaybackEvent::Frame(default_frame));
            return Ok(());
        }

        // Frame 0 is already cached in `store`.
        let scheduler = Scheduler::new(image.clone(), store, opts.schedule())?;
        inner.session = Some(self.spawn_session(scheduler, generation)?);
        tracing::info!(
            frames = image.frame_count(),
            repeat = opts.repeat,
            speed = opts.speed_ratio.get(),
            "playback session started"
        );
        Ok(())
    }

    /// Load the most recent resource again, picking up option changes.
    pub fn reload(&self) -> ApngResult<()> {
        let resource = lock(&self.inner).resource.clone();
        self.load(resource)
    }

    /// Cancel playback, drop the decoded image and tell the display to clear.
    pub fn unload(&self) {
        let _gate = lock(&self.gate);
        self.stop_session();
        lock(&self.inner).resource = Resource::Empty;
        self.clear_loaded();
    }

    /// `true` when the loaded resource is a plain still image.
    ///
    /// Fails with [`ApngError::InvalidState`] when nothing is loaded.
    pub fn is_still_image(&self) -> ApngResult<bool> {
        lock(&self.inner)
            .loaded
            .as_ref()
            .map(|l| l.image.is_single_frame())
            .ok_or_else(|| ApngError::invalid_state("no image loaded"))
    }

    /// `true` while an image is loaded.
    pub fn is_loaded(&self) -> bool {
        lock(&self.inner).loaded.is_some()
    }

    /// The loaded image, if any.
    pub fn image(&self) -> Option<Arc<DecodedImage>> {
        lock(&self.inner).loaded.as_ref().map(|l| l.image.clone())
    }

    /// The composited first frame of the loaded image, for static previews.
    pub fn default_frame(&self) -> ApngResult<Arc<CompositedFrame>> {
        lock(&self.inner)
            .loaded
            .as_ref()
            .map(|l| l.default_frame.clone())
            .ok_or_else(|| ApngError::invalid_state("no image loaded"))
    }

    /// `true` while a playback session is running.
    pub fn is_playing(&self) -> bool {
        lock(&self.inner)
            .session
            .as_ref()
            .is_some_and(|s| !s.handle.is_finished())
    }

    /// Block until the current session (if any) finishes.
    pub fn wait(&self) {
        if let Some(done) = self.done_signal() {
            let _ = done.recv();
        }
    }

    /// Block until the current session finishes or `timeout` elapses.
    ///
    /// Returns `true` when no session is running anymore.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match self.done_signal() {
            None => true,
            Some(done) => !matches!(done.recv_timeout(timeout), Err(RecvTimeoutError::Timeout)),
        }
    }

    fn done_signal(&self) -> Option<Receiver<()>> {
        lock(&self.inner).session.as_ref().map(|s| s.done.clone())
    }

    fn prepare(
        &self,
        resource: &Resource,
        opts: &PlayerOpts,
    ) -> ApngResult<(Arc<DecodedImage>, FrameStore, Arc<CompositedFrame>)> {
        let image = Arc::new(self.decode_with_fallback(resource, opts)?);
        let mut store = FrameStore::new(image.clone());
        let default_frame = store.frame(0)?;
        Ok((image, store, default_frame))
    }

    fn decode_with_fallback(
        &self,
        resource: &Resource,
        opts: &PlayerOpts,
    ) -> ApngResult<DecodedImage> {
        let err = match self.decoder.decode(resource) {
            Ok(image) => return Ok(image),
            Err(e) if e.is_decode() => e,
            Err(e) => return Err(e),
        };
        let Some(alt) = resource.alternate(opts.base_dir.as_deref()) else {
            return Err(err);
        };
        tracing::warn!(
            error = %err,
            alternate = %alt.describe(),
            "decode failed, retrying with alternate resolution"
        );
        self.decoder.decode(&alt).map_err(|alt_err| {
            tracing::debug!(error = %alt_err, "alternate resolution failed");
            err
        })
    }

    fn spawn_session(&self, mut scheduler: Scheduler, generation: u64) -> ApngResult<ActiveSession> {
        let cancel = CancelToken::new();
        let (done_tx, done) = crossbeam_channel::bounded::<()>(0);
        let sink = self.sink.clone();
        let inner = self.inner.clone();
        let thread_cancel = cancel.clone();

        let handle = std::thread::Builder::new()
            .name("apng-playback".to_string())
            .spawn(move || {
                let _done = done_tx;
                let outcome = scheduler.run(sink.as_ref(), &thread_cancel);
                if let Ok(PlaybackOutcome::Ended { unload: true }) = outcome {
                    let mut inner = lock(&inner);
                    if inner.generation == generation {
                        inner.loaded = None;
                        tracing::info!("image unloaded at end of playback");
                    }
                }
            })
            .map_err(|e| ApngError::Other(anyhow::Error::new(e).context("spawn playback thread")))?;

        Ok(ActiveSession {
            cancel,
            handle,
            done,
        })
    }

    /// Cancel and join the active session. Must not be called with `inner` locked.
    fn stop_session(&self) {
        let session = lock(&self.inner).session.take();
        if let Some(s) = session {
            s.cancel.cancel();
            if s.handle.join().is_err() {
                tracing::error!("playback thread panicked");
            }
        }
    }

    fn clear_loaded(&self) {
        {
            let mut inner = lock(&self.inner);
            inner.loaded = None;
            inner.generation += 1;
        }
        tracing::info!("unloaded");
        self.sink.deliver(PlaybackEvent::Unloaded);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop_session();
    }
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Player")
            .field("resource", &inner.resource.describe())
            .field("loaded", &inner.loaded.is_some())
            .field("playing", &inner.session.is_some())
            .field("generation", &inner.generation)
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "../../tests/unit/session/player.rs"]
mod tests;
