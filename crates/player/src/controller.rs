use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use marquee_core::types::Movie;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::machine::{Effect, HIDE_DELAY, Input, PlaybackMachine};
use crate::media::{ListenerRegistration, MediaElement, MediaEvent, PlayError};
use crate::view::{InfoPanel, PlayerView};

pub const NO_SOURCE_MESSAGE: &str = "This title isn't available to stream yet.";

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub hide_delay: Duration,
    /// Issue a resume as soon as the player is mounted.
    pub autoplay: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            hide_delay: HIDE_DELAY,
            autoplay: true,
        }
    }
}

/// Result of mounting a player for a movie.
pub enum PlayerMount {
    /// The movie has no playable source; nothing was attached.
    Unavailable { movie_id: String, message: String },
    Attached(PlaybackController),
}

impl PlayerMount {
    pub fn controller(&self) -> Option<&PlaybackController> {
        match self {
            Self::Attached(c) => Some(c),
            Self::Unavailable { .. } => None,
        }
    }
}

/// Mount a player for `movie`.
///
/// `attach` creates the media element for the movie's video URL; it is only
/// called when there is a playable source. Must be called from within a
/// tokio runtime.
pub fn mount<F>(movie: &Movie, config: ControllerConfig, attach: F) -> PlayerMount
where
    F: FnOnce(&str) -> Arc<dyn MediaElement>,
{
    if !movie.has_playable_source() {
        info!(movie_id = %movie.id, "no playable source, rendering fallback");
        return PlayerMount::Unavailable {
            movie_id: movie.id.clone(),
            message: NO_SOURCE_MESSAGE.to_string(),
        };
    }

    let media = attach(&movie.video_url);
    PlayerMount::Attached(PlaybackController::start(movie, media, config))
}

/// Handle to a mounted player. Inputs are queued and processed in order by
/// a dedicated task; dropping the handle tears the player down.
pub struct PlaybackController {
    movie_id: String,
    inputs: Option<mpsc::UnboundedSender<Input>>,
    view: watch::Receiver<PlayerView>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackController {
    fn start(movie: &Movie, media: Arc<dyn MediaElement>, config: ControllerConfig) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (media_tx, media_rx) = mpsc::unbounded_channel();
        let (play_tx, play_rx) = mpsc::unbounded_channel();

        let machine = PlaybackMachine::new();
        let info = InfoPanel::for_movie(movie);
        let (view_tx, view_rx) = watch::channel(PlayerView::render(machine.phase(), &info));

        let registration = ListenerRegistration::attach(media.clone(), media_tx);
        media.set_native_controls(true);

        if config.autoplay {
            let _ = input_tx.send(Input::Resume);
        }

        let driver = Driver {
            movie_id: movie.id.clone(),
            machine,
            media,
            info,
            hide_delay: config.hide_delay,
            hide_deadline: None,
            view: view_tx,
            play_results: play_tx,
            play_tasks: Vec::new(),
            _registration: registration,
        };

        debug!(movie_id = %movie.id, autoplay = config.autoplay, "player mounted");
        let task = tokio::spawn(driver.run(input_rx, media_rx, play_rx));

        Self {
            movie_id: movie.id.clone(),
            inputs: Some(input_tx),
            view: view_rx,
            task: Some(task),
        }
    }

    pub fn movie_id(&self) -> &str {
        &self.movie_id
    }

    /// The user pressed the resume affordance.
    pub fn resume(&self) {
        self.send(Input::Resume);
    }

    /// Mouse movement or touch over the player.
    pub fn pointer_activity(&self) {
        self.send(Input::PointerActivity);
    }

    /// The user clicked the playback surface.
    pub fn click_surface(&self) {
        self.send(Input::SurfaceClick);
    }

    pub fn view(&self) -> PlayerView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerView> {
        self.view.clone()
    }

    /// Stop processing, cancel the hide timer and detach from the media
    /// element. Returns once the driver task has finished.
    pub async fn unmount(mut self) {
        self.inputs.take();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, input: Input) {
        if let Some(tx) = &self.inputs {
            let _ = tx.send(input);
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Driver {
    movie_id: String,
    machine: PlaybackMachine,
    media: Arc<dyn MediaElement>,
    info: InfoPanel,
    hide_delay: Duration,
    hide_deadline: Option<Instant>,
    view: watch::Sender<PlayerView>,
    play_results: mpsc::UnboundedSender<(u64, Result<(), PlayError>)>,
    /// Every play request still running; all are aborted on teardown.
    play_tasks: Vec<JoinHandle<()>>,
    _registration: ListenerRegistration,
}

impl Driver {
    async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<Input>,
        mut media_events: mpsc::UnboundedReceiver<MediaEvent>,
        mut play_results: mpsc::UnboundedReceiver<(u64, Result<(), PlayError>)>,
    ) {
        loop {
            let deadline = self.hide_deadline;
            let hide_timer = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                input = inputs.recv() => match input {
                    Some(input) => self.dispatch(input),
                    None => break,
                },
                Some(event) = media_events.recv() => self.dispatch(Input::Media(event)),
                Some((seq, result)) = play_results.recv() => {
                    if let Err(e) = result {
                        debug!(movie_id = %self.movie_id, seq, error = %e, "play request refused");
                        self.dispatch(Input::PlayRejected(seq));
                    }
                }
                _ = hide_timer => {
                    self.hide_deadline = None;
                    self.dispatch(Input::HideTimerElapsed);
                }
            }
        }
    }

    fn dispatch(&mut self, input: Input) {
        let before = self.machine.phase();
        for effect in self.machine.handle(input) {
            self.apply(effect);
        }

        let after = self.machine.phase();
        if before != after {
            debug!(movie_id = %self.movie_id, from = %before, to = %after, ?input, "playback phase changed");
        }

        let next = PlayerView::render(after, &self.info);
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn apply(&mut self, effect: Effect) {
        match effect {
            Effect::RequestPlay(seq) => {
                let media = self.media.clone();
                let results = self.play_results.clone();
                self.play_tasks.retain(|task| !task.is_finished());
                self.play_tasks.push(tokio::spawn(async move {
                    let _ = results.send((seq, media.play().await));
                }));
            }
            Effect::RequestPause => self.media.pause(),
            Effect::ArmHideTimer => {
                self.hide_deadline = Some(Instant::now() + self.hide_delay);
            }
            Effect::CancelHideTimer => self.hide_deadline = None,
            Effect::NativeControls(enabled) => self.media.set_native_controls(enabled),
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        self.hide_deadline = None;
        for task in self.play_tasks.drain(..) {
            task.abort();
        }
        debug!(movie_id = %self.movie_id, "player unmounted");
    }
}
