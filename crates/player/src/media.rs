use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

/// Notifications emitted by a media element, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    Play,
    Playing,
    Pause,
    Ended,
}

#[derive(Debug, Clone, Error)]
pub enum PlayError {
    /// The runtime refused to start playback (e.g. autoplay policy).
    #[error("playback not allowed: {0}")]
    NotAllowed(String),
    #[error("media error: {0}")]
    Media(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// The playable surface a controller attaches to.
///
/// `play` resolves once the element has accepted or refused the request;
/// the actual state change is reported separately through the listener as
/// a [`MediaEvent`].
#[async_trait::async_trait]
pub trait MediaElement: Send + Sync + 'static {
    async fn play(&self) -> Result<(), PlayError>;

    fn pause(&self);

    /// Toggle the element's built-in control bar.
    fn set_native_controls(&self, enabled: bool);

    fn add_listener(&self, sink: mpsc::UnboundedSender<MediaEvent>) -> ListenerId;

    fn remove_listener(&self, id: ListenerId);
}

/// Keeps a listener attached for as long as it lives.
pub struct ListenerRegistration {
    media: Arc<dyn MediaElement>,
    id: ListenerId,
}

impl ListenerRegistration {
    pub fn attach(media: Arc<dyn MediaElement>, sink: mpsc::UnboundedSender<MediaEvent>) -> Self {
        let id = media.add_listener(sink);
        Self { media, id }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.media.remove_listener(self.id);
    }
}
