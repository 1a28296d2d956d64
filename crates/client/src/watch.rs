use std::sync::Arc;

use marquee_core::types::Movie;
use marquee_player::{ControllerConfig, MediaElement, PlayerMount, mount};
use tracing::warn;

use crate::notify::Notifications;
use crate::services::DocumentStore;

/// The playback screen for one movie.
pub struct WatchPage {
    pub movie: Movie,
    pub player: PlayerMount,
}

/// Fetch the movie and mount a player for it. Lookup failures become a
/// notification and `None`.
pub async fn open_movie<F>(
    docs: &dyn DocumentStore,
    notes: &Notifications,
    id: &str,
    config: ControllerConfig,
    attach: F,
) -> Option<WatchPage>
where
    F: FnOnce(&str) -> Arc<dyn MediaElement>,
{
    let movie = match docs.get_movie(id).await {
        Ok(Some(movie)) => movie,
        Ok(None) => {
            notes.error("That movie could not be found.");
            return None;
        }
        Err(e) => {
            warn!(movie_id = %id, error = %e, "movie lookup failed");
            notes.error(format!("Could not load movie: {e}"));
            return None;
        }
    };

    let player = mount(&movie, config, attach);
    Some(WatchPage { movie, player })
}
