use marquee_core::types::Movie;
use serde::Serialize;

use crate::machine::PlaybackPhase;

/// Title and metadata shown on top of the video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoPanel {
    pub title: String,
    pub description: String,
    pub genre: String,
    pub year: i32,
    pub duration: String,
    pub rating: f64,
}

impl InfoPanel {
    pub fn for_movie(movie: &Movie) -> Self {
        Self {
            title: movie.title.clone(),
            description: movie.description.clone(),
            genre: movie.genre.clone(),
            year: movie.year,
            duration: movie.duration.clone(),
            rating: movie.rating,
        }
    }

    /// One-line metadata summary, e.g. "Drama · 1999 · 1h 30m · ★ 4.5".
    pub fn summary(&self) -> String {
        format!(
            "{} · {} · {} · ★ {:.1}",
            self.genre, self.year, self.duration, self.rating
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overlay {
    /// Full-screen panel with a resume affordance (paused or ended).
    Full { info: InfoPanel, resume_label: String },
    /// Lightweight corner badge while playing.
    Corner { info: InfoPanel },
    None,
}

/// Render snapshot of a mounted player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub phase: PlaybackPhase,
    pub is_paused: bool,
    pub ui_visible: bool,
    pub native_controls: bool,
    pub overlay: Overlay,
}

impl PlayerView {
    pub fn render(phase: PlaybackPhase, info: &InfoPanel) -> Self {
        let overlay = match phase {
            PlaybackPhase::Paused => Overlay::Full {
                info: info.clone(),
                resume_label: "Resume".to_string(),
            },
            PlaybackPhase::Ended => Overlay::Full {
                info: info.clone(),
                resume_label: "Watch again".to_string(),
            },
            PlaybackPhase::PlayingUiVisible => Overlay::Corner { info: info.clone() },
            PlaybackPhase::PlayingUiHidden => Overlay::None,
        };

        Self {
            phase,
            is_paused: phase.is_paused(),
            ui_visible: phase.ui_visible(),
            native_controls: phase.native_controls(),
            overlay,
        }
    }
}
