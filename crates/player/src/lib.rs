//! Playback UI for a single mounted movie.
//!
//! [`machine`] holds the pure state machine, [`controller`] drives it from an
//! event queue on a tokio task, and [`view`] derives what the overlay shows.

pub mod controller;
pub mod machine;
pub mod media;
pub mod view;

pub use controller::{ControllerConfig, PlaybackController, PlayerMount, mount};
pub use machine::{Effect, HIDE_DELAY, Input, PlaybackMachine, PlaybackPhase};
pub use media::{ListenerId, ListenerRegistration, MediaElement, MediaEvent, PlayError};
pub use view::{InfoPanel, Overlay, PlayerView};
