use std::time::Duration;

use serde::Serialize;

use crate::media::MediaEvent;

/// Inactivity period after which the playing overlay hides itself.
pub const HIDE_DELAY: Duration = Duration::from_millis(3000);

/// Playback UI phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackPhase {
    Paused,
    PlayingUiVisible,
    PlayingUiHidden,
    Ended,
}

impl PlaybackPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Paused => "Paused",
            Self::PlayingUiVisible => "PlayingUiVisible",
            Self::PlayingUiHidden => "PlayingUiHidden",
            Self::Ended => "Ended",
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, Self::Paused | Self::Ended)
    }

    pub fn ui_visible(&self) -> bool {
        !matches!(self, Self::PlayingUiHidden)
    }

    pub fn native_controls(&self) -> bool {
        self.ui_visible()
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything that can drive the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Media(MediaEvent),
    PointerActivity,
    SurfaceClick,
    Resume,
    HideTimerElapsed,
    /// The play request with this sequence number was refused.
    PlayRejected(u64),
}

/// Side effects requested by a transition, applied by the driver in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Issue a play request tagged with its sequence number.
    RequestPlay(u64),
    RequestPause,
    ArmHideTimer,
    CancelHideTimer,
    NativeControls(bool),
}

/// Pure playback UI state machine.
///
/// `is_paused` only ever changes in response to media events (or a refused
/// play request); user inputs merely produce play/pause requests.
#[derive(Debug, Clone)]
pub struct PlaybackMachine {
    phase: PlaybackPhase,
    /// Sequence number of the outstanding play request, if any.
    pending_play: Option<u64>,
    play_seq: u64,
    hide_timer_armed: bool,
    native_controls: bool,
}

impl Default for PlaybackMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackMachine {
    pub fn new() -> Self {
        Self {
            phase: PlaybackPhase::Paused,
            pending_play: None,
            play_seq: 0,
            hide_timer_armed: false,
            native_controls: true,
        }
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.phase.is_paused()
    }

    pub fn ui_visible(&self) -> bool {
        self.phase.ui_visible()
    }

    pub fn hide_timer_armed(&self) -> bool {
        self.hide_timer_armed
    }

    /// Whether a play request has been issued and not yet answered.
    pub fn play_pending(&self) -> bool {
        self.pending_play.is_some()
    }

    pub fn handle(&mut self, input: Input) -> Vec<Effect> {
        let mut effects = Vec::new();

        match input {
            Input::Media(MediaEvent::Play | MediaEvent::Playing) => {
                self.pending_play = None;
                self.enter(PlaybackPhase::PlayingUiVisible, &mut effects);
                self.arm(&mut effects);
            }
            Input::Media(MediaEvent::Pause) => {
                self.pending_play = None;
                if !self.phase.is_paused() {
                    self.enter(PlaybackPhase::Paused, &mut effects);
                }
            }
            Input::Media(MediaEvent::Ended) => {
                self.pending_play = None;
                self.enter(PlaybackPhase::Ended, &mut effects);
            }
            Input::PointerActivity => {
                if !self.phase.is_paused() {
                    self.enter(PlaybackPhase::PlayingUiVisible, &mut effects);
                    self.arm(&mut effects);
                }
            }
            Input::HideTimerElapsed => {
                self.hide_timer_armed = false;
                if self.phase == PlaybackPhase::PlayingUiVisible {
                    self.enter(PlaybackPhase::PlayingUiHidden, &mut effects);
                }
            }
            Input::Resume => self.request_play(&mut effects),
            Input::SurfaceClick => {
                if self.phase.is_paused() {
                    self.request_play(&mut effects);
                } else {
                    effects.push(Effect::RequestPause);
                }
            }
            Input::PlayRejected(seq) => {
                // Only the outstanding request may clear itself; an older
                // refusal (e.g. aborted by a later pause) is stale.
                if self.pending_play == Some(seq) && self.phase.is_paused() {
                    self.pending_play = None;
                    self.enter(PlaybackPhase::Paused, &mut effects);
                }
            }
        }

        effects
    }

    fn request_play(&mut self, effects: &mut Vec<Effect>) {
        if self.phase.is_paused() && self.pending_play.is_none() {
            self.play_seq += 1;
            self.pending_play = Some(self.play_seq);
            effects.push(Effect::RequestPlay(self.play_seq));
        }
    }

    fn arm(&mut self, effects: &mut Vec<Effect>) {
        self.hide_timer_armed = true;
        effects.push(Effect::ArmHideTimer);
    }

    fn enter(&mut self, next: PlaybackPhase, effects: &mut Vec<Effect>) {
        if next.is_paused() && self.hide_timer_armed {
            self.hide_timer_armed = false;
            effects.push(Effect::CancelHideTimer);
        }

        self.phase = next;

        if next.native_controls() != self.native_controls {
            self.native_controls = next.native_controls();
            effects.push(Effect::NativeControls(self.native_controls));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_INPUTS: [Input; 11] = [
        Input::Media(MediaEvent::Play),
        Input::Media(MediaEvent::Playing),
        Input::Media(MediaEvent::Pause),
        Input::Media(MediaEvent::Ended),
        Input::PointerActivity,
        Input::SurfaceClick,
        Input::Resume,
        Input::HideTimerElapsed,
        Input::PlayRejected(1),
        Input::PlayRejected(2),
        Input::PlayRejected(3),
    ];

    fn playing() -> PlaybackMachine {
        let mut m = PlaybackMachine::new();
        m.handle(Input::Media(MediaEvent::Play));
        m
    }

    #[test]
    fn starts_paused_and_visible() {
        let m = PlaybackMachine::new();
        assert_eq!(m.phase(), PlaybackPhase::Paused);
        assert!(m.is_paused());
        assert!(m.ui_visible());
        assert!(!m.hide_timer_armed());
    }

    #[test]
    fn play_event_shows_ui_and_arms_timer() {
        let mut m = PlaybackMachine::new();
        let effects = m.handle(Input::Media(MediaEvent::Playing));
        assert_eq!(m.phase(), PlaybackPhase::PlayingUiVisible);
        assert_eq!(effects, vec![Effect::ArmHideTimer]);
    }

    #[test]
    fn timer_hides_ui_and_native_controls() {
        let mut m = playing();
        let effects = m.handle(Input::HideTimerElapsed);
        assert_eq!(m.phase(), PlaybackPhase::PlayingUiHidden);
        assert!(!m.ui_visible());
        assert_eq!(effects, vec![Effect::NativeControls(false)]);
    }

    #[test]
    fn pointer_activity_reveals_and_rearms() {
        let mut m = playing();
        m.handle(Input::HideTimerElapsed);
        let effects = m.handle(Input::PointerActivity);
        assert_eq!(m.phase(), PlaybackPhase::PlayingUiVisible);
        assert_eq!(
            effects,
            vec![Effect::NativeControls(true), Effect::ArmHideTimer]
        );
    }

    #[test]
    fn pointer_activity_while_paused_is_ignored() {
        let mut m = PlaybackMachine::new();
        assert!(m.handle(Input::PointerActivity).is_empty());
        assert!(!m.hide_timer_armed());
    }

    #[test]
    fn pause_cancels_timer_and_forces_ui() {
        let mut m = playing();
        m.handle(Input::HideTimerElapsed);
        m.handle(Input::PointerActivity);
        let effects = m.handle(Input::Media(MediaEvent::Pause));
        assert_eq!(m.phase(), PlaybackPhase::Paused);
        assert_eq!(effects, vec![Effect::CancelHideTimer]);
        assert!(m.ui_visible());
    }

    #[test]
    fn ended_from_hidden_restores_controls() {
        let mut m = playing();
        m.handle(Input::HideTimerElapsed);
        let effects = m.handle(Input::Media(MediaEvent::Ended));
        assert_eq!(m.phase(), PlaybackPhase::Ended);
        assert_eq!(effects, vec![Effect::NativeControls(true)]);
        assert!(m.ui_visible());
    }

    #[test]
    fn pause_after_ended_stays_ended() {
        let mut m = playing();
        m.handle(Input::Media(MediaEvent::Ended));
        m.handle(Input::Media(MediaEvent::Pause));
        assert_eq!(m.phase(), PlaybackPhase::Ended);
    }

    #[test]
    fn resume_issues_single_play_request() {
        let mut m = PlaybackMachine::new();
        assert_eq!(m.handle(Input::Resume), vec![Effect::RequestPlay(1)]);
        assert!(m.handle(Input::Resume).is_empty());
        assert!(m.handle(Input::SurfaceClick).is_empty());
        // state does not change until the media confirms
        assert_eq!(m.phase(), PlaybackPhase::Paused);

        m.handle(Input::Media(MediaEvent::Play));
        m.handle(Input::Media(MediaEvent::Pause));
        assert_eq!(m.handle(Input::Resume), vec![Effect::RequestPlay(2)]);
    }

    #[test]
    fn resume_from_ended_requests_play() {
        let mut m = playing();
        m.handle(Input::Media(MediaEvent::Ended));
        assert_eq!(m.handle(Input::Resume), vec![Effect::RequestPlay(1)]);
    }

    #[test]
    fn resume_while_playing_is_noop() {
        let mut m = playing();
        assert!(m.handle(Input::Resume).is_empty());
    }

    #[test]
    fn surface_click_toggles_without_applying_state() {
        let mut m = playing();
        assert_eq!(m.handle(Input::SurfaceClick), vec![Effect::RequestPause]);
        assert_eq!(m.phase(), PlaybackPhase::PlayingUiVisible);

        m.handle(Input::Media(MediaEvent::Pause));
        assert_eq!(m.handle(Input::SurfaceClick), vec![Effect::RequestPlay(1)]);
        assert_eq!(m.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn rejected_play_falls_back_to_paused_without_retry() {
        let mut m = PlaybackMachine::new();
        m.handle(Input::Resume);
        let effects = m.handle(Input::PlayRejected(1));
        assert!(effects.is_empty());
        assert_eq!(m.phase(), PlaybackPhase::Paused);
        assert!(!m.play_pending());
        assert!(m.ui_visible());
    }

    #[test]
    fn rejection_after_play_event_is_ignored() {
        let mut m = PlaybackMachine::new();
        m.handle(Input::Resume);
        m.handle(Input::Media(MediaEvent::Playing));
        assert!(m.handle(Input::PlayRejected(1)).is_empty());
        assert_eq!(m.phase(), PlaybackPhase::PlayingUiVisible);
    }

    #[test]
    fn refusal_of_an_older_request_keeps_the_newer_one_pending() {
        let mut m = PlaybackMachine::new();
        m.handle(Input::Resume);
        m.handle(Input::Media(MediaEvent::Playing));
        m.handle(Input::SurfaceClick);
        m.handle(Input::Media(MediaEvent::Pause));
        assert_eq!(m.handle(Input::Resume), vec![Effect::RequestPlay(2)]);

        assert!(m.handle(Input::PlayRejected(1)).is_empty());
        assert!(m.play_pending());
        assert!(m.handle(Input::Resume).is_empty());

        m.handle(Input::PlayRejected(2));
        assert!(!m.play_pending());
        assert_eq!(m.handle(Input::Resume), vec![Effect::RequestPlay(3)]);
    }

    #[test]
    fn stale_timer_after_pause_is_ignored() {
        let mut m = playing();
        m.handle(Input::Media(MediaEvent::Pause));
        assert!(m.handle(Input::HideTimerElapsed).is_empty());
        assert_eq!(m.phase(), PlaybackPhase::Paused);
    }

    /// Walk every input sequence up to length 5 and check the invariants
    /// after each step.
    #[test]
    fn invariants_hold_for_all_short_sequences() {
        fn walk(m: &PlaybackMachine, depth: usize) {
            if depth == 0 {
                return;
            }
            for input in ALL_INPUTS {
                let mut next = m.clone();
                next.handle(input);

                if next.is_paused() {
                    assert!(next.ui_visible(), "paused with hidden UI after {input:?}");
                    assert!(!next.hide_timer_armed(), "timer armed while paused");
                }
                if matches!(
                    input,
                    Input::Media(MediaEvent::Pause) | Input::Media(MediaEvent::Ended)
                ) {
                    assert!(next.ui_visible());
                }
                assert_eq!(next.native_controls, next.ui_visible());

                walk(&next, depth - 1);
            }
        }

        walk(&PlaybackMachine::new(), 5);
    }
}
