use thiserror::Error;

/// High-level phases a game can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Engine created but the game has not been started yet.
    Idle,
    /// Waiting for users to react to the join message.
    CollectingParticipants,
    /// Rounds are being played; see the sub-phase for the current step.
    Playing(PlayingPhase),
    /// Terminal: no timer may drive any further transition.
    Ended(EndReason),
}

/// Fine-grained step within a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayingPhase {
    /// Bet window is open, submissions are being collected.
    CollectingBets,
    /// Collected bets are being announced.
    Announcing,
    /// The secret number is being drawn and revealed.
    Revealing,
    /// Scores are being updated from the revealed number.
    Scoring,
    /// The round leaderboard is displayed; next round or end follows.
    Leaderboard,
}

/// Why a game reached its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// One or zero users joined; the game never started.
    NotEnoughPlayers,
    /// A caller aborted the game.
    Aborted,
    /// A participant reached the win condition (or led after the last round).
    WinnerDecided,
    /// All rounds were played and nobody scored a single point.
    NoWinner,
}

/// Events that advance the round state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundEvent {
    /// A caller started the game; begin collecting participants.
    StartGame,
    /// The join window closed with enough players.
    ParticipantsReady,
    /// The join window closed with one or zero players.
    NoPlayers,
    /// The bet window closed; announce the collected bets.
    BetsCollected,
    /// Bets were announced; move on to the reveal.
    BetsAnnounced,
    /// The secret number was revealed; apply scoring.
    NumberRevealed,
    /// Scores were updated; show the leaderboard.
    RoundScored,
    /// The leaderboard was shown and the game continues.
    NextRound,
    /// The leaderboard was shown and the game is over.
    Finish(EndReason),
    /// A caller aborted the game from any non-terminal phase.
    Abort,
}

/// Error returned when an event cannot be applied from the current phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the machine was in when the invalid event was received.
    pub from: RoundPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoundEvent,
}

/// Error returned for pause/resume misuse; carries enough context for a
/// user-visible report of the actual current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PauseError {
    /// `pause` while already paused.
    #[error("the game is already paused")]
    AlreadyPaused,
    /// `resume` while not paused.
    #[error("the game is not paused")]
    NotPaused,
    /// `pause`/`resume` on a finished game.
    #[error("the game is already over")]
    GameOver,
}

/// State machine for the round lifecycle. The `paused` flag is an overlay on
/// any non-terminal phase: no transition is driven while paused because the
/// timer is frozen, but `Abort` remains valid.
#[derive(Debug, Clone)]
pub struct RoundStateMachine {
    phase: RoundPhase,
    paused: bool,
    started: bool,
}

impl Default for RoundStateMachine {
    fn default() -> Self {
        Self {
            phase: RoundPhase::Idle,
            paused: false,
            started: false,
        }
    }
}

impl RoundStateMachine {
    /// Create a machine in the idle phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Whether the pause overlay is active.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the first round ever began. Stays true after the game ends;
    /// Unlimited-mode abort uses this to decide on a final leaderboard.
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Whether the machine reached a terminal phase.
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, RoundPhase::Ended(_))
    }

    /// Apply an event, returning the new phase.
    pub fn apply(&mut self, event: RoundEvent) -> Result<RoundPhase, InvalidTransition> {
        use PlayingPhase::*;
        use RoundEvent::*;
        use RoundPhase::*;

        let next = match (self.phase, event) {
            (Idle, StartGame) => CollectingParticipants,
            (CollectingParticipants, NoPlayers) => Ended(EndReason::NotEnoughPlayers),
            (CollectingParticipants, ParticipantsReady) => Playing(CollectingBets),
            (Playing(CollectingBets), BetsCollected) => Playing(Announcing),
            (Playing(Announcing), BetsAnnounced) => Playing(Revealing),
            (Playing(Revealing), NumberRevealed) => Playing(Scoring),
            (Playing(Scoring), RoundScored) => Playing(Leaderboard),
            (Playing(Leaderboard), NextRound) => Playing(CollectingBets),
            (Playing(Leaderboard), Finish(reason)) => Ended(reason),
            (from, Abort) if !matches!(from, Ended(_)) => Ended(EndReason::Aborted),
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        if matches!(next, Playing(_)) {
            self.started = true;
        }
        if matches!(next, Ended(_)) {
            self.paused = false;
        }
        self.phase = next;
        Ok(self.phase)
    }

    /// Activate the pause overlay.
    pub fn pause(&mut self) -> Result<(), PauseError> {
        if self.is_ended() {
            return Err(PauseError::GameOver);
        }
        if self.paused {
            return Err(PauseError::AlreadyPaused);
        }
        self.paused = true;
        Ok(())
    }

    /// Clear the pause overlay.
    pub fn resume(&mut self) -> Result<(), PauseError> {
        if self.is_ended() {
            return Err(PauseError::GameOver);
        }
        if !self.paused {
            return Err(PauseError::NotPaused);
        }
        self.paused = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut RoundStateMachine, event: RoundEvent) -> RoundPhase {
        sm.apply(event).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = RoundStateMachine::new();
        assert_eq!(sm.phase(), RoundPhase::Idle);
        assert!(!sm.has_started());
        assert!(!sm.is_paused());
    }

    #[test]
    fn full_happy_path_through_two_rounds() {
        let mut sm = RoundStateMachine::new();

        assert_eq!(
            apply(&mut sm, RoundEvent::StartGame),
            RoundPhase::CollectingParticipants
        );
        assert_eq!(
            apply(&mut sm, RoundEvent::ParticipantsReady),
            RoundPhase::Playing(PlayingPhase::CollectingBets)
        );
        assert!(sm.has_started());

        for _ in 0..2 {
            assert_eq!(
                apply(&mut sm, RoundEvent::BetsCollected),
                RoundPhase::Playing(PlayingPhase::Announcing)
            );
            assert_eq!(
                apply(&mut sm, RoundEvent::BetsAnnounced),
                RoundPhase::Playing(PlayingPhase::Revealing)
            );
            assert_eq!(
                apply(&mut sm, RoundEvent::NumberRevealed),
                RoundPhase::Playing(PlayingPhase::Scoring)
            );
            assert_eq!(
                apply(&mut sm, RoundEvent::RoundScored),
                RoundPhase::Playing(PlayingPhase::Leaderboard)
            );
            apply(&mut sm, RoundEvent::NextRound);
        }

        apply(&mut sm, RoundEvent::BetsCollected);
        apply(&mut sm, RoundEvent::BetsAnnounced);
        apply(&mut sm, RoundEvent::NumberRevealed);
        apply(&mut sm, RoundEvent::RoundScored);
        assert_eq!(
            apply(&mut sm, RoundEvent::Finish(EndReason::WinnerDecided)),
            RoundPhase::Ended(EndReason::WinnerDecided)
        );
        assert!(sm.is_ended());
    }

    #[test]
    fn empty_join_window_ends_the_game() {
        let mut sm = RoundStateMachine::new();
        apply(&mut sm, RoundEvent::StartGame);
        assert_eq!(
            apply(&mut sm, RoundEvent::NoPlayers),
            RoundPhase::Ended(EndReason::NotEnoughPlayers)
        );
        assert!(!sm.has_started());
    }

    #[test]
    fn abort_is_valid_from_any_non_terminal_phase() {
        let mut sm = RoundStateMachine::new();
        assert_eq!(
            apply(&mut sm, RoundEvent::Abort),
            RoundPhase::Ended(EndReason::Aborted)
        );

        let mut sm = RoundStateMachine::new();
        apply(&mut sm, RoundEvent::StartGame);
        apply(&mut sm, RoundEvent::ParticipantsReady);
        apply(&mut sm, RoundEvent::BetsCollected);
        assert_eq!(
            apply(&mut sm, RoundEvent::Abort),
            RoundPhase::Ended(EndReason::Aborted)
        );
    }

    #[test]
    fn terminal_phase_rejects_all_events() {
        let mut sm = RoundStateMachine::new();
        apply(&mut sm, RoundEvent::StartGame);
        apply(&mut sm, RoundEvent::NoPlayers);

        for event in [
            RoundEvent::StartGame,
            RoundEvent::BetsCollected,
            RoundEvent::Abort,
        ] {
            let err = sm.apply(event).unwrap_err();
            assert_eq!(err.from, RoundPhase::Ended(EndReason::NotEnoughPlayers));
        }
    }

    #[test]
    fn invalid_transition_reports_phase_and_event() {
        let mut sm = RoundStateMachine::new();
        let err = sm.apply(RoundEvent::BetsCollected).unwrap_err();
        assert_eq!(err.from, RoundPhase::Idle);
        assert_eq!(err.event, RoundEvent::BetsCollected);
    }

    #[test]
    fn pause_is_rejected_when_already_paused() {
        let mut sm = RoundStateMachine::new();
        sm.apply(RoundEvent::StartGame).unwrap();
        sm.pause().unwrap();
        assert!(sm.is_paused());
        assert_eq!(sm.pause(), Err(PauseError::AlreadyPaused));
        assert!(sm.is_paused());
    }

    #[test]
    fn resume_is_rejected_when_not_paused() {
        let mut sm = RoundStateMachine::new();
        sm.apply(RoundEvent::StartGame).unwrap();
        assert_eq!(sm.resume(), Err(PauseError::NotPaused));
        sm.pause().unwrap();
        sm.resume().unwrap();
        assert!(!sm.is_paused());
    }

    #[test]
    fn ending_clears_the_pause_overlay() {
        let mut sm = RoundStateMachine::new();
        sm.apply(RoundEvent::StartGame).unwrap();
        sm.pause().unwrap();
        sm.apply(RoundEvent::Abort).unwrap();
        assert!(!sm.is_paused());
        assert_eq!(sm.pause(), Err(PauseError::GameOver));
        assert_eq!(sm.resume(), Err(PauseError::GameOver));
    }
}
