//! In-memory game state: the round lifecycle machine and the score board.

pub mod scoreboard;
pub mod state_machine;

pub use scoreboard::{PayoutRule, RankedEntry, ScoreBoard};
pub use state_machine::{
    EndReason, InvalidTransition, PauseError, PlayingPhase, RoundEvent, RoundPhase,
    RoundStateMachine,
};
