//! Turn-based betting game engine: players declare number ranges, a secret
//! number is drawn each round, tighter winning bets pay more, and the first
//! player to reach the win condition takes the game.
//!
//! The engine is platform-agnostic: it talks to chat through the
//! [`chat::ChatClient`] trait and to randomness through [`dice::Dice`], so a
//! hosting application only has to implement those two seams. The bundled
//! binary wires a console-backed client for local play.

pub mod bet;
pub mod chat;
pub mod config;
pub mod dice;
pub mod error;
pub mod services;
pub mod state;
pub mod timing;
