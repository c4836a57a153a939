//! Narrow interface to the hosting chat platform.
//!
//! The engine never talks to a concrete platform: it sends text, reacts, and
//! consumes reaction/message event streams through [`ChatClient`]. The binary
//! ships a console-backed implementation; a real deployment would implement
//! this trait over its chat connection.

pub mod console;

use std::fmt;

use futures::{future::BoxFuture, stream::BoxStream};
use thiserror::Error;
use uuid::Uuid;

/// Emoji used both for joining a game and for acknowledging an accepted bet.
pub const CONFIRM_EMOJI: &str = "✅";

/// Identifier of a channel hosting at most one game at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub Uuid);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque handle to a message previously sent, usable for edits and reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub Uuid);

/// A chat user taking part in (or interacting with) a game.
///
/// Equality and hashing use the id only; the display name is presentation
/// data and may differ between events for the same user.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Stable platform identifier.
    pub id: Uuid,
    /// Display name used in announcements.
    pub name: String,
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Participant {}

impl std::hash::Hash for Participant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "**{}**", self.name)
    }
}

/// A reaction added to a message the engine is watching.
#[derive(Debug, Clone)]
pub struct ReactionEvent {
    /// Message the reaction was added to.
    pub message: MessageHandle,
    /// User who reacted.
    pub user: Participant,
    /// Emoji of the reaction.
    pub emoji: String,
}

/// A message posted in a channel the engine is watching.
#[derive(Debug, Clone)]
pub struct MessageEvent {
    /// Handle of the posted message, usable for acknowledgment reactions.
    pub id: MessageHandle,
    /// Author of the message.
    pub author: Participant,
    /// Raw text content.
    pub content: String,
}

/// Errors surfaced by the chat collaborator.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The platform connection is gone; no further delivery is possible.
    #[error("chat connection closed")]
    ConnectionClosed,
    /// The referenced message no longer exists or was never delivered.
    #[error("unknown message")]
    UnknownMessage,
    /// Platform-specific delivery failure.
    #[error("chat delivery failed: {0}")]
    Delivery(String),
}

/// Outcome alias for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Operations the engine consumes from the hosting chat layer.
///
/// Methods return boxed futures/streams so the engine can hold the client as
/// a trait object and swap implementations (real platform, console, tests).
pub trait ChatClient: Send + Sync {
    /// The bot's own identity, filtered out of (or kept in) the participant
    /// roster per the join rules, and used for synthetic self-play bets.
    fn identity(&self) -> Participant;

    /// Send a text message to a channel, returning a handle for later edits.
    fn send_message(
        &self,
        channel: ChannelId,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageHandle>>;

    /// Replace the content of a previously sent message.
    fn edit_message(
        &self,
        message: MessageHandle,
        content: String,
    ) -> BoxFuture<'static, ChatResult<()>>;

    /// Delete a previously sent message.
    fn delete_message(&self, message: MessageHandle) -> BoxFuture<'static, ChatResult<()>>;

    /// React to a message with an emoji.
    fn react(&self, message: MessageHandle, emoji: String) -> BoxFuture<'static, ChatResult<()>>;

    /// Stream of reactions added to the given message, from now on.
    fn reactions(
        &self,
        message: MessageHandle,
    ) -> BoxFuture<'static, ChatResult<BoxStream<'static, ReactionEvent>>>;

    /// Stream of messages posted to the given channel, from now on.
    fn messages(
        &self,
        channel: ChannelId,
    ) -> BoxFuture<'static, ChatResult<BoxStream<'static, MessageEvent>>>;
}
