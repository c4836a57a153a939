//! Console-backed [`ChatClient`] for local play.
//!
//! Outgoing messages are printed to stdout; incoming events are fed by the
//! REPL in the binary: typed lines become message events, and a `join` line
//! becomes a confirmation reaction on the most recent engine message.

use std::sync::{Arc, Mutex};

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use super::{
    CONFIRM_EMOJI, ChannelId, ChatClient, ChatResult, MessageEvent, MessageHandle, Participant,
    ReactionEvent,
};

/// Slow consumers drop events past this; the engine reads promptly.
const EVENT_BUFFER: usize = 64;

/// Chat client printing to stdout, fed by lines typed on stdin.
pub struct ConsoleChat {
    me: Participant,
    messages: broadcast::Sender<MessageEvent>,
    reactions: broadcast::Sender<ReactionEvent>,
    last_message: Mutex<Option<MessageHandle>>,
}

impl ConsoleChat {
    /// Build a console client with a fresh bot identity.
    pub fn new() -> Arc<Self> {
        let (messages, _) = broadcast::channel(EVENT_BUFFER);
        let (reactions, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            me: Participant {
                id: Uuid::new_v4(),
                name: "the house".into(),
            },
            messages,
            reactions,
            last_message: Mutex::new(None),
        })
    }

    /// Feed a typed chat line as a message event.
    pub fn post_message(&self, author: Participant, content: &str) {
        let event = MessageEvent {
            id: MessageHandle(Uuid::new_v4()),
            author,
            content: content.into(),
        };
        // No receiver just means no window is collecting right now.
        let _ = self.messages.send(event);
    }

    /// React with the confirmation emoji on the engine's most recent message.
    pub fn post_join(&self, user: Participant) {
        let last = *self
            .last_message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(message) = last else {
            return;
        };
        let _ = self.reactions.send(ReactionEvent {
            message,
            user,
            emoji: CONFIRM_EMOJI.into(),
        });
    }
}

impl ChatClient for ConsoleChat {
    fn identity(&self) -> Participant {
        self.me.clone()
    }

    fn send_message(
        &self,
        _channel: ChannelId,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageHandle>> {
        println!("🤖 {content}");
        let handle = MessageHandle(Uuid::new_v4());
        *self
            .last_message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        Box::pin(std::future::ready(Ok(handle)))
    }

    fn edit_message(
        &self,
        _message: MessageHandle,
        content: String,
    ) -> BoxFuture<'static, ChatResult<()>> {
        println!("🤖 (edited) {content}");
        Box::pin(std::future::ready(Ok(())))
    }

    fn delete_message(&self, _message: MessageHandle) -> BoxFuture<'static, ChatResult<()>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn react(&self, _message: MessageHandle, emoji: String) -> BoxFuture<'static, ChatResult<()>> {
        println!("🤖 reacted with {emoji}");
        Box::pin(std::future::ready(Ok(())))
    }

    fn reactions(
        &self,
        message: MessageHandle,
    ) -> BoxFuture<'static, ChatResult<BoxStream<'static, ReactionEvent>>> {
        let receiver = self.reactions.subscribe();
        Box::pin(std::future::ready(Ok(BroadcastStream::new(receiver)
            .filter_map(move |event| {
                std::future::ready(event.ok().filter(|event| event.message == message))
            })
            .boxed())))
    }

    fn messages(
        &self,
        _channel: ChannelId,
    ) -> BoxFuture<'static, ChatResult<BoxStream<'static, MessageEvent>>> {
        let receiver = self.messages.subscribe();
        Box::pin(std::future::ready(Ok(BroadcastStream::new(receiver)
            .filter_map(|event| std::future::ready(event.ok()))
            .boxed())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn someone(name: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    #[tokio::test]
    async fn join_reacts_to_the_latest_message() {
        let chat = ConsoleChat::new();
        let channel = ChannelId(Uuid::new_v4());
        let _older = chat.send_message(channel, "older".into()).await.unwrap();
        let newest = chat.send_message(channel, "newest".into()).await.unwrap();

        let mut reactions = chat.reactions(newest).await.unwrap();
        let alice = someone("alice");
        chat.post_join(alice.clone());
        let event = reactions.next().await.unwrap();
        assert_eq!(event.user, alice);
        assert_eq!(event.emoji, CONFIRM_EMOJI);
        assert_eq!(event.message, newest);
    }

    #[tokio::test]
    async fn reactions_on_other_messages_are_filtered_out() {
        let chat = ConsoleChat::new();
        let channel = ChannelId(Uuid::new_v4());
        let older = chat.send_message(channel, "older".into()).await.unwrap();
        let _newest = chat.send_message(channel, "newest".into()).await.unwrap();

        let mut reactions = chat.reactions(older).await.unwrap();
        // Joins target the newest message, not `older`.
        chat.post_join(someone("alice"));
        chat.post_message(someone("bob"), "[0, 10]");
        drop(chat);
        assert!(reactions.next().await.is_none());
    }

    #[tokio::test]
    async fn typed_lines_reach_message_subscribers() {
        let chat = ConsoleChat::new();
        let channel = ChannelId(Uuid::new_v4());
        let mut messages = chat.messages(channel).await.unwrap();
        let bob = someone("bob");
        chat.post_message(bob.clone(), "[40, 50]");
        let event = messages.next().await.unwrap();
        assert_eq!(event.author, bob);
        assert_eq!(event.content, "[40, 50]");
    }
}
