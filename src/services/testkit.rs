//! Scripted chat client and deterministic dice for service-level tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use futures::{StreamExt, future::BoxFuture, stream::BoxStream};
use tokio::time::Duration;
use uuid::Uuid;

use crate::{
    chat::{
        CONFIRM_EMOJI, ChannelId, ChatClient, ChatError, ChatResult, MessageEvent, MessageHandle,
        Participant, ReactionEvent,
    },
    dice::Dice,
};

/// A participant with a fresh id and the given display name.
pub(crate) fn someone(name: &str) -> Participant {
    Participant {
        id: Uuid::new_v4(),
        name: name.into(),
    }
}

/// A join reaction arriving as soon as the stream opens.
pub(crate) fn reaction(who: &Participant) -> (Duration, ReactionEvent) {
    (
        Duration::ZERO,
        ReactionEvent {
            message: MessageHandle(Uuid::nil()),
            user: who.clone(),
            emoji: CONFIRM_EMOJI.into(),
        },
    )
}

/// A chat message arriving as soon as the stream opens.
pub(crate) fn bet_msg(who: &Participant, content: &str) -> (Duration, MessageEvent) {
    delayed_bet(who, content, Duration::ZERO)
}

/// A chat message arriving `delay` after the previous scripted event.
pub(crate) fn delayed_bet(
    who: &Participant,
    content: &str,
    delay: Duration,
) -> (Duration, MessageEvent) {
    (
        delay,
        MessageEvent {
            id: MessageHandle(Uuid::new_v4()),
            author: who.clone(),
            content: content.into(),
        },
    )
}

/// Chat double replaying pre-scripted event streams and recording everything
/// the engine says.
///
/// The reaction script is consumed by the first `reactions` call (one join
/// window per game); each `messages` call consumes one scripted batch (one
/// bet window per round). Scripted delays are relative to the previous event
/// in the same stream.
pub(crate) struct ScriptedChat {
    me: Participant,
    sent: Mutex<Vec<String>>,
    reacted: AtomicUsize,
    reaction_script: Mutex<Option<Vec<(Duration, ReactionEvent)>>>,
    message_batches: Mutex<VecDeque<Vec<(Duration, MessageEvent)>>>,
    fail_reactions: AtomicBool,
}

impl ScriptedChat {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            me: someone("the bot"),
            sent: Mutex::new(Vec::new()),
            reacted: AtomicUsize::new(0),
            reaction_script: Mutex::new(None),
            message_batches: Mutex::new(VecDeque::new()),
            fail_reactions: AtomicBool::new(false),
        })
    }

    pub(crate) fn script_reactions(&self, events: Vec<(Duration, ReactionEvent)>) {
        *self.reaction_script.lock().unwrap() = Some(events);
    }

    pub(crate) fn script_messages(&self, batch: Vec<(Duration, MessageEvent)>) {
        self.message_batches.lock().unwrap().push_back(batch);
    }

    pub(crate) fn fail_reaction_streams(&self) {
        self.fail_reactions.store(true, Ordering::SeqCst);
    }

    /// Everything sent or edited into the channel, in order.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn transcript(&self) -> String {
        self.sent().join("\n")
    }

    /// Number of reactions the engine added (join hint plus bet acks).
    pub(crate) fn reactions_sent(&self) -> usize {
        self.reacted.load(Ordering::SeqCst)
    }
}

fn scripted<T: Send + 'static>(events: Vec<(Duration, T)>) -> BoxStream<'static, T> {
    async_stream::stream! {
        for (delay, event) in events {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            yield event;
        }
    }
    .boxed()
}

impl ChatClient for ScriptedChat {
    fn identity(&self) -> Participant {
        self.me.clone()
    }

    fn send_message(
        &self,
        _channel: ChannelId,
        content: String,
    ) -> BoxFuture<'static, ChatResult<MessageHandle>> {
        self.sent.lock().unwrap().push(content);
        Box::pin(std::future::ready(Ok(MessageHandle(Uuid::new_v4()))))
    }

    fn edit_message(
        &self,
        _message: MessageHandle,
        content: String,
    ) -> BoxFuture<'static, ChatResult<()>> {
        self.sent.lock().unwrap().push(content);
        Box::pin(std::future::ready(Ok(())))
    }

    fn delete_message(&self, _message: MessageHandle) -> BoxFuture<'static, ChatResult<()>> {
        Box::pin(std::future::ready(Ok(())))
    }

    fn react(&self, _message: MessageHandle, _emoji: String) -> BoxFuture<'static, ChatResult<()>> {
        self.reacted.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(Ok(())))
    }

    fn reactions(
        &self,
        message: MessageHandle,
    ) -> BoxFuture<'static, ChatResult<BoxStream<'static, ReactionEvent>>> {
        if self.fail_reactions.load(Ordering::SeqCst) {
            return Box::pin(std::future::ready(Err(ChatError::ConnectionClosed)));
        }
        let events = self
            .reaction_script
            .lock()
            .unwrap()
            .take()
            .unwrap_or_default()
            .into_iter()
            .map(|(delay, mut event)| {
                event.message = message;
                (delay, event)
            })
            .collect();
        Box::pin(std::future::ready(Ok(scripted(events))))
    }

    fn messages(
        &self,
        _channel: ChannelId,
    ) -> BoxFuture<'static, ChatResult<BoxStream<'static, MessageEvent>>> {
        let batch = self
            .message_batches
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        Box::pin(std::future::ready(Ok(scripted(batch))))
    }
}

/// Dice replaying a scripted sequence of draws, asserting each one lands in
/// the requested bounds. Degenerate ranges resolve without consuming a draw,
/// matching the production implementations.
pub(crate) struct QueueDice {
    rolls: Mutex<VecDeque<u32>>,
}

impl QueueDice {
    pub(crate) fn new(rolls: impl IntoIterator<Item = u32>) -> Self {
        Self {
            rolls: Mutex::new(rolls.into_iter().collect()),
        }
    }
}

impl Dice for QueueDice {
    fn roll(&self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let Some(value) = self.rolls.lock().unwrap().pop_front() else {
            panic!("dice queue exhausted for a roll in [{min}, {max}]");
        };
        assert!(
            (min..=max).contains(&value),
            "scripted roll {value} outside [{min}, {max}]"
        );
        value
    }
}
