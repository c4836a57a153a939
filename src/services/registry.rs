//! Per-channel game ownership and the command surface over a running game.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    chat::{ChannelId, ChatClient, Participant},
    config::{AppConfig, GameMode},
    dice::Dice,
    error::ServiceError,
    services::{
        announce,
        engine::{EngineShared, RoundEngine},
    },
    state::RoundPhase,
};

/// Command surface over one running (or just-finished) game.
#[derive(Clone)]
pub struct GameHandle {
    id: Uuid,
    channel: ChannelId,
    mode: GameMode,
    shared: Arc<EngineShared>,
    chat: Arc<dyn ChatClient>,
}

impl std::fmt::Debug for GameHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameHandle")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl GameHandle {
    /// Current phase of the game.
    pub fn phase(&self) -> RoundPhase {
        self.shared.phase()
    }

    /// Whether the game reached its terminal state.
    pub fn is_ended(&self) -> bool {
        self.shared.is_ended()
    }

    /// Freeze the game clock and announce the pause.
    pub async fn pause(&self) -> Result<(), ServiceError> {
        self.shared.pause()?;
        self.chat
            .send_message(self.channel, announce::paused())
            .await?;
        Ok(())
    }

    /// Restart the frozen clock and announce the resumption.
    pub async fn resume(&self) -> Result<(), ServiceError> {
        self.shared.resume()?;
        self.chat
            .send_message(self.channel, announce::resumed())
            .await?;
        Ok(())
    }

    /// End the game immediately. An Unlimited game that played at least one
    /// round gets its final standings posted, since nothing else ends it.
    pub async fn abort(&self) -> Result<(), ServiceError> {
        let started = self.shared.has_started();
        self.shared
            .abort()
            .map_err(|_| ServiceError::InvalidState("the game is already over".into()))?;
        self.chat
            .send_message(self.channel, announce::aborted())
            .await?;
        if self.mode == GameMode::Unlimited && started {
            let standings = self.shared.standings();
            self.chat
                .send_message(self.channel, announce::final_leaderboard(&standings))
                .await?;
        }
        Ok(())
    }
}

/// Owner of every live game, at most one per channel.
pub struct GameRegistry {
    chat: Arc<dyn ChatClient>,
    dice: Arc<dyn Dice>,
    config: AppConfig,
    games: DashMap<ChannelId, GameHandle>,
}

impl GameRegistry {
    /// Build a registry over the given chat client and dice.
    pub fn new(chat: Arc<dyn ChatClient>, dice: Arc<dyn Dice>, config: AppConfig) -> Arc<Self> {
        Arc::new(Self {
            chat,
            dice,
            config,
            games: DashMap::new(),
        })
    }

    /// Start a game in the channel and spawn its engine task.
    ///
    /// Fails while another game in the same channel is still live; a handle
    /// left behind by a finished game is replaced.
    pub fn start(
        self: &Arc<Self>,
        channel: ChannelId,
        starter: Participant,
        mode: GameMode,
    ) -> Result<GameHandle, ServiceError> {
        let engine = RoundEngine::new(
            Arc::clone(&self.chat),
            Arc::clone(&self.dice),
            channel,
            self.config.game_config(mode),
            self.config.clone(),
        )?;
        let handle = GameHandle {
            id: Uuid::new_v4(),
            channel,
            mode,
            shared: engine.shared(),
            chat: Arc::clone(&self.chat),
        };

        use dashmap::mapref::entry::Entry;
        match self.games.entry(channel) {
            Entry::Occupied(entry) if !entry.get().is_ended() => {
                return Err(ServiceError::InvalidState(
                    "a game is already running in this channel".into(),
                ));
            }
            Entry::Occupied(mut entry) => {
                entry.insert(handle.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(handle.clone());
            }
        }

        let registry = Arc::clone(self);
        let id = handle.id;
        tokio::spawn(async move {
            engine.run(starter).await;
            // Only drop our own entry; a replacement game may already exist.
            registry.games.remove_if(&channel, |_, game| game.id == id);
            debug!(%channel, "game task finished");
        });
        info!(%channel, %mode, "game started");
        Ok(handle)
    }

    /// Pause the live game in the channel.
    pub async fn pause(&self, channel: ChannelId) -> Result<(), ServiceError> {
        self.live(channel)?.pause().await
    }

    /// Resume the live game in the channel.
    pub async fn resume(&self, channel: ChannelId) -> Result<(), ServiceError> {
        self.live(channel)?.resume().await
    }

    /// Abort the live game in the channel.
    pub async fn abort(&self, channel: ChannelId) -> Result<(), ServiceError> {
        self.live(channel)?.abort().await
    }

    fn live(&self, channel: ChannelId) -> Result<GameHandle, ServiceError> {
        let handle = self.games.get(&channel).map(|entry| entry.value().clone());
        match handle {
            Some(handle) if !handle.is_ended() => Ok(handle),
            _ => Err(ServiceError::NotFound(
                "there is no ongoing game in this channel".into(),
            )),
        }
    }
}
