//! The round engine: a straight-line async loop driving one game from the
//! join window to its terminal state.
//!
//! Each phase opens at most one collection window, arms the shared pausable
//! timer with the window's duration, and reads the window's entries once the
//! timer fires. Pause, resume, and abort arrive from other tasks through
//! [`EngineShared`]; the loop re-checks the terminal flag after every wait so
//! an aborted game never drives another transition.

use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use tokio::{sync::Notify, time::Duration};
use tracing::{debug, info, trace, warn};

use crate::{
    bet::{self, BetRange},
    chat::{CONFIRM_EMOJI, ChatClient, ChannelId, MessageEvent, Participant, ReactionEvent},
    config::{AppConfig, GameConfig, GameMode},
    dice::Dice,
    error::ServiceError,
    services::announce,
    state::{
        EndReason, InvalidTransition, PauseError, PayoutRule, RankedEntry, RoundEvent, RoundPhase,
        RoundStateMachine, ScoreBoard,
    },
    timing::{CollectionWindow, PausableTimer, TimerOutcome},
};

/// State a running game shares with the command surface (pause, resume,
/// abort, standings) while the engine task drives the rounds.
pub struct EngineShared {
    machine: Mutex<RoundStateMachine>,
    timer: PausableTimer,
    scores: Mutex<ScoreBoard>,
    ended: Notify,
}

impl EngineShared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            machine: Mutex::new(RoundStateMachine::new()),
            timer: PausableTimer::new(),
            scores: Mutex::new(ScoreBoard::default()),
            ended: Notify::new(),
        })
    }

    fn machine(&self) -> MutexGuard<'_, RoundStateMachine> {
        self.machine.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn scores(&self) -> MutexGuard<'_, ScoreBoard> {
        self.scores.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current phase of the game.
    pub fn phase(&self) -> RoundPhase {
        self.machine().phase()
    }

    /// Whether the game reached its terminal state.
    pub fn is_ended(&self) -> bool {
        self.machine().is_ended()
    }

    /// Whether the pause overlay is active.
    pub fn is_paused(&self) -> bool {
        self.machine().is_paused()
    }

    /// Whether the first round ever began.
    pub fn has_started(&self) -> bool {
        self.machine().has_started()
    }

    /// Current leaderboard with tie-aware ranks.
    pub fn standings(&self) -> Vec<RankedEntry> {
        self.scores().standings()
    }

    /// Freeze the timer and the attached collection window.
    pub fn pause(&self) -> Result<(), PauseError> {
        self.machine().pause()?;
        self.timer.pause();
        Ok(())
    }

    /// Restart the frozen countdown.
    pub fn resume(&self) -> Result<(), PauseError> {
        self.machine().resume()?;
        self.timer.resume();
        Ok(())
    }

    /// Flip the terminal flag and cancel whatever the engine is waiting on.
    pub fn abort(&self) -> Result<(), InvalidTransition> {
        self.machine().apply(RoundEvent::Abort)?;
        self.timer.cancel();
        self.ended.notify_waiters();
        Ok(())
    }
}

/// One game's driver. Created per invocation, consumed by [`RoundEngine::run`].
pub struct RoundEngine {
    chat: Arc<dyn ChatClient>,
    dice: Arc<dyn Dice>,
    channel: ChannelId,
    config: GameConfig,
    tuning: AppConfig,
    shared: Arc<EngineShared>,
}

impl RoundEngine {
    /// Build an engine for one game in one channel.
    pub fn new(
        chat: Arc<dyn ChatClient>,
        dice: Arc<dyn Dice>,
        channel: ChannelId,
        config: GameConfig,
        tuning: AppConfig,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            chat,
            dice,
            channel,
            config,
            tuning,
            shared: EngineShared::new(),
        })
    }

    /// Handle the command surface keeps while this engine runs.
    pub fn shared(&self) -> Arc<EngineShared> {
        Arc::clone(&self.shared)
    }

    /// Drive the game to its terminal state.
    ///
    /// A collaborator failure is announced once and then the engine stalls,
    /// scores intact, until someone aborts; it never retries on its own.
    pub async fn run(mut self, starter: Participant) {
        let channel = self.channel;
        match self.play(starter).await {
            Ok(()) => debug!(%channel, "game finished"),
            Err(err) => {
                warn!(%channel, error = %err, "game stalled on a collaborator failure");
                if let Err(err) = self
                    .chat
                    .send_message(channel, announce::collection_failed())
                    .await
                {
                    warn!(%channel, error = %err, "failed to report the stall");
                }
                self.stall_until_abort().await;
            }
        }
    }

    async fn play(&mut self, starter: Participant) -> Result<(), ServiceError> {
        if !self.advance(RoundEvent::StartGame)? {
            return Ok(());
        }

        if self.config.mode == GameMode::UltimateRandom {
            // Sampled once; fixed for the rest of the game.
            self.config.win_condition = self.dice.roll(1, self.config.win_condition.max(1));
            self.config.rounds = self.dice.roll(1, self.config.rounds.max(1));
            debug!(
                win_condition = self.config.win_condition,
                rounds = self.config.rounds,
                "sampled ultimate-random game parameters"
            );
        }

        let Some(roster) = self.collect_participants(&starter).await? else {
            return Ok(());
        };
        let channel = self.channel;
        info!(%channel, players = roster.len(), "game started");

        let mut round: u32 = 0;
        loop {
            let (range, round_time) = self.round_parameters();

            let Some(bets) = self.collect_bets(round, range, round_time, &roster).await? else {
                return Ok(());
            };

            if !self.advance(RoundEvent::BetsCollected)? {
                return Ok(());
            }
            self.chat
                .send_message(self.channel, announce::bets(&bets))
                .await?;
            if !self.wait(self.tuning.step_delay).await {
                return Ok(());
            }

            if !self.advance(RoundEvent::BetsAnnounced)? {
                return Ok(());
            }
            let placeholder = self
                .chat
                .send_message(self.channel, announce::reveal_placeholder())
                .await?;
            if !self.wait(self.tuning.suspense_delay).await {
                return Ok(());
            }
            let drawn = self.dice.roll(0, range);
            self.chat
                .edit_message(placeholder, announce::reveal(drawn))
                .await?;
            info!(round, drawn, "revealed the secret number");
            if !self.wait(self.tuning.step_delay).await {
                return Ok(());
            }

            if !self.advance(RoundEvent::NumberRevealed)? {
                return Ok(());
            }
            let rule = match self.config.mode {
                GameMode::UltimateRandom => PayoutRule::Randomized,
                _ => PayoutRule::Full,
            };
            let standings = {
                let mut scores = self.shared.scores();
                scores.apply_round(&bets, drawn, range, rule, self.dice.as_ref());
                scores.standings()
            };

            if !self.advance(RoundEvent::RoundScored)? {
                return Ok(());
            }
            let crowns = self.config.mode != GameMode::Unlimited;
            self.chat
                .send_message(
                    self.channel,
                    announce::leaderboard(&standings, self.config.win_condition, crowns),
                )
                .await?;
            if !self.wait(self.tuning.step_delay).await {
                return Ok(());
            }

            round += 1;
            if self.config.mode != GameMode::Unlimited && self.try_finish(round).await? {
                return Ok(());
            }
            if !self.advance(RoundEvent::NextRound)? {
                return Ok(());
            }
        }
    }

    /// Termination check run after each round's leaderboard: a reached win
    /// condition ends the game immediately; otherwise the round cap ends it
    /// with the current leader (or nobody, if every score is still zero).
    async fn try_finish(&self, rounds_played: u32) -> Result<bool, ServiceError> {
        let (top, leaders) = {
            let scores = self.shared.scores();
            (scores.top_score(), scores.leaders())
        };

        if top >= self.config.win_condition {
            self.chat
                .send_message(self.channel, announce::winners(&leaders, top))
                .await?;
            self.advance(RoundEvent::Finish(EndReason::WinnerDecided))?;
            return Ok(true);
        }

        if rounds_played >= self.config.rounds {
            if top == 0 {
                self.chat
                    .send_message(self.channel, announce::no_winner())
                    .await?;
                self.advance(RoundEvent::Finish(EndReason::NoWinner))?;
            } else {
                self.chat
                    .send_message(self.channel, announce::winners(&leaders, top))
                    .await?;
                self.advance(RoundEvent::Finish(EndReason::WinnerDecided))?;
            }
            return Ok(true);
        }

        Ok(false)
    }

    /// Open the reaction-based join window and seed the roster.
    ///
    /// Returns `None` when the game ended during collection (abort, or not
    /// enough players).
    async fn collect_participants(
        &self,
        starter: &Participant,
    ) -> Result<Option<Vec<Participant>>, ServiceError> {
        let prompt = announce::join_prompt(starter, self.config.mode, self.tuning.join_window);
        let message = self.chat.send_message(self.channel, prompt).await?;
        // Best-effort hint; joining works without it.
        if let Err(err) = self.chat.react(message, CONFIRM_EMOJI.into()).await {
            debug!(error = %err, "failed to react to the join message");
        }

        let reactions = self.chat.reactions(message).await?;
        let window = CollectionWindow::open(
            reactions,
            self.tuning.join_window,
            |event: ReactionEvent| async move {
                if event.emoji == CONFIRM_EMOJI {
                    Some((event.user, ()))
                } else {
                    None
                }
            },
        );
        self.shared
            .timer
            .arm(self.tuning.join_window, Some(window.control()));
        if self.shared.timer.elapsed().await == TimerOutcome::Cancelled {
            window.close();
            return Ok(None);
        }

        let mut roster: Vec<Participant> = window.close().into_keys().collect();
        if roster.len() <= 1 {
            self.chat
                .send_message(self.channel, announce::not_enough_players())
                .await?;
            self.advance(RoundEvent::NoPlayers)?;
            return Ok(None);
        }

        roster.truncate(self.tuning.max_players);
        // The bot only plays when it is the sole opponent.
        if roster.len() > 2 {
            let me = self.chat.identity();
            roster.retain(|user| user.id != me.id);
        }

        self.chat
            .send_message(self.channel, announce::participants(&roster))
            .await?;
        *self.shared.scores() = ScoreBoard::seed(roster.iter().cloned());

        if !self.advance(RoundEvent::ParticipantsReady)? {
            return Ok(None);
        }
        if !self.wait(self.tuning.step_delay).await {
            return Ok(None);
        }
        Ok(Some(roster))
    }

    /// Open a round's message-based bet window; inject the bot's own bet
    /// when it plays. Returns `None` when the game ended during collection.
    async fn collect_bets(
        &self,
        round: u32,
        range: u32,
        round_time: Duration,
        roster: &[Participant],
    ) -> Result<Option<IndexMap<Participant, BetRange>>, ServiceError> {
        let header =
            announce::round_header(round, self.config.rounds, self.config.mode, range, round_time);
        self.chat.send_message(self.channel, header).await?;

        let messages = self.chat.messages(self.channel).await?;
        let chat = Arc::clone(&self.chat);
        let dice = Arc::clone(&self.dice);
        let window = CollectionWindow::open(messages, round_time, move |event: MessageEvent| {
            let chat = Arc::clone(&chat);
            let dice = Arc::clone(&dice);
            async move {
                // Rejected submissions get no feedback and may be retried.
                let bet = bet::parse(&event.content, range, dice.as_ref()).ok()?;
                if let Err(err) = chat.react(event.id, CONFIRM_EMOJI.into()).await {
                    debug!(error = %err, "failed to acknowledge a bet");
                }
                Some((event.author, bet))
            }
        });
        self.shared.timer.arm(round_time, Some(window.control()));
        if self.shared.timer.elapsed().await == TimerOutcome::Cancelled {
            window.close();
            return Ok(None);
        }

        let mut bets = window.close();
        let me = self.chat.identity();
        if roster.contains(&me) {
            let first = self.dice.roll(0, range);
            let second = self.dice.roll(0, range);
            let bet = BetRange {
                start: first.min(second),
                end: first.max(second),
            };
            trace!(%bet, "injected the bot's own bet");
            bets.insert(me, bet);
        }
        Ok(Some(bets))
    }

    /// Per-round range and bet-window length; re-randomized from the
    /// configured values in ultimate-random mode.
    fn round_parameters(&self) -> (u32, Duration) {
        match self.config.mode {
            GameMode::UltimateRandom => {
                let secs = self
                    .dice
                    .roll(10, self.config.round_time.as_secs().min(u64::from(u32::MAX)) as u32);
                let range = self.dice.roll(0, self.config.range);
                (range, Duration::from_secs(u64::from(secs)))
            }
            _ => (self.config.range, self.config.round_time),
        }
    }

    /// Apply a state-machine event unless the game already ended.
    ///
    /// `Ok(false)` means the terminal flag won the race and the caller must
    /// unwind without driving any further phase.
    fn advance(&self, event: RoundEvent) -> Result<bool, ServiceError> {
        let next = {
            let mut machine = self.shared.machine();
            if machine.is_ended() {
                return Ok(false);
            }
            machine.apply(event)?
        };
        trace!(?next, "phase advanced");
        if matches!(next, RoundPhase::Ended(_)) {
            self.shared.ended.notify_waiters();
        }
        Ok(true)
    }

    /// Timer-driven gap between phases; `false` means the game ended.
    async fn wait(&self, delay: Duration) -> bool {
        self.shared.timer.arm(delay, None);
        self.shared.timer.elapsed().await == TimerOutcome::Elapsed && !self.shared.is_ended()
    }

    /// Park until someone aborts the game.
    async fn stall_until_abort(&self) {
        loop {
            let notified = self.shared.ended.notified();
            if self.shared.is_ended() {
                return;
            }
            notified.await;
        }
    }
}
