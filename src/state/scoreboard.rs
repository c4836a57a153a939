use indexmap::IndexMap;

use crate::{bet::BetRange, chat::Participant, dice::Dice};

/// How a winning bet's payout is turned into awarded points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoutRule {
    /// Award the full payout (Classic and Unlimited modes).
    Full,
    /// Award a uniform draw in `[0, payout]` (ultimate-random mode).
    Randomized,
}

/// One line of the ranked leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based rank; tied scores share the same rank and the next distinct
    /// score skips accordingly (`[50, 50, 30]` ranks as `[1, 1, 3]`).
    pub rank: usize,
    /// The ranked participant.
    pub participant: Participant,
    /// Cumulative score.
    pub score: u32,
}

/// Cumulative scores for the fixed participant roster, in join order.
#[derive(Debug, Clone, Default)]
pub struct ScoreBoard {
    scores: IndexMap<Participant, u32>,
}

impl ScoreBoard {
    /// Seed every participant at zero. The roster never changes afterwards.
    pub fn seed<I: IntoIterator<Item = Participant>>(participants: I) -> Self {
        Self {
            scores: participants.into_iter().map(|who| (who, 0)).collect(),
        }
    }

    /// Number of participants on the board.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the board has no participants.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Whether the participant is on the board.
    pub fn contains(&self, who: &Participant) -> bool {
        self.scores.contains_key(who)
    }

    /// Score all bets of one round against the drawn number. Only roster
    /// members can score; the award order does not affect the result.
    pub fn apply_round(
        &mut self,
        bets: &IndexMap<Participant, BetRange>,
        drawn: u32,
        range: u32,
        rule: PayoutRule,
        dice: &dyn Dice,
    ) {
        for (who, bet) in bets {
            if !bet.contains(drawn) {
                continue;
            }
            let Some(score) = self.scores.get_mut(who) else {
                continue;
            };
            let payout = bet.payout(range);
            let awarded = match rule {
                PayoutRule::Full => payout,
                PayoutRule::Randomized => dice.roll(0, payout),
            };
            *score += awarded;
        }
    }

    /// Leaderboard sorted by score descending, ties sharing a rank. Equal
    /// scores keep the roster join order.
    pub fn standings(&self) -> Vec<RankedEntry> {
        let mut ordered: Vec<(Participant, u32)> = self
            .scores
            .iter()
            .map(|(who, score)| (who.clone(), *score))
            .collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1));

        let mut standings = Vec::with_capacity(ordered.len());
        let mut last_score = None;
        let mut last_rank = 0;
        for (index, (participant, score)) in ordered.into_iter().enumerate() {
            let rank = if Some(score) == last_score {
                last_rank
            } else {
                index + 1
            };
            last_score = Some(score);
            last_rank = rank;
            standings.push(RankedEntry {
                rank,
                participant,
                score,
            });
        }
        standings
    }

    /// Highest cumulative score, zero for an empty board.
    pub fn top_score(&self) -> u32 {
        self.scores.values().copied().max().unwrap_or(0)
    }

    /// Whether the top score reached the win condition.
    pub fn has_winner(&self, win_condition: u32) -> bool {
        self.top_score() >= win_condition
    }

    /// Every participant sharing the top score, for joint announcements.
    pub fn leaders(&self) -> Vec<Participant> {
        let top = self.top_score();
        self.scores
            .iter()
            .filter(|(_, score)| **score == top)
            .map(|(who, _)| who.clone())
            .collect()
    }
}
