//! Parsing and validation of bet submissions.
//!
//! A bet is a message whose entire content is `[A, B]`, where each side is a
//! 1–3 digit non-negative integer or the randomization token `r`. Tokens are
//! resolved with uniform draws from the injected [`Dice`] so a seeded source
//! reproduces the same bets.

use thiserror::Error;

use crate::dice::Dice;

/// Token a player can use in place of a bound to let the bot pick it.
pub const RANDOM_TOKEN: &str = "r";

/// A validated inclusive betting range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetRange {
    /// Inclusive lower bound.
    pub start: u32,
    /// Inclusive upper bound, `start <= end <= range`.
    pub end: u32,
}

impl BetRange {
    /// Whether the drawn number falls inside this range.
    pub fn contains(&self, drawn: u32) -> bool {
        self.start <= drawn && drawn <= self.end
    }

    /// Points awarded when this range contains the drawn number: tighter
    /// ranges pay more, the full range pays nothing.
    pub fn payout(&self, range: u32) -> u32 {
        range.saturating_sub(self.end - self.start)
    }
}

impl std::fmt::Display for BetRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

/// Why a submission was not accepted as a bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BetError {
    /// The text does not match the `[A, B]` grammar.
    #[error("bet does not match the `[start, end]` format")]
    Malformed,
    /// The resolved bounds are inverted or exceed the game range.
    #[error("bet bounds fall outside the valid range")]
    OutOfBounds,
}

/// One side of a bet before token resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Literal(u32),
    Random,
}

fn parse_bound(text: &str) -> Option<Bound> {
    if text == RANDOM_TOKEN {
        return Some(Bound::Random);
    }
    if text.is_empty() || text.len() > 3 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().map(Bound::Literal)
}

/// Parse a raw submission into a validated [`BetRange`].
///
/// Token resolution: a random start draws in `[0, end]`, a random end draws
/// in `[start, range]`, and two tokens draw two independent values in
/// `[0, range]` with the lower becoming the start. After resolution the
/// range must satisfy `start <= end <= range`.
pub fn parse(text: &str, range: u32, dice: &dyn Dice) -> Result<BetRange, BetError> {
    let inner = text
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or(BetError::Malformed)?;
    let (left, right) = inner.split_once(", ").ok_or(BetError::Malformed)?;
    let left = parse_bound(left).ok_or(BetError::Malformed)?;
    let right = parse_bound(right).ok_or(BetError::Malformed)?;

    let (start, end) = match (left, right) {
        (Bound::Literal(start), Bound::Literal(end)) => (start, end),
        (Bound::Random, Bound::Literal(end)) => (dice.roll(0, end), end),
        (Bound::Literal(start), Bound::Random) => (start, dice.roll(start, range)),
        (Bound::Random, Bound::Random) => {
            let first = dice.roll(0, range);
            let second = dice.roll(0, range);
            (first.min(second), first.max(second))
        }
    };

    if start > end || end > range {
        return Err(BetError::OutOfBounds);
    }
    Ok(BetRange { start, end })
}
