//! Text builders for everything the engine says in the channel.
//!
//! Presentation stays plain text; rendering (embeds, tables) belongs to the
//! hosting layer. Keeping the wording in one place keeps the engine readable
//! and the strings testable.

use std::time::Duration;

use indexmap::IndexMap;

use crate::{
    bet::BetRange,
    chat::{CONFIRM_EMOJI, Participant},
    config::GameMode,
    state::RankedEntry,
};

/// Rules summary shown by the `rules` command.
pub fn rules() -> String {
    [
        "- **Number of players**: 1 - 10.",
        "- **Modes**: Classic, Unlimited, Ultimate Random.",
        "- Each round all players declare a range within the game's bounds.",
        "- **The declare message has to follow the format '[start, end]' and contain nothing else.** \
         Either bound may be `r` to let the bot pick it at random.",
        "- The bot then draws a secret number within the bounds.",
        "- If the drawn number lands inside your declared range, you receive `range - (end - start)` points.",
        "- The first player to reach the win condition, or the player with the highest score after \
         the last round, wins. Unlimited games run until aborted.",
    ]
    .join("\n")
}

/// Invitation message opening the join window.
pub fn join_prompt(starter: &Participant, mode: GameMode, join_window: Duration) -> String {
    format!(
        "{starter} started a race to 100 ({mode})! You have {} seconds to react {CONFIRM_EMOJI} \
         to this message to participate.",
        join_window.as_secs()
    )
}

/// Shown when the join window closes with one or zero reactors.
pub fn not_enough_players() -> String {
    "Looks like there's not enough players. The game will not start.".into()
}

/// Roster announcement once the join window closes with enough players.
pub fn participants(users: &[Participant]) -> String {
    let names = users
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Time's up! {names} will be the participants for this game!")
}

/// Header opening a round's bet window.
pub fn round_header(
    round: u32,
    rounds: u32,
    mode: GameMode,
    range: u32,
    round_time: Duration,
) -> String {
    let counter = match mode {
        GameMode::Unlimited => format!("Round **#{}!**", round + 1),
        _ => format!("Round **#{}** of **{rounds}!**", round + 1),
    };
    format!(
        "{counter}\nYou have {} seconds to place a bet between 0 and {range}.\n\
         **The declare message has to follow the format '[start, end]' and contain nothing else.**\n\
         Upon successfully receiving your bet, I will react to your message with a {CONFIRM_EMOJI}.\n\
         You can change your bet anytime before the timer ends. Your last bet will be your final choice.",
        round_time.as_secs()
    )
}

/// Summary of all retained bets once the window closes.
pub fn bets(entries: &IndexMap<Participant, BetRange>) -> String {
    let lines = entries
        .iter()
        .map(|(who, bet)| format!("- {who}: {bet}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Time's up! Here are the bets:\n{lines}")
}

/// Placeholder sent before the secret number is revealed.
pub fn reveal_placeholder() -> String {
    "And the secret number is: ...".into()
}

/// Edited-in reveal of the drawn number.
pub fn reveal(drawn: u32) -> String {
    format!("And the secret number is: {drawn}!")
}

/// Leaderboard after a scored round; entries at or above the win condition
/// get a crown.
pub fn leaderboard(standings: &[RankedEntry], win_condition: u32, crowns: bool) -> String {
    let lines = standings
        .iter()
        .map(|entry| {
            let crown = if crowns && entry.score >= win_condition {
                " 👑"
            } else {
                ""
            };
            format!(
                "#{}. {}: {} points.{crown}",
                entry.rank, entry.participant, entry.score
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("Here's the leaderboard after this round:\n{lines}")
}

/// Final standings emitted when an Unlimited game is aborted.
pub fn final_leaderboard(standings: &[RankedEntry]) -> String {
    let lines = standings
        .iter()
        .map(|entry| format!("#{}. {}: {} points.", entry.rank, entry.participant, entry.score))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Final standings:\n{lines}")
}

/// Winner announcement; tie groups are announced jointly.
pub fn winners(leaders: &[Participant], score: u32) -> String {
    let names = leaders
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    if leaders.len() > 1 {
        format!("Congratulations! The winners are: {names} with {score} points!")
    } else {
        format!("Congratulations! The winner is: {names} with {score} points!")
    }
}

/// Shown when the round cap is reached with every score still at zero.
pub fn no_winner() -> String {
    "All rounds are played and nobody scored. There is no winner this time.".into()
}

/// Abort confirmation.
pub fn aborted() -> String {
    "The game has been aborted.".into()
}

/// Pause confirmation.
pub fn paused() -> String {
    "Paused.".into()
}

/// Resume confirmation.
pub fn resumed() -> String {
    "The game continues!".into()
}

/// One-off report when a collection window yields no snapshot.
pub fn collection_failed() -> String {
    "An unexpected error has occurred. The round cannot continue; abort the game to end it.".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn someone(name: &str) -> Participant {
        Participant {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    #[test]
    fn leaderboard_crowns_win_condition_scores() {
        let standings = vec![
            RankedEntry {
                rank: 1,
                participant: someone("A"),
                score: 120,
            },
            RankedEntry {
                rank: 2,
                participant: someone("B"),
                score: 60,
            },
        ];
        let text = leaderboard(&standings, 100, true);
        assert!(text.contains("#1. **A**: 120 points. 👑"));
        assert!(text.contains("#2. **B**: 60 points."));
        assert!(!text.contains("60 points. 👑"));
    }

    #[test]
    fn joint_winners_are_announced_together() {
        let text = winners(&[someone("A"), someone("B")], 110);
        assert!(text.contains("winners are"));
        assert!(text.contains("**A**, **B**"));
    }

    #[test]
    fn unlimited_round_header_hides_the_round_cap() {
        let header = round_header(2, 5, GameMode::Unlimited, 100, Duration::from_secs(30));
        assert!(header.contains("Round **#3!**"));
        assert!(!header.contains("of **5!**"));
    }
}
