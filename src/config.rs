//! Application-level configuration loading, including game defaults and the
//! timing knobs of the round engine.

use std::{env, fs, io::ErrorKind, path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::ServiceError;

/// Default location on disk where the binary looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "RACE_TO_HUNDRED_CONFIG_PATH";

/// The three game variants; see [`GameConfig`] for what each alters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Fixed round count, fixed range, first to the win condition wins.
    Classic,
    /// No round cap and no score-based win; abort is the only way to end.
    Unlimited,
    /// Win condition, round count, round time, and range are themselves
    /// randomized before/during play.
    UltimateRandom,
}

impl FromStr for GameMode {
    type Err = ServiceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "unlimited" => Ok(Self::Unlimited),
            "ultimate" | "ultimate_random" | "ultimate-random" => Ok(Self::UltimateRandom),
            other => Err(ServiceError::InvalidInput(format!(
                "unknown game mode `{other}` (expected classic, unlimited, or ultimate)"
            ))),
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Classic => "Classic",
            Self::Unlimited => "Unlimited",
            Self::UltimateRandom => "Ultimate Random",
        };
        f.write_str(name)
    }
}

/// Per-game settings, immutable once the engine starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    /// Game variant.
    pub mode: GameMode,
    /// Inclusive upper bound of valid bets and secret numbers.
    pub range: u32,
    /// Score needed to win outright (ignored in Unlimited mode).
    pub win_condition: u32,
    /// Round cap (ignored in Unlimited mode).
    pub rounds: u32,
    /// Length of each round's bet window.
    pub round_time: Duration,
}

impl GameConfig {
    /// Reject configurations the engine cannot run.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.rounds < 1 && self.mode != GameMode::Unlimited {
            return Err(ServiceError::InvalidInput(
                "a game needs at least one round".into(),
            ));
        }
        if self.round_time < Duration::from_secs(1) {
            return Err(ServiceError::InvalidInput(
                "the bet window must be at least one second".into(),
            ));
        }
        Ok(())
    }
}

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Length of the reaction-based join window. Fixed per deployment, not
    /// per game.
    pub join_window: Duration,
    /// Most participants kept from the join window, in arrival order.
    pub max_players: usize,
    /// Short gap between a phase's last message and the next phase.
    pub step_delay: Duration,
    /// Suspense gap between the reveal placeholder and the drawn number.
    pub suspense_delay: Duration,
    /// Game settings used when the starter does not override them.
    pub game_defaults: GameConfig,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the
    /// built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Game settings for the given mode, derived from the defaults.
    pub fn game_config(&self, mode: GameMode) -> GameConfig {
        GameConfig {
            mode,
            ..self.game_defaults
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            join_window: Duration::from_secs(30),
            max_players: 10,
            step_delay: Duration::from_secs(1),
            suspense_delay: Duration::from_secs(5),
            game_defaults: GameConfig {
                mode: GameMode::Classic,
                range: 100,
                win_condition: 100,
                rounds: 5,
                round_time: Duration::from_secs(30),
            },
        }
    }
}

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawConfig {
    join_window_secs: u64,
    max_players: usize,
    step_delay_ms: u64,
    suspense_delay_ms: u64,
    range: u32,
    win_condition: u32,
    rounds: u32,
    round_time_secs: u64,
}

impl Default for RawConfig {
    fn default() -> Self {
        let defaults = AppConfig::default();
        Self {
            join_window_secs: defaults.join_window.as_secs(),
            max_players: defaults.max_players,
            step_delay_ms: defaults.step_delay.as_millis() as u64,
            suspense_delay_ms: defaults.suspense_delay.as_millis() as u64,
            range: defaults.game_defaults.range,
            win_condition: defaults.game_defaults.win_condition,
            rounds: defaults.game_defaults.rounds,
            round_time_secs: defaults.game_defaults.round_time.as_secs(),
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            join_window: Duration::from_secs(raw.join_window_secs),
            max_players: raw.max_players,
            step_delay: Duration::from_millis(raw.step_delay_ms),
            suspense_delay: Duration::from_millis(raw.suspense_delay_ms),
            game_defaults: GameConfig {
                mode: GameMode::Classic,
                range: raw.range,
                win_condition: raw.win_condition,
                rounds: raw.rounds,
                round_time: Duration::from_secs(raw.round_time_secs),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_from_command_text() {
        assert_eq!("classic".parse::<GameMode>().unwrap(), GameMode::Classic);
        assert_eq!("Unlimited".parse::<GameMode>().unwrap(), GameMode::Unlimited);
        assert_eq!(
            "ultimate".parse::<GameMode>().unwrap(),
            GameMode::UltimateRandom
        );
        assert!("poker".parse::<GameMode>().is_err());
    }

    #[test]
    fn defaults_match_the_documented_game() {
        let config = AppConfig::default();
        assert_eq!(config.join_window, Duration::from_secs(30));
        assert_eq!(config.max_players, 10);
        let game = config.game_config(GameMode::Classic);
        assert_eq!(game.range, 100);
        assert_eq!(game.win_condition, 100);
        assert_eq!(game.rounds, 5);
        assert_eq!(game.round_time, Duration::from_secs(30));
        assert!(game.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_remaining_defaults() {
        let raw: RawConfig = serde_json::from_str(r#"{"rounds": 3}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.game_defaults.rounds, 3);
        assert_eq!(config.game_defaults.range, 100);
    }

    #[test]
    fn zero_rounds_is_rejected_outside_unlimited() {
        let mut game = AppConfig::default().game_config(GameMode::Classic);
        game.rounds = 0;
        assert!(game.validate().is_err());
        game.mode = GameMode::Unlimited;
        assert!(game.validate().is_ok());
    }
}
