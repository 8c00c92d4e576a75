//! Simulator settings, read from the environment or a JSON file.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use settlers_core::{BotDifficulty, GameConfig};
use std::path::Path;

/// Hard stop for unattended games when none is configured
pub const DEFAULT_MAX_TURNS: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub game: GameConfig,
    /// Games to play back to back; game `n` uses seed `seed + n`
    pub games: u32,
    pub bot: BotDifficulty,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            game: GameConfig {
                max_turns: Some(DEFAULT_MAX_TURNS),
                ..GameConfig::default()
            },
            games: 1,
            bot: BotDifficulty::Medium,
        }
    }
}

impl SimConfig {
    /// `SIM_CONFIG` names a JSON file; otherwise the individual `SIM_*`
    /// variables are used
    pub fn from_env() -> anyhow::Result<Self> {
        let config = match std::env::var("SIM_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::from_vars(|key| std::env::var(key).ok())?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Some(players) = var("SIM_PLAYERS") {
            config.game.player_names = match players.trim().parse::<usize>() {
                Ok(count) => (1..=count).map(|i| format!("Bot {i}")).collect(),
                Err(_) => players.split(',').map(|p| p.trim().to_string()).collect(),
            };
        }
        if let Some(seed) = var("SIM_SEED") {
            config.game.seed = Some(seed.trim().parse().context("SIM_SEED")?);
        }
        if let Some(games) = var("SIM_GAMES") {
            config.games = games.trim().parse().context("SIM_GAMES")?;
        }
        if let Some(turns) = var("SIM_MAX_TURNS") {
            config.game.max_turns = Some(turns.trim().parse().context("SIM_MAX_TURNS")?);
        }
        if let Some(bot) = var("SIM_BOT") {
            config.bot = bot.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.games == 0 {
            bail!("SIM_GAMES must be at least 1");
        }
        self.game.validate()?;
        Ok(())
    }

    /// Config for the `index`th game of the run
    pub fn game(&self, index: u32) -> GameConfig {
        let mut game = self.game.clone();
        game.seed = self.game.seed.map(|s| s.wrapping_add(index as u64));
        game
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SimConfig::from_vars(vars(&[])).unwrap();
        assert_eq!(config.games, 1);
        assert_eq!(config.game.player_names.len(), 3);
        assert_eq!(config.game.max_turns, Some(DEFAULT_MAX_TURNS));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_player_count_or_names() {
        let config = SimConfig::from_vars(vars(&[("SIM_PLAYERS", "4")])).unwrap();
        assert_eq!(config.game.player_names, ["Bot 1", "Bot 2", "Bot 3", "Bot 4"]);

        let config = SimConfig::from_vars(vars(&[("SIM_PLAYERS", "Ann, Bo")])).unwrap();
        assert_eq!(config.game.player_names, ["Ann", "Bo"]);
    }

    #[test]
    fn test_seeds_advance_per_game() {
        let config = SimConfig::from_vars(vars(&[
            ("SIM_SEED", "40"),
            ("SIM_GAMES", "3"),
            ("SIM_BOT", "easy"),
        ]))
        .unwrap();
        assert_eq!(config.bot, BotDifficulty::Easy);
        assert_eq!(config.game(2).seed, Some(42));
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(SimConfig::from_vars(vars(&[("SIM_SEED", "abc")])).is_err());
        assert!(SimConfig::from_vars(vars(&[("SIM_BOT", "hard")])).is_err());

        let config = SimConfig::from_vars(vars(&[("SIM_PLAYERS", "1")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_config() {
        let config: SimConfig =
            serde_json::from_str(r#"{"games": 2, "game": {"player_names": ["A", "B"]}}"#)
                .unwrap();
        assert_eq!(config.games, 2);
        assert_eq!(config.game.player_names, ["A", "B"]);
        assert_eq!(config.bot, BotDifficulty::Medium);
    }
}
