//! Headless settlers simulator: plays bot-only games and prints a JSON
//! summary of each to stdout.

use serde::Serialize;
use settlers_core::{Bot, GameManager, GameSummary, PlayerSource, TracingObserver};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::SimConfig;

#[derive(Debug, Serialize)]
struct RunReport {
    games: Vec<GameSummary>,
    /// Wins per seat across the run
    wins: Vec<u32>,
    unfinished: u32,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = SimConfig::from_env()?;
    info!(
        games = config.games,
        players = config.game.player_names.len(),
        bot = ?config.bot,
        "starting simulation"
    );

    let mut report = RunReport {
        games: Vec::new(),
        wins: vec![0; config.game.player_names.len()],
        unfinished: 0,
    };

    for index in 0..config.games {
        let summary = play(&config, index)?;
        match summary.winner {
            Some(winner) => {
                if let Some(wins) = report.wins.get_mut(winner as usize) {
                    *wins += 1;
                }
            }
            None => report.unfinished += 1,
        }
        report.games.push(summary);
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn play(config: &SimConfig, index: u32) -> anyhow::Result<GameSummary> {
    let game = config.game(index);
    let sources: Vec<Box<dyn PlayerSource>> = (0..game.player_names.len())
        .map(|seat| {
            let seat = seat as u8;
            let bot = match game.seed {
                Some(seed) => Bot::with_seed(seat, config.bot, seed.wrapping_mul(31).wrapping_add(seat as u64)),
                None => Bot::new(seat, config.bot),
            };
            Box::new(bot) as Box<dyn PlayerSource>
        })
        .collect();

    let mut manager = GameManager::new(&game, sources)?;
    manager.add_observer(TracingObserver);
    let summary = manager.run()?;
    info!(game = index, winner = ?summary.winner, turns = summary.turns, "game complete");
    Ok(summary)
}
