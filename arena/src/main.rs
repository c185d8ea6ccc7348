//! Arena - plays search configurations against each other
//!
//! Runs a match of tic-tac-toe or the trick-taking card game between the
//! configured search (the challenger) and an opponent, then reports the
//! challenger's wins, draws, losses and win rate. Seats swap every game.

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod agent;
mod config;
mod game;
mod runner;

use crate::config::{Config, GameKind};
use crate::runner::{run_match, MatchSetup};

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    init_tracing(&config.log_level)?;
    info!(log_level = %config.log_level, "Tracing initialized");

    let game = config.game_kind()?;
    let setup = MatchSetup::from_config(&config)?;
    info!(
        game = %game,
        games = setup.games,
        opponent = %setup.opponent,
        threads = setup.search.threads,
        determinizations = setup.search.determinization_count(),
        iterations = ?setup.search.iterations,
        time_budget = ?setup.search.time_budget,
        pruning = setup.search.pruning,
        "Starting match"
    );

    let report = match game {
        GameKind::TicTacToe => run_match::<games_tictactoe::TicTacToe>(&setup)?,
        GameKind::Jass => run_match::<games_jass::JassGame>(&setup)?,
    };

    if config.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} vs {} over {} games: {} won, {} drawn, {} lost (win rate {:.1}%, mean score {:.3})",
            report.game,
            report.opponent,
            report.games,
            report.wins,
            report.draws,
            report.losses,
            report.win_rate * 100.0,
            report.mean_score
        );
    }

    Ok(())
}
