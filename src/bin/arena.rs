//! Arena CLI: run bot-vs-bot soak games from the command line.
//!
//! Usage:
//!   cargo run --release --bin arena -- --game rithmomachia --games 200 --strategies greedy,random
//!   cargo run --release --bin arena -- --game card-sorting --games 50 --strategies random --config '{"cardCount":5}'

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use arcade_game_engine::engine::arena::{run_named_arena, ArenaRequest};
use arcade_game_engine::engine::settings::{load_default_settings, load_settings};

#[derive(Parser)]
#[command(name = "arena", about = "Run bot-vs-bot arena games")]
struct Cli {
    /// Game id: "card-sorting" or "rithmomachia"
    #[arg(long, default_value = "rithmomachia")]
    game: String,

    /// Number of games to play
    #[arg(long, default_value = "100")]
    games: usize,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Comma-separated strategy names, one per seat
    #[arg(long, value_delimiter = ',', default_value = "greedy,random")]
    strategies: Vec<String>,

    /// Game options as a JSON object
    #[arg(long)]
    config: Option<String>,

    /// Abandon a game after this many plies (default: from settings)
    #[arg(long)]
    max_plies: Option<usize>,

    /// Alternate seat positions between games
    #[arg(long, default_value = "true")]
    alternate_seats: bool,

    /// Path to engine_settings.toml
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => load_settings(path).unwrap_or_else(|e| {
            eprintln!("Error loading settings: {}", e);
            std::process::exit(1);
        }),
        None => load_default_settings(),
    };

    let config = match cli.config.as_deref() {
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            eprintln!("Error parsing --config: {}", e);
            std::process::exit(1);
        }),
        None => serde_json::Value::Null,
    };

    let request = ArenaRequest {
        game_id: cli.game,
        strategies: cli.strategies,
        config,
        num_games: cli.games,
        base_seed: cli.seed,
        max_plies: cli.max_plies.unwrap_or(settings.arena.max_plies),
        alternate_seats: cli.alternate_seats,
    };

    eprintln!(
        "Arena: {} x {} games, strategies={}, seed={}, max_plies={}, alternate_seats={}",
        request.game_id,
        request.num_games,
        request.strategies.join(","),
        request.base_seed,
        request.max_plies,
        request.alternate_seats,
    );

    match run_named_arena(&request, &settings) {
        Ok(result) => println!("{}", result.summary()),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
