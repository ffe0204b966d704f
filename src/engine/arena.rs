//! Bot-vs-bot arena runner.
//!
//! Plays many seeded games in parallel and aggregates outcomes. Every bot
//! move goes through the authoritative validator, so a run doubles as a
//! soak test: `rejected_moves` must stay at zero.

use std::collections::HashMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::de::DeserializeOwned;

use crate::engine::bot_strategy::{card_sorting_strategy, rithmomachia_strategy, BotStrategy};
use crate::engine::models::*;
use crate::engine::plugin::TypedGamePlugin;
use crate::engine::settings::EngineSettings;
use crate::games::card_sorting::generator::generate_cards;
use crate::games::card_sorting::plugin::CardSortingPlugin;
use crate::games::card_sorting::types::{CardSortingConfig, CardSortingMove, CardSortingState};
use crate::games::rithmomachia::plugin::RithmomachiaPlugin;
use crate::games::rithmomachia::types::{
    Color, RithmomachiaConfig, RithmomachiaMove, RithmomachiaState,
};

/// What the arena needs to know about a game beyond the plugin trait.
pub trait ArenaGame: TypedGamePlugin {
    fn seats(&self) -> usize;

    /// Move that takes a fresh setup state into play.
    fn start_move(&self, state: &Self::State, rng: &mut StdRng) -> Self::Move;

    fn seat_to_move(&self, state: &Self::State) -> usize;

    fn outcome(&self, state: &Self::State) -> GameOutcome;
}

/// Result of one finished game.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub winner: Option<usize>,
    pub draw: bool,
    pub condition: String,
    /// Score per seat.
    pub scores: Vec<f64>,
}

/// Aggregated results from an arena run.
#[derive(Debug, Default)]
pub struct ArenaResult {
    pub num_games: usize,
    pub wins: HashMap<String, usize>,
    pub draws: usize,
    pub unfinished: usize,
    pub rejected_moves: usize,
    pub end_conditions: HashMap<String, usize>,
    pub total_scores: HashMap<String, Vec<f64>>,
    pub plies: Vec<usize>,
    pub game_durations_ms: Vec<f64>,
}

impl ArenaResult {
    pub fn win_rate(&self, name: &str) -> f64 {
        *self.wins.get(name).unwrap_or(&0) as f64 / self.num_games.max(1) as f64
    }

    pub fn avg_score(&self, name: &str) -> f64 {
        match self.total_scores.get(name) {
            Some(s) if !s.is_empty() => s.iter().sum::<f64>() / s.len() as f64,
            _ => 0.0,
        }
    }

    pub fn score_stddev(&self, name: &str) -> f64 {
        let scores = match self.total_scores.get(name) {
            Some(s) if s.len() >= 2 => s,
            _ => return 0.0,
        };
        let avg = self.avg_score(name);
        let variance = scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / (scores.len() - 1) as f64;
        variance.sqrt()
    }

    /// Wilson score interval for the win rate.
    pub fn confidence_interval_95(&self, name: &str) -> (f64, f64) {
        let n = self.num_games;
        if n == 0 {
            return (0.0, 0.0);
        }
        let p = self.win_rate(name);
        let z = 1.96_f64;
        let denom = 1.0 + z * z / n as f64;
        let center = (p + z * z / (2.0 * n as f64)) / denom;
        let margin = z * ((p * (1.0 - p) + z * z / (4.0 * n as f64)) / n as f64).sqrt() / denom;
        ((center - margin).max(0.0), (center + margin).min(1.0))
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Arena Results ({} games)", self.num_games)];
        lines.push("=".repeat(60));
        let mut names: Vec<&String> = self.wins.keys().collect();
        names.sort();
        for name in names {
            let (ci_lo, ci_hi) = self.confidence_interval_95(name);
            lines.push(format!(
                "  {:>12}: {:3} wins ({:5.1}%)  [95% CI: {:.1}%-{:.1}%]  avg={:5.1} +/- {:4.1}",
                name,
                self.wins[name],
                self.win_rate(name) * 100.0,
                ci_lo * 100.0,
                ci_hi * 100.0,
                self.avg_score(name),
                self.score_stddev(name),
            ));
        }
        lines.push(format!("  {:>12}: {}", "Draws", self.draws));
        lines.push(format!("  {:>12}: {}", "Unfinished", self.unfinished));
        lines.push(format!("  {:>12}: {}", "Rejected", self.rejected_moves));
        let mut conditions: Vec<(&String, &usize)> = self.end_conditions.iter().collect();
        conditions.sort();
        for (condition, count) in conditions {
            lines.push(format!("  {:>12}: {}", condition, count));
        }
        if !self.plies.is_empty() {
            let avg = self.plies.iter().sum::<usize>() as f64 / self.plies.len() as f64;
            lines.push(format!("  Avg length: {:.1} moves", avg));
        }
        if !self.game_durations_ms.is_empty() {
            let avg_ms = self.game_durations_ms.iter().sum::<f64>() / self.game_durations_ms.len() as f64;
            let total_s = self.game_durations_ms.iter().sum::<f64>() / 1000.0;
            lines.push(format!("  Avg game: {:.1}ms  |  Total: {:.1}s", avg_ms, total_s));
        }
        lines.join("\n")
    }
}

/// One game's raw record before aggregation.
struct GameRecord {
    seat_names: Vec<String>,
    outcome: Option<GameOutcome>,
    plies: usize,
    rejected: bool,
    elapsed_ms: f64,
}

/// Run `num_games` between the given strategies and return aggregated stats.
///
/// `strategies` lists (name, strategy) in seat order; with `alternate_seats`
/// the assignment rotates by one seat per game. Game `i` is seeded with
/// `base_seed + i`, so results do not depend on thread scheduling.
pub fn run_arena<P: ArenaGame>(
    plugin: &P,
    strategies: &[(String, Box<dyn BotStrategy<P>>)],
    config: &P::Config,
    num_games: usize,
    base_seed: u64,
    max_plies: usize,
    alternate_seats: bool,
) -> ArenaResult
where
    P::Config: Sync,
{
    let seats = plugin.seats();
    assert!(
        strategies.len() >= seats,
        "{} needs {} strategies, got {}",
        plugin.game_id(),
        seats,
        strategies.len()
    );

    let records: Vec<GameRecord> = (0..num_games)
        .into_par_iter()
        .map(|game_idx| {
            let order: Vec<usize> = (0..seats)
                .map(|seat| {
                    if alternate_seats {
                        (seat + game_idx) % strategies.len()
                    } else {
                        seat
                    }
                })
                .collect();
            let lineup: Vec<&dyn BotStrategy<P>> =
                order.iter().map(|&i| strategies[i].1.as_ref()).collect();
            let t0 = Instant::now();
            let (outcome, plies, rejected) = play_one_game(
                plugin,
                &lineup,
                config,
                base_seed + game_idx as u64,
                max_plies,
            );
            GameRecord {
                seat_names: order.iter().map(|&i| strategies[i].0.clone()).collect(),
                outcome,
                plies,
                rejected,
                elapsed_ms: t0.elapsed().as_secs_f64() * 1000.0,
            }
        })
        .collect();

    let mut result = ArenaResult {
        num_games,
        wins: strategies.iter().map(|(n, _)| (n.clone(), 0)).collect(),
        total_scores: strategies.iter().map(|(n, _)| (n.clone(), Vec::new())).collect(),
        ..Default::default()
    };
    for record in records {
        result.plies.push(record.plies);
        result.game_durations_ms.push(record.elapsed_ms);
        if record.rejected {
            result.rejected_moves += 1;
        }
        let Some(outcome) = record.outcome else {
            result.unfinished += 1;
            continue;
        };
        *result.end_conditions.entry(outcome.condition.clone()).or_insert(0) += 1;
        for (seat, score) in outcome.scores.iter().enumerate() {
            if let Some(name) = record.seat_names.get(seat) {
                result.total_scores.entry(name.clone()).or_default().push(*score);
            }
        }
        match outcome.winner.and_then(|seat| record.seat_names.get(seat)) {
            Some(name) => *result.wins.entry(name.clone()).or_insert(0) += 1,
            None if outcome.draw => result.draws += 1,
            None => {}
        }
    }

    tracing::info!(
        game_id = plugin.game_id(),
        games = num_games,
        draws = result.draws,
        unfinished = result.unfinished,
        rejected = result.rejected_moves,
        "arena run complete"
    );
    result
}

/// An arena run described by strategy names, as the CLI and the gRPC
/// service receive it.
#[derive(Debug, Clone)]
pub struct ArenaRequest {
    pub game_id: String,
    pub strategies: Vec<String>,
    /// Game options; `null` means defaults.
    pub config: serde_json::Value,
    pub num_games: usize,
    pub base_seed: u64,
    pub max_plies: usize,
    pub alternate_seats: bool,
}

/// Resolve strategy names for the requested game and run the arena.
pub fn run_named_arena(req: &ArenaRequest, settings: &EngineSettings) -> Result<ArenaResult, String> {
    match req.game_id.as_str() {
        "card-sorting" => {
            let plugin = CardSortingPlugin::with_weights(settings.card_sorting.weights);
            let lineup = build_lineup(&plugin, &req.strategies, |name| {
                card_sorting_strategy(name, &settings.arena)
            })?;
            let config: CardSortingConfig = decode_config(&req.config)?;
            plugin.check_config(&config).map_err(|e| e.to_string())?;
            Ok(run_request(&plugin, &lineup, &config, req))
        }
        "rithmomachia" => {
            let plugin = RithmomachiaPlugin::new();
            let lineup = build_lineup(&plugin, &req.strategies, rithmomachia_strategy)?;
            let config: RithmomachiaConfig = decode_config(&req.config)?;
            plugin.check_config(&config).map_err(|e| e.to_string())?;
            Ok(run_request(&plugin, &lineup, &config, req))
        }
        other => Err(format!("Arena not available for game: {}", other)),
    }
}

fn run_request<P: ArenaGame>(
    plugin: &P,
    lineup: &[(String, Box<dyn BotStrategy<P>>)],
    config: &P::Config,
    req: &ArenaRequest,
) -> ArenaResult
where
    P::Config: Sync,
{
    run_arena(
        plugin,
        lineup,
        config,
        req.num_games,
        req.base_seed,
        req.max_plies,
        req.alternate_seats,
    )
}

/// Build (label, strategy) pairs. Repeated names get a `#n` suffix so each
/// seat keeps its own tally.
fn build_lineup<P: ArenaGame>(
    plugin: &P,
    names: &[String],
    build: impl Fn(&str) -> Option<Box<dyn BotStrategy<P>>>,
) -> Result<Vec<(String, Box<dyn BotStrategy<P>>)>, String> {
    if names.len() < plugin.seats() {
        return Err(format!(
            "{} needs {} strategies, got {}",
            plugin.game_id(),
            plugin.seats(),
            names.len()
        ));
    }
    let mut seen: HashMap<&str, usize> = HashMap::new();
    names
        .iter()
        .map(|name| {
            let strategy = build(name).ok_or_else(|| {
                format!("Unknown strategy '{}' for {}", name, plugin.game_id())
            })?;
            let n = seen.entry(name.as_str()).or_insert(0);
            *n += 1;
            let label = if *n == 1 {
                name.clone()
            } else {
                format!("{}#{}", name, n)
            };
            Ok((label, strategy))
        })
        .collect()
}

fn decode_config<C: Default + DeserializeOwned>(value: &serde_json::Value) -> Result<C, String> {
    if value.is_null() {
        return Ok(C::default());
    }
    serde_json::from_value(value.clone()).map_err(|e| format!("invalid game config: {}", e))
}

/// Play one seeded game. Returns the outcome (None if it did not finish),
/// the number of moves played and whether a bot move was rejected.
fn play_one_game<P: ArenaGame>(
    plugin: &P,
    lineup: &[&dyn BotStrategy<P>],
    config: &P::Config,
    seed: u64,
    max_plies: usize,
) -> (Option<GameOutcome>, usize, bool) {
    let mut rng = StdRng::seed_from_u64(seed);
    let setup = plugin.get_initial_state(config);
    let start = GameMove::new("arena", 0, plugin.start_move(&setup, &mut rng));
    let mut state = match plugin.validate_move(&setup, &start, &MoveContext::default()) {
        ValidationResult::Valid { new_state } => new_state,
        ValidationResult::Invalid { error } => {
            tracing::warn!(seed, %error, "start move rejected");
            return (None, 0, true);
        }
    };

    for ply in 0..max_plies {
        if plugin.is_game_complete(&state) {
            return (Some(plugin.outcome(&state)), ply, false);
        }
        let seat = plugin.seat_to_move(&state);
        let Some(kind) = lineup[seat].choose_move(plugin, &state, &mut rng) else {
            return (None, ply, false);
        };
        let game_move = GameMove::new(format!("seat-{}", seat), ply as i64, kind);
        match plugin.validate_move(&state, &game_move, &MoveContext::for_seat(seat)) {
            ValidationResult::Valid { new_state } => state = new_state,
            ValidationResult::Invalid { error } => {
                tracing::warn!(seed, ply, seat, %error, "bot move rejected");
                return (None, ply, true);
            }
        }
    }
    if plugin.is_game_complete(&state) {
        return (Some(plugin.outcome(&state)), max_plies, false);
    }
    (None, max_plies, false)
}

impl ArenaGame for CardSortingPlugin {
    fn seats(&self) -> usize {
        1
    }

    fn start_move(&self, state: &CardSortingState, rng: &mut StdRng) -> CardSortingMove {
        use rand::Rng;
        CardSortingMove::StartGame {
            player_metadata: serde_json::Value::Null,
            selected_cards: generate_cards(state.card_count as usize, rng.gen()),
        }
    }

    fn seat_to_move(&self, _state: &CardSortingState) -> usize {
        0
    }

    fn outcome(&self, state: &CardSortingState) -> GameOutcome {
        let score = state.score_breakdown.as_ref().map_or(0, |s| s.final_score);
        GameOutcome {
            winner: (score == 100).then_some(0),
            draw: false,
            condition: if score == 100 { "PERFECT" } else { "SCORED" }.to_string(),
            scores: vec![score as f64],
        }
    }
}

impl ArenaGame for RithmomachiaPlugin {
    fn seats(&self) -> usize {
        2
    }

    fn start_move(&self, _state: &RithmomachiaState, _rng: &mut StdRng) -> RithmomachiaMove {
        RithmomachiaMove::StartGame
    }

    fn seat_to_move(&self, state: &RithmomachiaState) -> usize {
        state.turn.seat()
    }

    fn outcome(&self, state: &RithmomachiaState) -> GameOutcome {
        let condition = state
            .win_condition
            .and_then(|c| serde_json::to_value(c).ok())
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        GameOutcome {
            winner: state.winner.map(Color::seat),
            draw: state.winner.is_none(),
            condition,
            scores: vec![state.points(Color::W) as f64, state.points(Color::B) as f64],
        }
    }
}
