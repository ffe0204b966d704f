//! Whole Rithmomachia games played through the JSON registry with seat
//! contexts, checking board invariants after every ply.
//!
//! Run with:
//!     cargo test --test rithmomachia_games

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::IteratorRandom;
use rand::SeedableRng;
use serde_json::{json, Value};

use arcade_game_engine::engine::arena::{run_named_arena, ArenaRequest};
use arcade_game_engine::engine::models::{GameConfig, GameMove, GamePhase, MoveContext};
use arcade_game_engine::engine::plugin::GamePlugin;
use arcade_game_engine::engine::settings::EngineSettings;
use arcade_game_engine::games::rithmomachia::plugin::legal_moves;
use arcade_game_engine::games::rithmomachia::types::{
    RithmomachiaState, WinCondition,
};
use arcade_game_engine::games::GameRegistry;

fn plugin(registry: &GameRegistry) -> &dyn GamePlugin {
    registry.get("rithmomachia").unwrap()
}

fn decode(state: &Value) -> RithmomachiaState {
    serde_json::from_value(state.clone()).unwrap()
}

fn seat_ctx(state: &RithmomachiaState) -> MoveContext {
    MoveContext {
        user_id: Some(format!("u{}", state.turn.seat())),
        seat: Some(state.turn.seat()),
    }
}

fn started(registry: &GameRegistry, options: Value) -> Value {
    let plugin = plugin(registry);
    let setup = plugin
        .get_initial_state(&GameConfig::from_options(options))
        .unwrap();
    plugin
        .validate_move(
            &setup,
            &json!({"type": "START_GAME", "playerId": "p0"}),
            &MoveContext::for_seat(0),
        )
        .into_result()
        .unwrap()
}

fn assert_board_consistent(state: &RithmomachiaState, piece_count: usize) {
    assert_eq!(state.pieces.len(), piece_count);
    let mut squares = HashSet::new();
    for piece in state.pieces.values().filter(|p| !p.captured) {
        assert!(
            squares.insert(piece.square),
            "two live pieces on {}",
            piece.square
        );
    }
}

#[test]
fn random_playouts_keep_invariants() {
    let registry = GameRegistry::default();
    let plugin = plugin(&registry);

    for seed in 0..4u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut state_json = started(&registry, json!({}));
        let piece_count = decode(&state_json).pieces.len();

        for _ in 0..300 {
            let state = decode(&state_json);
            if state.game_phase != GamePhase::Playing {
                break;
            }
            let Some(kind) = legal_moves(&state).into_iter().choose(&mut rng) else {
                break;
            };
            let game_move =
                serde_json::to_value(GameMove::new(format!("p{}", state.turn.seat()), 0, kind))
                    .unwrap();

            let predicted = plugin.predict_move(&state_json, &game_move);
            let next = plugin
                .validate_move(&state_json, &game_move, &seat_ctx(&state))
                .into_result()
                .unwrap_or_else(|e| panic!("seed {}: legal move rejected: {}", seed, e));
            assert_eq!(predicted, next, "seed {}: prediction diverged", seed);

            let after = decode(&next);
            assert_board_consistent(&after, piece_count);
            assert_eq!(after.ply, state.ply + 1);
            state_json = next;
        }

        let finished = decode(&state_json);
        if finished.game_phase == GamePhase::Results {
            assert!(plugin.is_game_complete(&state_json).unwrap());
            let decisive = matches!(
                finished.win_condition,
                Some(WinCondition::Harmony | WinCondition::Exhaustion | WinCondition::Points)
            );
            assert_eq!(finished.winner.is_some(), decisive, "seed {}", seed);
        }
    }
}

#[test]
fn out_of_turn_move_rejected_over_json() {
    let registry = GameRegistry::default();
    let plugin = plugin(&registry);
    let state_json = started(&registry, json!({}));
    let state = decode(&state_json);
    let kind = legal_moves(&state).into_iter().next().unwrap();
    let game_move = serde_json::to_value(GameMove::new("p1", 0, kind)).unwrap();

    let err = plugin
        .validate_move(&state_json, &game_move, &MoveContext::for_seat(1))
        .error()
        .map(str::to_string)
        .unwrap();
    assert_eq!(err, "Not your turn");
}

#[test]
fn draw_by_agreement_over_json() {
    let registry = GameRegistry::default();
    let plugin = plugin(&registry);
    let mut state_json = started(&registry, json!({}));

    let send = |state_json: &Value, body: Value| -> Value {
        let ctx = seat_ctx(&decode(state_json));
        plugin
            .validate_move(state_json, &body, &ctx)
            .into_result()
            .unwrap()
    };

    state_json = send(&state_json, json!({"type": "OFFER_DRAW", "playerId": "p0"}));
    let white_move = legal_moves(&decode(&state_json)).into_iter().next().unwrap();
    state_json = send(
        &state_json,
        serde_json::to_value(GameMove::new("p0", 0, white_move)).unwrap(),
    );
    state_json = send(&state_json, json!({"type": "ACCEPT_DRAW", "playerId": "p1"}));

    let finished = decode(&state_json);
    assert_eq!(finished.game_phase, GamePhase::Results);
    assert_eq!(finished.winner, None);
    assert_eq!(finished.win_condition, Some(WinCondition::Agreement));
}

#[test]
fn config_options_reach_the_game() {
    let registry = GameRegistry::default();
    let state = decode(&started(
        &registry,
        json!({"pointWinEnabled": true, "pointWinThreshold": 12}),
    ));
    assert!(state.config.point_win_enabled);
    assert_eq!(state.config.point_win_threshold, 12);

    let err = plugin(&registry)
        .get_initial_state(&GameConfig::from_options(json!({"pointWinThreshold": "lots"})))
        .unwrap_err();
    assert!(err.to_string().starts_with("invalid config"));

    let state = decode(&started(
        &registry,
        json!({"repetitionCount": 5, "fiftyMoveLimit": 30}),
    ));
    assert_eq!(state.config.repetition_count, 5);
    assert_eq!(state.config.fifty_move_limit, 30);
    for options in [json!({"repetitionCount": 0}), json!({"fiftyMoveLimit": 3_000_000_000u64})] {
        let err = plugin(&registry)
            .get_initial_state(&GameConfig::from_options(options))
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid config"), "{}", err);
    }
}

#[test]
fn arena_runs_are_reproducible() {
    let request = ArenaRequest {
        game_id: "rithmomachia".into(),
        strategies: vec!["greedy".into(), "random".into()],
        config: Value::Null,
        num_games: 4,
        base_seed: 7,
        max_plies: 120,
        alternate_seats: true,
    };
    let settings = EngineSettings::default();
    let a = run_named_arena(&request, &settings).unwrap();
    let b = run_named_arena(&request, &settings).unwrap();

    assert_eq!(a.wins, b.wins);
    assert_eq!(a.plies, b.plies);
    assert_eq!(a.end_conditions, b.end_conditions);
    assert_eq!(a.rejected_moves, 0);
    let finished: usize = a.end_conditions.values().sum();
    assert_eq!(finished + a.unfinished, 4);
}
