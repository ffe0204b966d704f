//! CardSortingPlugin: implements TypedGamePlugin trait.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::engine::error::MoveError;
use crate::engine::models::*;
use crate::engine::plugin::TypedGamePlugin;

use super::generator::sorted_by_number;
use super::scoring::{calculate_score, ScoringWeights};
use super::slots::{insert_card, place_card, remove_card};
use super::types::*;

#[derive(Debug, Clone, Default)]
pub struct CardSortingPlugin {
    pub weights: ScoringWeights,
}

impl CardSortingPlugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }
}

impl TypedGamePlugin for CardSortingPlugin {
    type State = CardSortingState;
    type Move = CardSortingMove;
    type Config = CardSortingConfig;

    fn game_id(&self) -> &str {
        "card-sorting"
    }
    fn display_name(&self) -> &str {
        "Card Sorting Challenge"
    }
    fn description(&self) -> &str {
        "Arrange abacus cards in ascending order using only visual patterns. \
         Scored on relative order, exact positions and inversions."
    }
    fn min_players(&self) -> u32 {
        1
    }
    fn max_players(&self) -> u32 {
        4
    }

    fn check_config(&self, config: &CardSortingConfig) -> Result<(), MoveError> {
        parse_config_change(ConfigField::CardCount, &serde_json::json!(config.card_count))?;
        parse_config_change(ConfigField::TimeLimit, &serde_json::json!(config.time_limit))?;
        Ok(())
    }

    fn get_initial_state(&self, config: &CardSortingConfig) -> CardSortingState {
        CardSortingState::with_config(config)
    }

    fn check_move(
        &self,
        state: &CardSortingState,
        game_move: &CardSortingGameMove,
        _ctx: &MoveContext,
    ) -> Result<(), MoveError> {
        let name = game_move.kind.name();
        match &game_move.kind {
            CardSortingMove::StartGame { selected_cards, .. } => {
                require_phase(state, GamePhase::Setup, name)?;
                self.check_start(state, selected_cards)
            }
            CardSortingMove::PlaceCard { card_id, position } => {
                require_phase(state, GamePhase::Playing, name)?;
                find_available(state, card_id)?;
                if *position >= state.card_count as usize {
                    return Err(MoveError::precondition(format!(
                        "Invalid position {}: must be between 0 and {}",
                        position,
                        state.card_count as usize - 1
                    )));
                }
                Ok(())
            }
            CardSortingMove::InsertCard { card_id, insert_position } => {
                require_phase(state, GamePhase::Playing, name)?;
                find_available(state, card_id)?;
                if *insert_position > state.card_count as usize {
                    return Err(MoveError::precondition(format!(
                        "Invalid insert position {}: must be between 0 and {}",
                        insert_position, state.card_count
                    )));
                }
                Ok(())
            }
            CardSortingMove::RemoveCard { position } => {
                require_phase(state, GamePhase::Playing, name)?;
                match state.placed_cards.get(*position) {
                    None => Err(MoveError::precondition(format!("Invalid position {}", position))),
                    Some(None) => Err(MoveError::precondition(format!(
                        "No card at position {}",
                        position
                    ))),
                    Some(Some(_)) => Ok(()),
                }
            }
            CardSortingMove::RevealNumbers => {
                require_phase(state, GamePhase::Playing, name)?;
                if !state.show_numbers {
                    return Err(MoveError::invalid_state("Reveal numbers is not enabled"));
                }
                if state.numbers_revealed {
                    return Err(MoveError::invalid_state("Numbers already revealed"));
                }
                Ok(())
            }
            CardSortingMove::UpdateCardPositions { positions } => {
                require_phase(state, GamePhase::Playing, name)?;
                self.check_positions(state, positions)
            }
            CardSortingMove::CheckSolution { final_sequence } => {
                require_phase(state, GamePhase::Playing, name)?;
                match final_sequence {
                    Some(ids) => check_permutation(state, ids),
                    None if state.placed_count() < state.card_count as usize => {
                        Err(MoveError::invalid_state("Must place all cards before checking"))
                    }
                    None => Ok(()),
                }
            }
            CardSortingMove::GoToSetup => Ok(()),
            CardSortingMove::SetConfig { field, value } => {
                require_phase(state, GamePhase::Setup, name)?;
                parse_config_change(*field, value).map(|_| ())
            }
            CardSortingMove::ResumeGame => {
                require_phase(state, GamePhase::Setup, name)?;
                if state.paused_game_state.is_none() {
                    return Err(MoveError::invalid_state("No paused game to resume"));
                }
                if !can_resume_game(state) {
                    return Err(MoveError::invalid_state(
                        "Cannot resume: configuration changed since the game was paused",
                    ));
                }
                Ok(())
            }
            CardSortingMove::Unknown => Err(MoveError::UnknownMove),
        }
    }

    fn apply_move(&self, state: &CardSortingState, game_move: &CardSortingGameMove) -> CardSortingState {
        match &game_move.kind {
            CardSortingMove::StartGame {
                player_metadata,
                selected_cards,
            } => apply_start(state, game_move, player_metadata, selected_cards),
            CardSortingMove::PlaceCard { card_id, position } => apply_place(state, card_id, *position),
            CardSortingMove::InsertCard { card_id, insert_position } => {
                apply_insert(state, card_id, *insert_position)
            }
            CardSortingMove::RemoveCard { position } => apply_remove(state, *position),
            CardSortingMove::RevealNumbers => {
                let mut s = state.clone();
                if s.game_phase == GamePhase::Playing && s.show_numbers {
                    s.numbers_revealed = true;
                }
                s
            }
            CardSortingMove::UpdateCardPositions { positions } => {
                let mut s = state.clone();
                if s.game_phase == GamePhase::Playing {
                    s.card_positions = positions.clone();
                }
                s
            }
            CardSortingMove::CheckSolution { final_sequence } => {
                self.apply_check_solution(state, game_move.timestamp, final_sequence.as_deref())
            }
            CardSortingMove::GoToSetup => apply_go_to_setup(state),
            CardSortingMove::SetConfig { field, value } => match parse_config_change(*field, value) {
                Ok(change) => apply_config_change(state, change),
                Err(_) => state.clone(),
            },
            CardSortingMove::ResumeGame => apply_resume(state),
            CardSortingMove::Unknown => state.clone(),
        }
    }

    fn is_game_complete(&self, state: &CardSortingState) -> bool {
        state.game_phase == GamePhase::Results
    }

    fn is_predictable(&self, game_move: &CardSortingMove) -> bool {
        !matches!(game_move, CardSortingMove::CheckSolution { .. })
    }
}

/// A paused game can be resumed only while the config it was started with is
/// still current.
pub fn can_resume_game(state: &CardSortingState) -> bool {
    state.paused_game_state.is_some()
        && state
            .original_config
            .as_ref()
            .map_or(true, |original| *original == state.config())
}

/// Slot order implied by free-drag positions: left to right, ties top to bottom.
pub fn infer_sequence_from_positions(positions: &[CardPosition]) -> Vec<String> {
    let mut ordered: Vec<&CardPosition> = positions.iter().collect();
    ordered.sort_by(|a, b| match a.x.total_cmp(&b.x) {
        Ordering::Equal => a.y.total_cmp(&b.y),
        other => other,
    });
    ordered.into_iter().map(|p| p.card_id.clone()).collect()
}

/// Validate a SET_CONFIG value against its field's constraints.
pub fn parse_config_change(
    field: ConfigField,
    value: &serde_json::Value,
) -> Result<ConfigChange, MoveError> {
    match field {
        ConfigField::CardCount => value
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .filter(|n| VALID_CARD_COUNTS.contains(n))
            .map(ConfigChange::CardCount)
            .ok_or_else(|| MoveError::config("cardCount must be one of 5, 8, 12, 15")),
        ConfigField::ShowNumbers => value
            .as_bool()
            .map(ConfigChange::ShowNumbers)
            .ok_or_else(|| MoveError::config("showNumbers must be a boolean")),
        ConfigField::TimeLimit => {
            if value.is_null() {
                return Ok(ConfigChange::TimeLimit(None));
            }
            value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n >= MIN_TIME_LIMIT_SECS)
                .map(|n| ConfigChange::TimeLimit(Some(n)))
                .ok_or_else(|| {
                    MoveError::config(format!(
                        "timeLimit must be null or at least {} seconds",
                        MIN_TIME_LIMIT_SECS
                    ))
                })
        }
        ConfigField::GameMode => serde_json::from_value::<GameMode>(value.clone())
            .map(ConfigChange::GameMode)
            .map_err(|_| {
                MoveError::config("gameMode must be one of solo, collaborative, competitive, relay")
            }),
    }
}

// ── Private helpers ──

fn require_phase(
    state: &CardSortingState,
    phase: GamePhase,
    move_type: &'static str,
) -> Result<(), MoveError> {
    if state.game_phase != phase {
        return Err(MoveError::WrongPhase {
            move_type,
            phase: state.game_phase,
        });
    }
    Ok(())
}

fn find_available<'a>(state: &'a CardSortingState, card_id: &str) -> Result<&'a SortingCard, MoveError> {
    state
        .available_cards
        .iter()
        .find(|c| c.id == card_id)
        .ok_or_else(|| MoveError::precondition(format!("Card not found in available cards: {}", card_id)))
}

fn check_permutation(state: &CardSortingState, ids: &[String]) -> Result<(), MoveError> {
    if ids.len() != state.card_count as usize {
        return Err(MoveError::precondition(format!(
            "Final sequence has {} cards, expected {}",
            ids.len(),
            state.card_count
        )));
    }
    let selected: HashSet<&str> = state.selected_cards.iter().map(|c| c.id.as_str()).collect();
    let mut seen = HashSet::new();
    for id in ids {
        if !selected.contains(id.as_str()) {
            return Err(MoveError::precondition(format!("Unknown card in final sequence: {}", id)));
        }
        if !seen.insert(id.as_str()) {
            return Err(MoveError::precondition(format!("Duplicate card in final sequence: {}", id)));
        }
    }
    Ok(())
}

impl CardSortingPlugin {
    fn check_start(&self, state: &CardSortingState, selected: &[SortingCard]) -> Result<(), MoveError> {
        if selected.len() != state.card_count as usize {
            return Err(MoveError::precondition(format!(
                "Must provide exactly {} cards, got {}",
                state.card_count,
                selected.len()
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = selected.iter().find(|c| !seen.insert(c.id.as_str())) {
            return Err(MoveError::precondition(format!("Duplicate card id: {}", dup.id)));
        }
        Ok(())
    }

    fn check_positions(&self, state: &CardSortingState, positions: &[CardPosition]) -> Result<(), MoveError> {
        for p in positions {
            if !state.selected_cards.iter().any(|c| c.id == p.card_id) {
                return Err(MoveError::precondition(format!("Unknown card: {}", p.card_id)));
            }
            if !(p.x.is_finite() && p.y.is_finite() && p.rotation.is_finite()) {
                return Err(MoveError::precondition(format!(
                    "Position for {} is not a finite number",
                    p.card_id
                )));
            }
        }
        Ok(())
    }

    fn apply_check_solution(
        &self,
        state: &CardSortingState,
        now_ms: i64,
        final_sequence: Option<&[String]>,
    ) -> CardSortingState {
        if state.game_phase != GamePhase::Playing {
            return state.clone();
        }

        let ordered: Vec<SortingCard> = match final_sequence {
            Some(ids) => ids
                .iter()
                .filter_map(|id| state.selected_cards.iter().find(|c| &c.id == id).cloned())
                .collect(),
            None => state.placed_cards.iter().flatten().cloned().collect(),
        };
        if ordered.len() != state.correct_order.len() {
            return state.clone();
        }

        let user: Vec<u32> = ordered.iter().map(|c| c.number).collect();
        let correct: Vec<u32> = state.correct_order.iter().map(|c| c.number).collect();
        let start = state.game_start_time.unwrap_or(now_ms);

        let mut s = state.clone();
        s.score_breakdown = Some(calculate_score(&user, &correct, start, now_ms, &self.weights));
        if final_sequence.is_some() {
            s.placed_cards = ordered.into_iter().map(Some).collect();
            s.available_cards.clear();
        }
        s.game_phase = GamePhase::Results;
        s.game_end_time = Some(now_ms);
        s
    }
}

fn apply_start(
    state: &CardSortingState,
    game_move: &CardSortingGameMove,
    player_metadata: &serde_json::Value,
    selected: &[SortingCard],
) -> CardSortingState {
    let mut s = CardSortingState::with_config(&state.config());
    s.game_phase = GamePhase::Playing;
    s.player_id = game_move.player_id.clone();
    s.player_metadata = player_metadata.clone();
    s.game_start_time = Some(game_move.timestamp);
    s.selected_cards = selected.to_vec();
    s.correct_order = sorted_by_number(selected);
    s.available_cards = selected.to_vec();
    s
}

fn take_available(s: &mut CardSortingState, card_id: &str) -> Option<SortingCard> {
    let idx = s.available_cards.iter().position(|c| c.id == card_id)?;
    Some(s.available_cards.remove(idx))
}

fn apply_place(state: &CardSortingState, card_id: &str, position: usize) -> CardSortingState {
    if state.game_phase != GamePhase::Playing || position >= state.placed_cards.len() {
        return state.clone();
    }
    let mut s = state.clone();
    let Some(card) = take_available(&mut s, card_id) else {
        return state.clone();
    };
    let (row, displaced) = place_card(&s.placed_cards, card, position);
    s.placed_cards = row;
    s.available_cards.extend(displaced);
    s
}

fn apply_insert(state: &CardSortingState, card_id: &str, insert_position: usize) -> CardSortingState {
    if state.game_phase != GamePhase::Playing || insert_position > state.card_count as usize {
        return state.clone();
    }
    let mut s = state.clone();
    let Some(card) = take_available(&mut s, card_id) else {
        return state.clone();
    };
    let (row, excess) = insert_card(&s.placed_cards, card, insert_position, s.card_count as usize);
    s.placed_cards = row;
    s.available_cards.extend(excess);
    s
}

fn apply_remove(state: &CardSortingState, position: usize) -> CardSortingState {
    if state.game_phase != GamePhase::Playing {
        return state.clone();
    }
    let (row, removed) = remove_card(&state.placed_cards, position);
    let Some(card) = removed else {
        return state.clone();
    };
    let mut s = state.clone();
    s.placed_cards = row;
    s.available_cards.push(card);
    s
}

fn apply_go_to_setup(state: &CardSortingState) -> CardSortingState {
    let config = state.config();
    match state.game_phase {
        GamePhase::Setup => state.clone(),
        GamePhase::Playing => {
            let mut s = CardSortingState::with_config(&config);
            s.player_id = state.player_id.clone();
            s.player_metadata = state.player_metadata.clone();
            s.original_config = Some(config);
            s.paused_game_phase = Some(GamePhase::Playing);
            s.paused_game_state = Some(PausedGame {
                selected_cards: state.selected_cards.clone(),
                correct_order: state.correct_order.clone(),
                available_cards: state.available_cards.clone(),
                placed_cards: state.placed_cards.clone(),
                card_positions: state.card_positions.clone(),
                numbers_revealed: state.numbers_revealed,
                game_start_time: state.game_start_time,
            });
            s
        }
        GamePhase::Results => {
            let mut s = CardSortingState::with_config(&config);
            s.player_id = state.player_id.clone();
            s.player_metadata = state.player_metadata.clone();
            s
        }
    }
}

fn apply_config_change(state: &CardSortingState, change: ConfigChange) -> CardSortingState {
    if state.game_phase != GamePhase::Setup {
        return state.clone();
    }
    let before = state.config();
    let mut config = before.clone();
    match change {
        ConfigChange::CardCount(n) => config.card_count = n,
        ConfigChange::ShowNumbers(b) => config.show_numbers = b,
        ConfigChange::TimeLimit(t) => config.time_limit = t,
        ConfigChange::GameMode(m) => config.game_mode = m,
    }
    if config == before {
        return state.clone();
    }

    let mut s = state.clone();
    s.apply_config(&config);
    if config.card_count != before.card_count {
        s.placed_cards = vec![None; config.card_count as usize];
    }
    s.original_config = None;
    s.paused_game_phase = None;
    s.paused_game_state = None;
    s
}

fn apply_resume(state: &CardSortingState) -> CardSortingState {
    if state.game_phase != GamePhase::Setup || !can_resume_game(state) {
        return state.clone();
    }
    let Some(paused) = state.paused_game_state.clone() else {
        return state.clone();
    };
    let mut s = state.clone();
    s.game_phase = state.paused_game_phase.unwrap_or(GamePhase::Playing);
    s.selected_cards = paused.selected_cards;
    s.correct_order = paused.correct_order;
    s.available_cards = paused.available_cards;
    s.placed_cards = paused.placed_cards;
    s.card_positions = paused.card_positions;
    s.numbers_revealed = paused.numbers_revealed;
    s.game_start_time = paused.game_start_time;
    s.game_end_time = None;
    s.score_breakdown = None;
    s.original_config = None;
    s.paused_game_phase = None;
    s.paused_game_state = None;
    s
}
