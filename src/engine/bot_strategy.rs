//! Bot strategy trait and implementations used by the arena.

use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::Rng;

use crate::engine::models::GamePhase;
use crate::engine::plugin::TypedGamePlugin;
use crate::engine::settings::ArenaSettings;
use crate::games::card_sorting::plugin::CardSortingPlugin;
use crate::games::card_sorting::types::{CardSortingMove, CardSortingState};
use crate::games::rithmomachia::harmony::{detect_harmony, MIN_HARMONY_PIECES};
use crate::games::rithmomachia::layout::in_enemy_half;
use crate::games::rithmomachia::plugin::{legal_moves, RithmomachiaPlugin};
use crate::games::rithmomachia::types::{Piece, RithmomachiaMove, RithmomachiaState};

/// A bot strategy picks the next move for the side to act.
/// `None` means it has nothing to play.
pub trait BotStrategy<P: TypedGamePlugin>: Send + Sync {
    fn choose_move(&self, plugin: &P, state: &P::State, rng: &mut StdRng) -> Option<P::Move>;
}

/// Uniformly random legal play.
#[derive(Debug, Clone, Copy)]
pub struct RandomStrategy {
    /// Card sorting: chance of submitting once the row is full.
    pub check_probability: f64,
}

impl Default for RandomStrategy {
    fn default() -> Self {
        Self {
            check_probability: 0.3,
        }
    }
}

impl BotStrategy<CardSortingPlugin> for RandomStrategy {
    fn choose_move(
        &self,
        _plugin: &CardSortingPlugin,
        state: &CardSortingState,
        rng: &mut StdRng,
    ) -> Option<CardSortingMove> {
        if state.game_phase != GamePhase::Playing {
            return None;
        }
        let slots = state.card_count as usize;
        let full = state.placed_count() == slots;
        if full && rng.gen_bool(self.check_probability.clamp(0.0, 1.0)) {
            return Some(CardSortingMove::CheckSolution {
                final_sequence: None,
            });
        }

        let occupied: Vec<usize> = state
            .placed_cards
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|_| i))
            .collect();
        let card = state.available_cards.choose(rng);
        match (rng.gen_range(0..3), card) {
            (0, Some(card)) => Some(CardSortingMove::PlaceCard {
                card_id: card.id.clone(),
                position: rng.gen_range(0..slots),
            }),
            (1, Some(card)) => Some(CardSortingMove::InsertCard {
                card_id: card.id.clone(),
                insert_position: rng.gen_range(0..=slots),
            }),
            _ => match occupied.choose(rng) {
                Some(&position) => Some(CardSortingMove::RemoveCard { position }),
                None => card.map(|c| CardSortingMove::PlaceCard {
                    card_id: c.id.clone(),
                    position: 0,
                }),
            },
        }
    }
}

impl BotStrategy<RithmomachiaPlugin> for RandomStrategy {
    fn choose_move(
        &self,
        _plugin: &RithmomachiaPlugin,
        state: &RithmomachiaState,
        rng: &mut StdRng,
    ) -> Option<RithmomachiaMove> {
        legal_moves(state).into_iter().choose(rng)
    }
}

/// Card sorting bot that reads the numbers and insertion-sorts the row.
/// Always scores 100; useful as an upper bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortingStrategy;

impl BotStrategy<CardSortingPlugin> for SortingStrategy {
    fn choose_move(
        &self,
        _plugin: &CardSortingPlugin,
        state: &CardSortingState,
        _rng: &mut StdRng,
    ) -> Option<CardSortingMove> {
        if state.game_phase != GamePhase::Playing {
            return None;
        }
        let Some(card) = state.available_cards.iter().min_by_key(|c| c.number) else {
            return Some(CardSortingMove::CheckSolution {
                final_sequence: None,
            });
        };
        let insert_position = state
            .placed_cards
            .iter()
            .flatten()
            .take_while(|placed| placed.number < card.number)
            .count();
        Some(CardSortingMove::InsertCard {
            card_id: card.id.clone(),
            insert_position,
        })
    }
}

/// Rithmomachia bot: declares a harmony when one is available, otherwise
/// takes the most valuable capture, otherwise moves at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyStrategy;

impl BotStrategy<RithmomachiaPlugin> for GreedyStrategy {
    fn choose_move(
        &self,
        _plugin: &RithmomachiaPlugin,
        state: &RithmomachiaState,
        rng: &mut StdRng,
    ) -> Option<RithmomachiaMove> {
        if state.game_phase != GamePhase::Playing {
            return None;
        }
        if let Some(harmony) = find_harmony(state) {
            return Some(harmony);
        }

        let moves = legal_moves(state);
        let capture_value = |m: &RithmomachiaMove| match m {
            RithmomachiaMove::Move {
                capture: Some(spec),
                ..
            } => state
                .pieces
                .get(&spec.target_piece_id)
                .map_or(0, |p| p.piece_type.point_value()),
            _ => 0,
        };
        let best = moves.iter().map(capture_value).max().unwrap_or(0);
        if best > 0 {
            return moves.into_iter().filter(|m| capture_value(m) == best).choose(rng);
        }
        moves.into_iter().choose(rng)
    }
}

/// Card sorting strategy by name: `random` or `sorter`.
pub fn card_sorting_strategy(
    name: &str,
    settings: &ArenaSettings,
) -> Option<Box<dyn BotStrategy<CardSortingPlugin>>> {
    match name {
        "random" => Some(Box::new(RandomStrategy {
            check_probability: settings.check_probability,
        })),
        "sorter" => Some(Box::new(SortingStrategy)),
        _ => None,
    }
}

/// Rithmomachia strategy by name: `random` or `greedy`.
pub fn rithmomachia_strategy(name: &str) -> Option<Box<dyn BotStrategy<RithmomachiaPlugin>>> {
    match name {
        "random" => Some(Box::new(RandomStrategy::default())),
        "greedy" => Some(Box::new(GreedyStrategy)),
        _ => None,
    }
}

// ── Private helpers ──

/// First three-piece harmony among own pieces in the enemy half.
fn find_harmony(state: &RithmomachiaState) -> Option<RithmomachiaMove> {
    let forward: Vec<&Piece> = state
        .live_pieces(state.turn)
        .filter(|p| in_enemy_half(p.color, p.square))
        .collect();
    if forward.len() < MIN_HARMONY_PIECES {
        return None;
    }
    for i in 0..forward.len() {
        for j in (i + 1)..forward.len() {
            for k in (j + 1)..forward.len() {
                let trio = [forward[i], forward[j], forward[k]];
                let values: Vec<u32> = trio.iter().map(|p| p.total_value()).collect();
                if let Some(harmony_type) = detect_harmony(&values) {
                    return Some(RithmomachiaMove::DeclareHarmony {
                        piece_ids: trio.iter().map(|p| p.id.clone()).collect(),
                        harmony_type,
                    });
                }
            }
        }
    }
    None
}
