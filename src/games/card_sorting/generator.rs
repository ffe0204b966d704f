//! Seeded card generator. Produces the `selectedCards` payload for START_GAME.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::types::SortingCard;

pub const MIN_CARD_NUMBER: u32 = 1;
pub const MAX_CARD_NUMBER: u32 = 99;

/// Draw `count` cards with distinct numbers, in deal order (unsorted).
///
/// `count` is capped at the size of the number range.
pub fn generate_cards(count: usize, seed: u64) -> Vec<SortingCard> {
    let mut rng = StdRng::seed_from_u64(seed);
    let numbers: Vec<u32> = (MIN_CARD_NUMBER..=MAX_CARD_NUMBER).collect();
    numbers
        .choose_multiple(&mut rng, count)
        .enumerate()
        .map(|(i, &number)| SortingCard {
            id: format!("card-{}-{}", seed, i),
            number,
        })
        .collect()
}

/// Cards sorted ascending by number, the answer key.
pub fn sorted_by_number(cards: &[SortingCard]) -> Vec<SortingCard> {
    let mut sorted = cards.to_vec();
    sorted.sort_by_key(|c| c.number);
    sorted
}
