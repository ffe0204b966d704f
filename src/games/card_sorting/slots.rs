//! Editing the fixed-length slot row.
//!
//! `place_card` overwrites a slot and may leave gaps. `insert_card` and
//! `remove_card` always re-pack the row from slot 0 so no gap sits between
//! two cards. All three return a row of the same length they were given.

/// Squeeze out empty slots and pad back to `total_slots`. Cards beyond
/// `total_slots` are returned as overflow.
pub fn compact<T: Clone>(cards: &[Option<T>], total_slots: usize) -> (Vec<Option<T>>, Vec<T>) {
    let mut packed: Vec<T> = cards.iter().flatten().cloned().collect();
    let overflow = if packed.len() > total_slots {
        packed.split_off(total_slots)
    } else {
        Vec::new()
    };
    let mut row: Vec<Option<T>> = packed.into_iter().map(Some).collect();
    row.resize(total_slots, None);
    (row, overflow)
}

/// Put `card` at `position`, returning whatever it displaced.
pub fn place_card<T: Clone>(
    cards: &[Option<T>],
    card: T,
    position: usize,
) -> (Vec<Option<T>>, Option<T>) {
    let mut row = cards.to_vec();
    match row.get_mut(position) {
        Some(slot) => {
            let displaced = slot.replace(card);
            (row, displaced)
        }
        None => (row, None),
    }
}

/// Insert `card` before `insert_position`, shifting later cards right, then
/// compact. Cards pushed past `total_slots` come back as excess.
pub fn insert_card<T: Clone>(
    cards: &[Option<T>],
    card: T,
    insert_position: usize,
    total_slots: usize,
) -> (Vec<Option<T>>, Vec<T>) {
    let mut row = cards.to_vec();
    let at = insert_position.min(row.len());
    row.insert(at, Some(card));
    compact(&row, total_slots)
}

/// Take the card out of `position` and close the gap.
pub fn remove_card<T: Clone>(cards: &[Option<T>], position: usize) -> (Vec<Option<T>>, Option<T>) {
    if position >= cards.len() {
        return (cards.to_vec(), None);
    }
    let mut row = cards.to_vec();
    let removed = row[position].take();
    let (row, _) = compact(&row, cards.len());
    (row, removed)
}
