//! Piece movement: geometry, path blocking, and reachable squares.

use std::collections::HashMap;

use super::types::{Piece, PieceType, RithmomachiaState, Square};

const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Square → live piece lookup, built once per query batch.
pub struct Occupancy<'a> {
    by_square: HashMap<Square, &'a Piece>,
}

impl<'a> Occupancy<'a> {
    pub fn new(state: &'a RithmomachiaState) -> Self {
        let by_square = state
            .pieces
            .values()
            .filter(|p| !p.captured)
            .map(|p| (p.square, p))
            .collect();
        Self { by_square }
    }

    pub fn get(&self, square: Square) -> Option<&'a Piece> {
        self.by_square.get(&square).copied()
    }
}

fn directions(piece_type: PieceType) -> Vec<(i8, i8)> {
    match piece_type {
        PieceType::C => DIAGONAL.to_vec(),
        PieceType::T => ORTHOGONAL.to_vec(),
        PieceType::S | PieceType::P => ORTHOGONAL.iter().chain(&DIAGONAL).copied().collect(),
    }
}

fn max_distance(piece_type: PieceType) -> u8 {
    match piece_type {
        PieceType::P => 1,
        _ => u8::MAX,
    }
}

/// Unit step from `from` toward `to` if the piece type can travel that line.
pub fn step_toward(piece_type: PieceType, from: Square, to: Square) -> Option<(i8, i8)> {
    let dc = to.col as i16 - from.col as i16;
    let dr = to.row as i16 - from.row as i16;
    if dc == 0 && dr == 0 {
        return None;
    }
    let straight = dc == 0 || dr == 0;
    let diagonal = dc.abs() == dr.abs();
    let allowed = match piece_type {
        PieceType::C => diagonal,
        PieceType::T => straight,
        PieceType::S => straight || diagonal,
        PieceType::P => dc.abs() <= 1 && dr.abs() <= 1,
    };
    allowed.then(|| (dc.signum() as i8, dr.signum() as i8))
}

/// Squares strictly between `from` and `to` along a straight or diagonal line.
pub fn squares_between(from: Square, to: Square, step: (i8, i8)) -> Vec<Square> {
    let mut out = Vec::new();
    let mut cur = from;
    while let Some(next) = cur.offset(step.0, step.1) {
        if next == to {
            break;
        }
        out.push(next);
        cur = next;
    }
    out
}

/// Whether the piece may travel to `to` ignoring what stands on `to` itself.
pub fn can_reach(occupancy: &Occupancy<'_>, piece: &Piece, to: Square) -> bool {
    match step_toward(piece.piece_type, piece.square, to) {
        Some(step) => squares_between(piece.square, to, step)
            .iter()
            .all(|sq| occupancy.get(*sq).is_none()),
        None => false,
    }
}

/// Every square the piece can land on: empty squares along its lines plus
/// the first occupied square in each direction (friendly or not; the caller
/// filters).
pub fn reachable_squares(occupancy: &Occupancy<'_>, piece: &Piece) -> Vec<Square> {
    let mut out = Vec::new();
    for (dc, dr) in directions(piece.piece_type) {
        let mut cur = piece.square;
        let mut travelled = 0u8;
        while travelled < max_distance(piece.piece_type) {
            let Some(next) = cur.offset(dc, dr) else {
                break;
            };
            out.push(next);
            if occupancy.get(next).is_some() {
                break;
            }
            cur = next;
            travelled += 1;
        }
    }
    out
}
