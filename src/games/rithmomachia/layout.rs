//! Starting position.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use super::types::{Color, Piece, PieceType, Square};

/// One column of starting pieces, listed from row 1 to row 8.
struct ColumnSetup {
    color: Color,
    col: u8,
    piece_type: PieceType,
    values: [u32; 8],
}

const PYRAMID_ROW: usize = 3;

const WHITE_PYRAMID_FACES: &[u32] = &[36, 25, 16, 9, 4, 1];
const BLACK_PYRAMID_FACES: &[u32] = &[64, 49, 36, 25, 16];

const COLUMNS: [ColumnSetup; 6] = [
    // A: squares, pyramid 91 on row 4
    ColumnSetup {
        color: Color::W,
        col: 0,
        piece_type: PieceType::S,
        values: [153, 169, 289, 91, 81, 45, 25, 15],
    },
    // B: triangles
    ColumnSetup {
        color: Color::W,
        col: 1,
        piece_type: PieceType::T,
        values: [81, 72, 49, 42, 25, 20, 9, 6],
    },
    // C: circles
    ColumnSetup {
        color: Color::W,
        col: 2,
        piece_type: PieceType::C,
        values: [64, 36, 16, 4, 8, 6, 4, 2],
    },
    // N: circles
    ColumnSetup {
        color: Color::B,
        col: 13,
        piece_type: PieceType::C,
        values: [81, 49, 25, 9, 9, 7, 5, 3],
    },
    // O: triangles
    ColumnSetup {
        color: Color::B,
        col: 14,
        piece_type: PieceType::T,
        values: [100, 90, 64, 56, 36, 30, 16, 12],
    },
    // P: squares, pyramid 190 on row 4
    ColumnSetup {
        color: Color::B,
        col: 15,
        piece_type: PieceType::S,
        values: [361, 225, 121, 190, 120, 66, 49, 28],
    },
];

pub static INITIAL_PIECES: Lazy<Vec<Piece>> = Lazy::new(|| {
    let mut pieces = Vec::with_capacity(48);
    for column in &COLUMNS {
        for (row, &value) in column.values.iter().enumerate() {
            let is_pyramid = column.piece_type == PieceType::S && row == PYRAMID_ROW;
            let piece_type = if is_pyramid {
                PieceType::P
            } else {
                column.piece_type
            };
            let pyramid_faces = match (is_pyramid, column.color) {
                (false, _) => Vec::new(),
                (true, Color::W) => WHITE_PYRAMID_FACES.to_vec(),
                (true, Color::B) => BLACK_PYRAMID_FACES.to_vec(),
            };
            let square = Square {
                col: column.col,
                row: row as u8,
            };
            pieces.push(Piece {
                id: format!("{}-{:?}-{}", column.color, piece_type, square),
                color: column.color,
                piece_type,
                value,
                pyramid_faces,
                square,
                captured: false,
            });
        }
    }
    pieces
});

/// Fresh piece map keyed by id.
pub fn initial_pieces() -> BTreeMap<String, Piece> {
    INITIAL_PIECES
        .iter()
        .map(|p| (p.id.clone(), p.clone()))
        .collect()
}

/// White attacks columns I..P, Black attacks A..H.
pub fn in_enemy_half(color: Color, square: Square) -> bool {
    match color {
        Color::W => square.col >= 8,
        Color::B => square.col < 8,
    }
}
