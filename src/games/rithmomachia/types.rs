//! Domain types for Rithmomachia.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::models::{GameMove, GamePhase};

pub const BOARD_COLUMNS: u8 = 16;
pub const BOARD_ROWS: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    W,
    B,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::W => Color::B,
            Color::B => Color::W,
        }
    }

    pub fn seat(self) -> usize {
        match self {
            Color::W => 0,
            Color::B => 1,
        }
    }

    /// Seat 0 plays White, seat 1 plays Black.
    pub fn from_seat(seat: usize) -> Option<Color> {
        match seat {
            0 => Some(Color::W),
            1 => Some(Color::B),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::W => "W",
            Color::B => "B",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceType {
    /// Circle
    C,
    /// Triangle
    T,
    /// Square
    S,
    /// Pyramid
    P,
}

impl PieceType {
    /// Points credited to the capturer.
    pub fn point_value(self) -> u32 {
        match self {
            PieceType::C => 1,
            PieceType::T => 2,
            PieceType::S => 3,
            PieceType::P => 5,
        }
    }
}

/// Board coordinate. Serialized as algebraic text, column `A..P` then row `1..8`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    pub col: u8,
    pub row: u8,
}

impl Square {
    pub fn new(col: u8, row: u8) -> Option<Square> {
        (col < BOARD_COLUMNS && row < BOARD_ROWS).then_some(Square { col, row })
    }

    pub fn offset(self, dc: i8, dr: i8) -> Option<Square> {
        let col = self.col as i16 + dc as i16;
        let row = self.row as i16 + dr as i16;
        if col < 0 || row < 0 {
            return None;
        }
        Square::new(col as u8, row as u8)
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.col) as char, self.row + 1)
    }
}

impl FromStr for Square {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let col = chars
            .next()
            .filter(|c| c.is_ascii_uppercase())
            .map(|c| c as u8 - b'A')
            .ok_or_else(|| format!("invalid square: {}", s))?;
        let row: u8 = chars
            .as_str()
            .parse()
            .map_err(|_| format!("invalid square: {}", s))?;
        if row == 0 {
            return Err(format!("invalid square: {}", s));
        }
        Square::new(col, row - 1).ok_or_else(|| format!("square off the board: {}", s))
    }
}

impl TryFrom<String> for Square {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Square> for String {
    fn from(sq: Square) -> String {
        sq.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Piece {
    pub id: String,
    pub color: Color,
    #[serde(rename = "type")]
    pub piece_type: PieceType,
    pub value: u32,
    /// Face values a pyramid can capture with. Empty for other pieces.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pyramid_faces: Vec<u32>,
    pub square: Square,
    #[serde(default)]
    pub captured: bool,
}

impl Piece {
    /// Value the piece presents as a capture target or harmony member.
    pub fn total_value(&self) -> u32 {
        if self.piece_type == PieceType::P && !self.pyramid_faces.is_empty() {
            self.pyramid_faces.iter().sum()
        } else {
            self.value
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureRelation {
    Equal,
    Multiple,
    Divisor,
    Sum,
    Diff,
    Product,
    Ratio,
}

impl CaptureRelation {
    pub const ALL: [CaptureRelation; 7] = [
        CaptureRelation::Equal,
        CaptureRelation::Multiple,
        CaptureRelation::Divisor,
        CaptureRelation::Sum,
        CaptureRelation::Diff,
        CaptureRelation::Product,
        CaptureRelation::Ratio,
    ];

    pub fn needs_helper(self) -> bool {
        matches!(
            self,
            CaptureRelation::Sum
                | CaptureRelation::Diff
                | CaptureRelation::Product
                | CaptureRelation::Ratio
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSpec {
    pub relation: CaptureRelation,
    pub target_piece_id: String,
    #[serde(default)]
    pub helpers: Vec<String>,
    /// Face used when the mover is a pyramid.
    #[serde(default)]
    pub pyramid_face: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmonyType {
    Arithmetic,
    Geometric,
    Harmonic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarmonyDeclaration {
    pub color: Color,
    pub piece_ids: Vec<String>,
    pub harmony_type: HarmonyType,
    pub declared_at_ply: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WinCondition {
    Harmony,
    Exhaustion,
    Resignation,
    Points,
    Agreement,
    Repetition,
    Fifty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RithmomachiaConfig {
    pub point_win_enabled: bool,
    pub point_win_threshold: u32,
    pub repetition_rule: bool,
    /// Occurrences of the same position that end the game in a draw.
    pub repetition_count: u32,
    pub fifty_move_rule: bool,
    /// Moves per side without a capture before the game is drawn.
    pub fifty_move_limit: u32,
}

impl Default for RithmomachiaConfig {
    fn default() -> Self {
        Self {
            point_win_enabled: false,
            point_win_threshold: 30,
            repetition_rule: true,
            repetition_count: 3,
            fifty_move_rule: true,
            fifty_move_limit: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub ply: u32,
    pub color: Color,
    pub piece_id: String,
    pub from: Square,
    pub to: Square,
    #[serde(default)]
    pub captured: Option<String>,
    #[serde(default)]
    pub relation: Option<CaptureRelation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RithmomachiaState {
    pub game_phase: GamePhase,
    pub config: RithmomachiaConfig,
    /// Every piece of both sides keyed by id, captured ones included.
    pub pieces: BTreeMap<String, Piece>,
    pub turn: Color,
    pub ply: u32,
    pub half_moves_since_capture: u32,
    #[serde(default)]
    pub position_counts: HashMap<String, u32>,
    #[serde(default)]
    pub pending_harmony: Option<HarmonyDeclaration>,
    #[serde(default)]
    pub draw_offer: Option<Color>,
    #[serde(default)]
    pub captured_points: BTreeMap<Color, u32>,
    #[serde(default)]
    pub history: Vec<MoveRecord>,
    #[serde(default)]
    pub winner: Option<Color>,
    #[serde(default)]
    pub win_condition: Option<WinCondition>,
}

impl RithmomachiaState {
    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.pieces
            .values()
            .find(|p| !p.captured && p.square == square)
    }

    pub fn live_pieces(&self, color: Color) -> impl Iterator<Item = &Piece> {
        self.pieces
            .values()
            .filter(move |p| p.color == color && !p.captured)
    }

    pub fn points(&self, color: Color) -> u32 {
        self.captured_points.get(&color).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RithmomachiaConfigField {
    PointWinEnabled,
    PointWinThreshold,
    RepetitionRule,
    RepetitionCount,
    FiftyMoveRule,
    FiftyMoveLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RithmomachiaMove {
    StartGame,
    Move {
        piece_id: String,
        from: Square,
        to: Square,
        #[serde(default)]
        capture: Option<CaptureSpec>,
    },
    DeclareHarmony {
        piece_ids: Vec<String>,
        harmony_type: HarmonyType,
    },
    Resign {
        color: Color,
    },
    OfferDraw,
    AcceptDraw,
    DeclineDraw,
    SetConfig {
        field: RithmomachiaConfigField,
        #[serde(default)]
        value: serde_json::Value,
    },
    ResetGame,
    #[serde(other)]
    Unknown,
}

impl RithmomachiaMove {
    pub fn name(&self) -> &'static str {
        match self {
            RithmomachiaMove::StartGame => "START_GAME",
            RithmomachiaMove::Move { .. } => "MOVE",
            RithmomachiaMove::DeclareHarmony { .. } => "DECLARE_HARMONY",
            RithmomachiaMove::Resign { .. } => "RESIGN",
            RithmomachiaMove::OfferDraw => "OFFER_DRAW",
            RithmomachiaMove::AcceptDraw => "ACCEPT_DRAW",
            RithmomachiaMove::DeclineDraw => "DECLINE_DRAW",
            RithmomachiaMove::SetConfig { .. } => "SET_CONFIG",
            RithmomachiaMove::ResetGame => "RESET_GAME",
            RithmomachiaMove::Unknown => "UNKNOWN",
        }
    }
}

pub type RithmomachiaGameMove = GameMove<RithmomachiaMove>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_round_trip_text() {
        let sq: Square = "P8".parse().unwrap();
        assert_eq!(sq, Square { col: 15, row: 7 });
        assert_eq!(sq.to_string(), "P8");
        assert_eq!("A1".parse::<Square>().unwrap(), Square { col: 0, row: 0 });
    }

    #[test]
    fn test_square_rejects_off_board() {
        assert!("Q1".parse::<Square>().is_err());
        assert!("A9".parse::<Square>().is_err());
        assert!("A0".parse::<Square>().is_err());
        assert!("a1".parse::<Square>().is_err());
        assert!("".parse::<Square>().is_err());
    }

    #[test]
    fn test_pyramid_total_value() {
        let pyramid = Piece {
            id: "W-P-1".into(),
            color: Color::W,
            piece_type: PieceType::P,
            value: 91,
            pyramid_faces: vec![36, 25, 16, 9, 4, 1],
            square: Square { col: 0, row: 3 },
            captured: false,
        };
        assert_eq!(pyramid.total_value(), 91);
    }

    #[test]
    fn test_move_decodes_square_text() {
        let json = serde_json::json!({
            "type": "MOVE",
            "playerId": "p1",
            "pieceId": "W-C-1",
            "from": "C1",
            "to": "D2"
        });
        let decoded: RithmomachiaGameMove = serde_json::from_value(json).unwrap();
        match decoded.kind {
            RithmomachiaMove::Move { from, to, capture, .. } => {
                assert_eq!(from.to_string(), "C1");
                assert_eq!(to.to_string(), "D2");
                assert!(capture.is_none());
            }
            other => panic!("unexpected move {:?}", other),
        }
    }
}
