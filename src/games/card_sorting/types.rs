//! Domain types for the card sorting challenge.

use serde::{Deserialize, Serialize};

use crate::engine::models::{GameMove, GamePhase};

pub const VALID_CARD_COUNTS: [u8; 4] = [5, 8, 12, 15];
pub const MIN_TIME_LIMIT_SECS: u32 = 30;

/// One card of the round. `number` is the hidden value the player sorts by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortingCard {
    pub id: String,
    pub number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Solo,
    Collaborative,
    Competitive,
    Relay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardSortingConfig {
    pub card_count: u8,
    pub show_numbers: bool,
    /// Seconds; `None` means untimed. Presentational only, never enforced here.
    pub time_limit: Option<u32>,
    pub game_mode: GameMode,
}

impl Default for CardSortingConfig {
    fn default() -> Self {
        Self {
            card_count: 8,
            show_numbers: true,
            time_limit: None,
            game_mode: GameMode::Solo,
        }
    }
}

/// Free-drag placement of a card, in viewport percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardPosition {
    pub card_id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub final_score: u32,
    pub exact_matches: usize,
    pub lcs_length: usize,
    pub inversions: usize,
    pub relative_order_score: u32,
    pub exact_position_score: u32,
    pub inversion_score: u32,
    /// Whole seconds between game start and the solution check.
    pub elapsed_time: i64,
}

/// In-progress placement saved by GO_TO_SETUP so RESUME_GAME can restore it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PausedGame {
    pub selected_cards: Vec<SortingCard>,
    pub correct_order: Vec<SortingCard>,
    pub available_cards: Vec<SortingCard>,
    pub placed_cards: Vec<Option<SortingCard>>,
    pub card_positions: Vec<CardPosition>,
    pub numbers_revealed: bool,
    pub game_start_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSortingState {
    pub card_count: u8,
    pub show_numbers: bool,
    pub time_limit: Option<u32>,
    pub game_mode: GameMode,

    pub game_phase: GamePhase,
    pub player_id: String,
    #[serde(default)]
    pub player_metadata: serde_json::Value,
    pub game_start_time: Option<i64>,
    pub game_end_time: Option<i64>,

    pub selected_cards: Vec<SortingCard>,
    pub correct_order: Vec<SortingCard>,
    pub available_cards: Vec<SortingCard>,
    pub placed_cards: Vec<Option<SortingCard>>,
    #[serde(default)]
    pub card_positions: Vec<CardPosition>,
    pub numbers_revealed: bool,

    pub score_breakdown: Option<ScoreBreakdown>,

    #[serde(default)]
    pub original_config: Option<CardSortingConfig>,
    #[serde(default)]
    pub paused_game_phase: Option<GamePhase>,
    #[serde(default)]
    pub paused_game_state: Option<PausedGame>,
}

impl CardSortingState {
    pub fn config(&self) -> CardSortingConfig {
        CardSortingConfig {
            card_count: self.card_count,
            show_numbers: self.show_numbers,
            time_limit: self.time_limit,
            game_mode: self.game_mode,
        }
    }

    pub(crate) fn apply_config(&mut self, config: &CardSortingConfig) {
        self.card_count = config.card_count;
        self.show_numbers = config.show_numbers;
        self.time_limit = config.time_limit;
        self.game_mode = config.game_mode;
    }

    pub(crate) fn with_config(config: &CardSortingConfig) -> Self {
        CardSortingState {
            card_count: config.card_count,
            show_numbers: config.show_numbers,
            time_limit: config.time_limit,
            game_mode: config.game_mode,
            game_phase: GamePhase::Setup,
            player_id: String::new(),
            player_metadata: serde_json::Value::Null,
            game_start_time: None,
            game_end_time: None,
            selected_cards: Vec::new(),
            correct_order: Vec::new(),
            available_cards: Vec::new(),
            placed_cards: vec![None; config.card_count as usize],
            card_positions: Vec::new(),
            numbers_revealed: false,
            score_breakdown: None,
            original_config: None,
            paused_game_phase: None,
            paused_game_state: None,
        }
    }

    pub fn placed_count(&self) -> usize {
        self.placed_cards.iter().filter(|c| c.is_some()).count()
    }
}

/// Config field addressed by SET_CONFIG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfigField {
    CardCount,
    ShowNumbers,
    TimeLimit,
    GameMode,
}

/// A SET_CONFIG value after its field-specific checks passed.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigChange {
    CardCount(u8),
    ShowNumbers(bool),
    TimeLimit(Option<u32>),
    GameMode(GameMode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum CardSortingMove {
    StartGame {
        #[serde(default)]
        player_metadata: serde_json::Value,
        selected_cards: Vec<SortingCard>,
    },
    PlaceCard {
        card_id: String,
        position: usize,
    },
    InsertCard {
        card_id: String,
        insert_position: usize,
    },
    RemoveCard {
        position: usize,
    },
    RevealNumbers,
    UpdateCardPositions {
        positions: Vec<CardPosition>,
    },
    CheckSolution {
        /// Card ids in the order inferred from drag positions. When absent
        /// the slot row is scored.
        #[serde(default)]
        final_sequence: Option<Vec<String>>,
    },
    GoToSetup,
    SetConfig {
        field: ConfigField,
        #[serde(default)]
        value: serde_json::Value,
    },
    ResumeGame,
    #[serde(other)]
    Unknown,
}

impl CardSortingMove {
    pub fn name(&self) -> &'static str {
        match self {
            CardSortingMove::StartGame { .. } => "START_GAME",
            CardSortingMove::PlaceCard { .. } => "PLACE_CARD",
            CardSortingMove::InsertCard { .. } => "INSERT_CARD",
            CardSortingMove::RemoveCard { .. } => "REMOVE_CARD",
            CardSortingMove::RevealNumbers => "REVEAL_NUMBERS",
            CardSortingMove::UpdateCardPositions { .. } => "UPDATE_CARD_POSITIONS",
            CardSortingMove::CheckSolution { .. } => "CHECK_SOLUTION",
            CardSortingMove::GoToSetup => "GO_TO_SETUP",
            CardSortingMove::SetConfig { .. } => "SET_CONFIG",
            CardSortingMove::ResumeGame => "RESUME_GAME",
            CardSortingMove::Unknown => "UNKNOWN",
        }
    }
}

pub type CardSortingGameMove = GameMove<CardSortingMove>;
