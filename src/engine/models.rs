//! Core engine data types shared by every game.

use std::fmt;

use serde::{Deserialize, Serialize};

pub type PlayerId = String;

/// Lifecycle phase of a game instance. Controls which moves are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GamePhase {
    #[default]
    Setup,
    Playing,
    Results,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GamePhase::Setup => "setup",
            GamePhase::Playing => "playing",
            GamePhase::Results => "results",
        };
        f.write_str(name)
    }
}

/// Envelope around a game-specific move payload.
///
/// `K` is the game's move enum, internally tagged by `type`, so on the wire a
/// move is one flat object:
/// `{"type":"PLACE_CARD","playerId":"p1","userId":"u1","timestamp":0,"cardId":"c3","position":2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMove<K> {
    pub player_id: PlayerId,
    #[serde(default)]
    pub user_id: String,
    /// Milliseconds since the Unix epoch, stamped by the client.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub kind: K,
}

impl<K> GameMove<K> {
    pub fn new(player_id: impl Into<PlayerId>, timestamp: i64, kind: K) -> Self {
        let player_id = player_id.into();
        Self {
            user_id: player_id.clone(),
            player_id,
            timestamp,
            kind,
        }
    }
}

/// Who is submitting a move, as known by the session layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveContext {
    #[serde(default)]
    pub user_id: Option<String>,
    /// Seat assigned by the room roster. Games with sides (W/B) map seat 0 to
    /// the first side; `None` skips the seat check.
    #[serde(default)]
    pub seat: Option<usize>,
}

impl MoveContext {
    pub fn for_seat(seat: usize) -> Self {
        Self {
            user_id: None,
            seat: Some(seat),
        }
    }
}

/// Outcome of authoritative validation. Rejections carry a message and never
/// a modified state.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult<S> {
    Valid { new_state: S },
    Invalid { error: String },
}

impl<S> ValidationResult<S> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ValidationResult::Valid { .. } => None,
            ValidationResult::Invalid { error } => Some(error),
        }
    }

    pub fn into_result(self) -> Result<S, String> {
        match self {
            ValidationResult::Valid { new_state } => Ok(new_state),
            ValidationResult::Invalid { error } => Err(error),
        }
    }

    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> ValidationResult<T> {
        match self {
            ValidationResult::Valid { new_state } => ValidationResult::Valid {
                new_state: f(new_state),
            },
            ValidationResult::Invalid { error } => ValidationResult::Invalid { error },
        }
    }
}

/// Game configuration as it crosses the JSON boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "default_options")]
    pub options: serde_json::Value,
}

impl GameConfig {
    pub fn from_options(options: serde_json::Value) -> Self {
        Self { options }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            options: default_options(),
        }
    }
}

fn default_options() -> serde_json::Value {
    serde_json::json!({})
}

/// Static description of a registered game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub game_id: String,
    pub display_name: String,
    pub description: String,
    pub min_players: u32,
    pub max_players: u32,
}
