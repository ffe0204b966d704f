//! GamePlugin traits: the interface every game must implement.
//!
//! Games implement [`TypedGamePlugin`] over their own state and move types.
//! [`JsonAdapter`] lifts a typed plugin to the object-safe [`GamePlugin`] used
//! by the registry and the gRPC service, where states and moves travel as JSON.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::engine::error::MoveError;
use crate::engine::models::*;

/// Object-safe, JSON-level plugin. Equivalent to the core call shape exposed
/// over the wire.
pub trait GamePlugin: Send + Sync {
    fn game_id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn description(&self) -> &str;
    fn min_players(&self) -> u32;
    fn max_players(&self) -> u32;

    fn info(&self) -> GameInfo {
        GameInfo {
            game_id: self.game_id().to_string(),
            display_name: self.display_name().to_string(),
            description: self.description().to_string(),
            min_players: self.min_players(),
            max_players: self.max_players(),
        }
    }

    /// Fresh setup-phase state from a validated configuration.
    fn get_initial_state(&self, config: &GameConfig) -> Result<serde_json::Value, MoveError>;

    /// Authoritative validation: legality check plus transition.
    fn validate_move(
        &self,
        state: &serde_json::Value,
        game_move: &serde_json::Value,
        ctx: &MoveContext,
    ) -> ValidationResult<serde_json::Value>;

    /// Best-effort client-side projection. Never rejects; an inapplicable or
    /// undecodable move returns `state` unchanged.
    fn predict_move(
        &self,
        state: &serde_json::Value,
        game_move: &serde_json::Value,
    ) -> serde_json::Value;

    fn is_game_complete(&self, state: &serde_json::Value) -> Result<bool, MoveError>;
}

/// Typed plugin trait. Legality (`check_move`) and transition (`apply_move`)
/// are separate so the predictor and the validator share one transition.
pub trait TypedGamePlugin: Send + Sync {
    type State: Clone + Serialize + DeserializeOwned + Send + Sync;
    type Move: Clone + Serialize + DeserializeOwned + Send + Sync;
    type Config: Default + DeserializeOwned;

    fn game_id(&self) -> &str;
    fn display_name(&self) -> &str;
    fn description(&self) -> &str;
    fn min_players(&self) -> u32;
    fn max_players(&self) -> u32;

    fn get_initial_state(&self, config: &Self::Config) -> Self::State;

    /// Reject option values the game's own SET_CONFIG would reject. Called
    /// before `get_initial_state` wherever a config crosses the boundary.
    fn check_config(&self, _config: &Self::Config) -> Result<(), MoveError> {
        Ok(())
    }

    /// Check a move against the current state without changing it.
    fn check_move(
        &self,
        state: &Self::State,
        game_move: &GameMove<Self::Move>,
        ctx: &MoveContext,
    ) -> Result<(), MoveError>;

    /// Pure transition. Must be total: a move that does not apply to `state`
    /// yields a clone of `state`.
    fn apply_move(&self, state: &Self::State, game_move: &GameMove<Self::Move>) -> Self::State;

    fn is_game_complete(&self, state: &Self::State) -> bool;

    /// Moves whose outcome only the server can compute return `false`; the
    /// predictor leaves state unchanged for them.
    fn is_predictable(&self, _game_move: &Self::Move) -> bool {
        true
    }

    fn validate_move(
        &self,
        state: &Self::State,
        game_move: &GameMove<Self::Move>,
        ctx: &MoveContext,
    ) -> ValidationResult<Self::State> {
        match self.check_move(state, game_move, ctx) {
            Ok(()) => ValidationResult::Valid {
                new_state: self.apply_move(state, game_move),
            },
            Err(e) => ValidationResult::Invalid {
                error: e.to_string(),
            },
        }
    }

    fn predict_move(&self, state: &Self::State, game_move: &GameMove<Self::Move>) -> Self::State {
        if self.is_predictable(&game_move.kind) {
            self.apply_move(state, game_move)
        } else {
            state.clone()
        }
    }
}

/// Wraps a [`TypedGamePlugin`] so it can be registered as a [`GamePlugin`].
pub struct JsonAdapter<P>(pub P);

impl<P: TypedGamePlugin> JsonAdapter<P> {
    pub fn inner(&self) -> &P {
        &self.0
    }

    pub fn decode_state(&self, game_data: &serde_json::Value) -> Result<P::State, MoveError> {
        serde_json::from_value(game_data.clone())
            .map_err(|e| MoveError::Malformed(format!("invalid {} state: {}", self.0.game_id(), e)))
    }

    pub fn encode_state(&self, state: &P::State) -> Result<serde_json::Value, MoveError> {
        serde_json::to_value(state)
            .map_err(|e| MoveError::Malformed(format!("failed to encode state: {}", e)))
    }

    pub fn decode_move(
        &self,
        game_move: &serde_json::Value,
    ) -> Result<GameMove<P::Move>, MoveError> {
        serde_json::from_value(game_move.clone()).map_err(|e| MoveError::Malformed(e.to_string()))
    }

    fn validate_json(
        &self,
        state: &serde_json::Value,
        game_move: &serde_json::Value,
        ctx: &MoveContext,
    ) -> Result<serde_json::Value, MoveError> {
        let typed_state = self.decode_state(state)?;
        let typed_move = self.decode_move(game_move)?;
        let new_state = self
            .0
            .validate_move(&typed_state, &typed_move, ctx)
            .into_result()
            .map_err(MoveError::InvalidState)?;
        self.encode_state(&new_state)
    }
}

impl<P: TypedGamePlugin> GamePlugin for JsonAdapter<P> {
    fn game_id(&self) -> &str {
        self.0.game_id()
    }
    fn display_name(&self) -> &str {
        self.0.display_name()
    }
    fn description(&self) -> &str {
        self.0.description()
    }
    fn min_players(&self) -> u32 {
        self.0.min_players()
    }
    fn max_players(&self) -> u32 {
        self.0.max_players()
    }

    fn get_initial_state(&self, config: &GameConfig) -> Result<serde_json::Value, MoveError> {
        let typed: P::Config = serde_json::from_value(config.options.clone())
            .map_err(|e| MoveError::config(e.to_string()))?;
        self.0.check_config(&typed)?;
        self.encode_state(&self.0.get_initial_state(&typed))
    }

    fn validate_move(
        &self,
        state: &serde_json::Value,
        game_move: &serde_json::Value,
        ctx: &MoveContext,
    ) -> ValidationResult<serde_json::Value> {
        match self.validate_json(state, game_move, ctx) {
            Ok(new_state) => ValidationResult::Valid { new_state },
            Err(e) => {
                tracing::debug!(
                    game_id = self.0.game_id(),
                    move_type = ?game_move.get("type"),
                    error = %e,
                    "move rejected"
                );
                ValidationResult::Invalid {
                    error: e.to_string(),
                }
            }
        }
    }

    fn predict_move(
        &self,
        state: &serde_json::Value,
        game_move: &serde_json::Value,
    ) -> serde_json::Value {
        let (typed_state, typed_move) = match (self.decode_state(state), self.decode_move(game_move)) {
            (Ok(s), Ok(m)) => (s, m),
            _ => return state.clone(),
        };
        let predicted = self.0.predict_move(&typed_state, &typed_move);
        self.encode_state(&predicted).unwrap_or_else(|_| state.clone())
    }

    fn is_game_complete(&self, state: &serde_json::Value) -> Result<bool, MoveError> {
        let typed_state = self.decode_state(state)?;
        Ok(self.0.is_game_complete(&typed_state))
    }
}
