//! gRPC server implementation for GameEngineService.

use std::collections::HashMap;
use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::engine::arena::{run_named_arena, ArenaRequest, ArenaResult};
use crate::engine::models;
use crate::engine::plugin::GamePlugin;
use crate::engine::settings::EngineSettings;
use crate::games::GameRegistry;

pub mod proto {
    tonic::include_proto!("arcade.engine.v1");
}

use proto::game_engine_service_server::GameEngineService;
use proto::*;

/// The gRPC service implementation.
pub struct GameEngineServer {
    registry: Arc<GameRegistry>,
    settings: Arc<EngineSettings>,
}

impl GameEngineServer {
    pub fn new(registry: GameRegistry, settings: EngineSettings) -> Self {
        Self {
            registry: Arc::new(registry),
            settings: Arc::new(settings),
        }
    }

    fn get_plugin(&self, game_id: &str) -> Result<&dyn GamePlugin, Status> {
        self.registry
            .get(game_id)
            .ok_or_else(|| Status::not_found(format!("unknown game_id: {}", game_id)))
    }
}

// --- Conversion helpers: protobuf <-> engine types ---

fn json_from_bytes(bytes: &[u8], what: &str) -> Result<serde_json::Value, Status> {
    serde_json::from_slice(bytes)
        .map_err(|e| Status::invalid_argument(format!("invalid {} JSON: {}", what, e)))
}

/// Empty bytes mean "no options".
fn options_from_bytes(bytes: &[u8]) -> Result<serde_json::Value, Status> {
    if bytes.is_empty() {
        Ok(serde_json::Value::Null)
    } else {
        json_from_bytes(bytes, "config")
    }
}

fn json_to_bytes(value: &serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(value).unwrap_or_default()
}

fn proto_to_context(ctx: Option<proto::MoveContext>) -> Result<models::MoveContext, Status> {
    let Some(ctx) = ctx else {
        return Ok(models::MoveContext::default());
    };
    let seat = match ctx.seat {
        Some(seat) => Some(
            usize::try_from(seat)
                .map_err(|_| Status::invalid_argument(format!("invalid seat: {}", seat)))?,
        ),
        None => None,
    };
    Ok(models::MoveContext {
        user_id: ctx.user_id,
        seat,
    })
}

fn info_to_proto(info: models::GameInfo) -> GameInfo {
    GameInfo {
        game_id: info.game_id,
        display_name: info.display_name,
        description: info.description,
        min_players: info.min_players as i32,
        max_players: info.max_players as i32,
    }
}

fn arena_result_to_proto(result: &ArenaResult) -> RunArenaResponse {
    let mut score_stats = HashMap::new();
    for name in result.wins.keys() {
        let (ci_lo, ci_hi) = result.confidence_interval_95(name);
        score_stats.insert(
            name.clone(),
            ArenaScoreStats {
                avg: result.avg_score(name),
                stddev: result.score_stddev(name),
                win_rate: result.win_rate(name),
                ci_95_lo: ci_lo,
                ci_95_hi: ci_hi,
            },
        );
    }
    let counts = |m: &HashMap<String, usize>| -> HashMap<String, i32> {
        m.iter().map(|(k, v)| (k.clone(), *v as i32)).collect()
    };
    RunArenaResponse {
        num_games: result.num_games as i32,
        wins: counts(&result.wins),
        draws: result.draws as i32,
        unfinished: result.unfinished as i32,
        rejected_moves: result.rejected_moves as i32,
        end_conditions: counts(&result.end_conditions),
        score_stats,
        total_duration_s: result.game_durations_ms.iter().sum::<f64>() / 1000.0,
    }
}

#[tonic::async_trait]
impl GameEngineService for GameEngineServer {
    // --- ListGames ---
    async fn list_games(
        &self,
        _request: Request<ListGamesRequest>,
    ) -> Result<Response<ListGamesResponse>, Status> {
        let games = self
            .registry
            .list_game_ids()
            .iter()
            .filter_map(|id| self.registry.get(id))
            .map(|plugin| info_to_proto(plugin.info()))
            .collect();
        Ok(Response::new(ListGamesResponse { games }))
    }

    // --- GetGameInfo ---
    async fn get_game_info(
        &self,
        request: Request<GetGameInfoRequest>,
    ) -> Result<Response<GameInfo>, Status> {
        let req = request.into_inner();
        let plugin = self.get_plugin(&req.game_id)?;
        Ok(Response::new(info_to_proto(plugin.info())))
    }

    // --- GetInitialState ---
    async fn get_initial_state(
        &self,
        request: Request<GetInitialStateRequest>,
    ) -> Result<Response<GetInitialStateResponse>, Status> {
        let req = request.into_inner();
        let plugin = self.get_plugin(&req.game_id)?;
        let config = match options_from_bytes(&req.config_json)? {
            serde_json::Value::Null => models::GameConfig::default(),
            options => models::GameConfig::from_options(options),
        };
        let state = plugin
            .get_initial_state(&config)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        Ok(Response::new(GetInitialStateResponse {
            state_json: json_to_bytes(&state),
        }))
    }

    // --- ValidateMove ---
    async fn validate_move(
        &self,
        request: Request<ValidateMoveRequest>,
    ) -> Result<Response<ValidateMoveResponse>, Status> {
        let req = request.into_inner();
        let plugin = self.get_plugin(&req.game_id)?;
        let state = json_from_bytes(&req.state_json, "state")?;
        let game_move = json_from_bytes(&req.move_json, "move")?;
        let ctx = proto_to_context(req.context)?;

        let response = match plugin.validate_move(&state, &game_move, &ctx) {
            models::ValidationResult::Valid { new_state } => ValidateMoveResponse {
                valid: true,
                new_state_json: json_to_bytes(&new_state),
                error: String::new(),
            },
            models::ValidationResult::Invalid { error } => ValidateMoveResponse {
                valid: false,
                new_state_json: Vec::new(),
                error,
            },
        };
        Ok(Response::new(response))
    }

    // --- PredictMove ---
    async fn predict_move(
        &self,
        request: Request<PredictMoveRequest>,
    ) -> Result<Response<PredictMoveResponse>, Status> {
        let req = request.into_inner();
        let plugin = self.get_plugin(&req.game_id)?;
        let state = json_from_bytes(&req.state_json, "state")?;
        let game_move = json_from_bytes(&req.move_json, "move")?;
        let predicted = plugin.predict_move(&state, &game_move);
        Ok(Response::new(PredictMoveResponse {
            state_json: json_to_bytes(&predicted),
        }))
    }

    // --- IsGameComplete ---
    async fn is_game_complete(
        &self,
        request: Request<IsGameCompleteRequest>,
    ) -> Result<Response<IsGameCompleteResponse>, Status> {
        let req = request.into_inner();
        let plugin = self.get_plugin(&req.game_id)?;
        let state = json_from_bytes(&req.state_json, "state")?;
        let complete = plugin
            .is_game_complete(&state)
            .map_err(|e| Status::invalid_argument(e.to_string()))?;
        Ok(Response::new(IsGameCompleteResponse { complete }))
    }

    // --- RunArena ---
    async fn run_arena(
        &self,
        request: Request<RunArenaRequest>,
    ) -> Result<Response<RunArenaResponse>, Status> {
        let req = request.into_inner();
        self.get_plugin(&req.game_id)?;
        if req.num_games < 0 || req.max_plies < 0 {
            return Err(Status::invalid_argument(
                "num_games and max_plies must not be negative",
            ));
        }
        let arena = ArenaRequest {
            game_id: req.game_id,
            strategies: req.strategies,
            config: options_from_bytes(&req.config_json)?,
            num_games: req.num_games as usize,
            base_seed: req.base_seed as u64,
            max_plies: if req.max_plies > 0 {
                req.max_plies as usize
            } else {
                self.settings.arena.max_plies
            },
            alternate_seats: req.alternate_seats,
        };
        tracing::info!(
            game_id = %arena.game_id,
            strategies = ?arena.strategies,
            num_games = arena.num_games,
            "arena requested"
        );

        let settings = Arc::clone(&self.settings);
        let result = tokio::task::spawn_blocking(move || run_named_arena(&arena, &settings))
            .await
            .map_err(|e| Status::internal(format!("arena task failed: {}", e)))?
            .map_err(|e| Status::invalid_argument(e))?;

        Ok(Response::new(arena_result_to_proto(&result)))
    }
}
