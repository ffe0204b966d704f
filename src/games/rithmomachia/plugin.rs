//! RithmomachiaPlugin: implements TypedGamePlugin trait.

use std::collections::HashSet;

use crate::engine::error::MoveError;
use crate::engine::models::*;
use crate::engine::plugin::TypedGamePlugin;

use super::board::{can_reach, reachable_squares, Occupancy};
use super::harmony::{is_progression, MIN_HARMONY_PIECES};
use super::layout::{in_enemy_half, initial_pieces};
use super::relations::{assisted_relations, direct_relations, relation_holds};
use super::types::*;

#[derive(Debug, Clone, Default)]
pub struct RithmomachiaPlugin;

impl RithmomachiaPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl TypedGamePlugin for RithmomachiaPlugin {
    type State = RithmomachiaState;
    type Move = RithmomachiaMove;
    type Config = RithmomachiaConfig;

    fn game_id(&self) -> &str {
        "rithmomachia"
    }
    fn display_name(&self) -> &str {
        "Rithmomachia"
    }
    fn description(&self) -> &str {
        "The medieval philosophers' game. Capture by arithmetic relations \
         and win by building a harmony in the enemy half."
    }
    fn min_players(&self) -> u32 {
        2
    }
    fn max_players(&self) -> u32 {
        2
    }

    fn check_config(&self, config: &RithmomachiaConfig) -> Result<(), MoveError> {
        check_config(config)
    }

    fn get_initial_state(&self, config: &RithmomachiaConfig) -> RithmomachiaState {
        RithmomachiaState {
            game_phase: GamePhase::Setup,
            config: config.clone(),
            pieces: initial_pieces(),
            turn: Color::W,
            ply: 0,
            half_moves_since_capture: 0,
            position_counts: Default::default(),
            pending_harmony: None,
            draw_offer: None,
            captured_points: [(Color::W, 0), (Color::B, 0)].into_iter().collect(),
            history: Vec::new(),
            winner: None,
            win_condition: None,
        }
    }

    fn check_move(
        &self,
        state: &RithmomachiaState,
        game_move: &RithmomachiaGameMove,
        ctx: &MoveContext,
    ) -> Result<(), MoveError> {
        let name = game_move.kind.name();
        match &game_move.kind {
            RithmomachiaMove::StartGame => require_phase(state, GamePhase::Setup, name),
            RithmomachiaMove::Move {
                piece_id,
                from,
                to,
                capture,
            } => {
                require_phase(state, GamePhase::Playing, name)?;
                require_turn(state, ctx)?;
                check_piece_move(state, piece_id, *from, *to, capture.as_ref())
            }
            RithmomachiaMove::DeclareHarmony {
                piece_ids,
                harmony_type,
            } => {
                require_phase(state, GamePhase::Playing, name)?;
                require_turn(state, ctx)?;
                check_harmony(state, state.turn, piece_ids, *harmony_type)
            }
            RithmomachiaMove::Resign { color } => {
                require_phase(state, GamePhase::Playing, name)?;
                match ctx.seat.map(Color::from_seat) {
                    Some(seat_color) if seat_color != Some(*color) => {
                        Err(MoveError::precondition("Cannot resign for the other side"))
                    }
                    _ => Ok(()),
                }
            }
            RithmomachiaMove::OfferDraw => {
                require_phase(state, GamePhase::Playing, name)?;
                require_turn(state, ctx)?;
                if state.draw_offer.is_some() {
                    return Err(MoveError::invalid_state("A draw offer is already pending"));
                }
                Ok(())
            }
            RithmomachiaMove::AcceptDraw | RithmomachiaMove::DeclineDraw => {
                require_phase(state, GamePhase::Playing, name)?;
                require_turn(state, ctx)?;
                if state.draw_offer != Some(state.turn.opponent()) {
                    return Err(MoveError::invalid_state("No draw offer from the opponent"));
                }
                Ok(())
            }
            RithmomachiaMove::SetConfig { field, value } => {
                require_phase(state, GamePhase::Setup, name)?;
                apply_config_field(&state.config, *field, value).map(|_| ())
            }
            RithmomachiaMove::ResetGame => Ok(()),
            RithmomachiaMove::Unknown => Err(MoveError::UnknownMove),
        }
    }

    fn apply_move(&self, state: &RithmomachiaState, game_move: &RithmomachiaGameMove) -> RithmomachiaState {
        match &game_move.kind {
            RithmomachiaMove::StartGame => {
                if state.game_phase != GamePhase::Setup {
                    return state.clone();
                }
                let mut s = self.get_initial_state(&state.config);
                s.game_phase = GamePhase::Playing;
                record_position(&mut s);
                s
            }
            RithmomachiaMove::Move {
                piece_id,
                from,
                to,
                capture,
            } => apply_piece_move(state, piece_id, *from, *to, capture.as_ref()),
            RithmomachiaMove::DeclareHarmony {
                piece_ids,
                harmony_type,
            } => apply_declare_harmony(state, piece_ids, *harmony_type),
            RithmomachiaMove::Resign { color } => {
                let mut s = state.clone();
                if s.game_phase == GamePhase::Playing {
                    finish_game(&mut s, Some(color.opponent()), WinCondition::Resignation);
                }
                s
            }
            RithmomachiaMove::OfferDraw => {
                let mut s = state.clone();
                if s.game_phase == GamePhase::Playing {
                    s.draw_offer = Some(s.turn);
                }
                s
            }
            RithmomachiaMove::AcceptDraw => {
                let mut s = state.clone();
                if s.game_phase == GamePhase::Playing && s.draw_offer.is_some() {
                    s.draw_offer = None;
                    finish_game(&mut s, None, WinCondition::Agreement);
                }
                s
            }
            RithmomachiaMove::DeclineDraw => {
                let mut s = state.clone();
                s.draw_offer = None;
                s
            }
            RithmomachiaMove::SetConfig { field, value } => {
                let mut s = state.clone();
                if s.game_phase == GamePhase::Setup {
                    if let Ok(config) = apply_config_field(&s.config, *field, value) {
                        s.config = config;
                    }
                }
                s
            }
            RithmomachiaMove::ResetGame => self.get_initial_state(&state.config),
            RithmomachiaMove::Unknown => state.clone(),
        }
    }

    fn is_game_complete(&self, state: &RithmomachiaState) -> bool {
        state.game_phase == GamePhase::Results
    }
}

/// All legal MOVE payloads for the side to move, captures included.
pub fn legal_moves(state: &RithmomachiaState) -> Vec<RithmomachiaMove> {
    if state.game_phase != GamePhase::Playing {
        return Vec::new();
    }
    let occupancy = Occupancy::new(state);
    let mut moves = Vec::new();
    for piece in state.live_pieces(state.turn) {
        for to in reachable_squares(&occupancy, piece) {
            match occupancy.get(to) {
                None => moves.push(RithmomachiaMove::Move {
                    piece_id: piece.id.clone(),
                    from: piece.square,
                    to,
                    capture: None,
                }),
                Some(target) if target.color != piece.color => {
                    for capture in capture_options(state, piece, target) {
                        moves.push(RithmomachiaMove::Move {
                            piece_id: piece.id.clone(),
                            from: piece.square,
                            to,
                            capture: Some(capture),
                        });
                    }
                }
                Some(_) => {}
            }
        }
    }
    moves
}

/// Cheaper than `legal_moves(..).is_empty()`: stops at the first move found.
pub fn has_legal_move(state: &RithmomachiaState, color: Color) -> bool {
    let occupancy = Occupancy::new(state);
    state.live_pieces(color).any(|piece| {
        reachable_squares(&occupancy, piece)
            .into_iter()
            .any(|to| match occupancy.get(to) {
                None => true,
                Some(target) if target.color != color => {
                    !capture_options(state, piece, target).is_empty()
                }
                Some(_) => false,
            })
    })
}

/// Every capture spec by which `mover` may take `target`.
pub fn capture_options(state: &RithmomachiaState, mover: &Piece, target: &Piece) -> Vec<CaptureSpec> {
    let t = target.total_value();
    let faces: Vec<Option<u32>> = if mover.piece_type == PieceType::P {
        mover.pyramid_faces.iter().copied().map(Some).collect()
    } else {
        vec![None]
    };
    let helpers: Vec<&Piece> = state
        .live_pieces(mover.color)
        .filter(|p| p.id != mover.id)
        .collect();

    let mut out = Vec::new();
    for face in faces {
        let m = face.unwrap_or(mover.value);
        for relation in direct_relations(m, t) {
            out.push(CaptureSpec {
                relation,
                target_piece_id: target.id.clone(),
                helpers: Vec::new(),
                pyramid_face: face,
            });
        }
        for helper in &helpers {
            for relation in assisted_relations(m, t, helper.total_value()) {
                out.push(CaptureSpec {
                    relation,
                    target_piece_id: target.id.clone(),
                    helpers: vec![helper.id.clone()],
                    pyramid_face: face,
                });
            }
        }
    }
    out
}

/// Key identifying a position for repetition counting: live pieces by square
/// plus the side to move.
pub fn position_key(state: &RithmomachiaState) -> String {
    let squares: Vec<String> = state
        .pieces
        .values()
        .filter(|p| !p.captured)
        .map(|p| format!("{}@{}", p.id, p.square))
        .collect();
    format!("{}|{}", squares.join(";"), state.turn)
}

/// A declared harmony stands while its pieces are alive, in the enemy half,
/// and still form the declared progression.
pub fn harmony_intact(state: &RithmomachiaState, declaration: &HarmonyDeclaration) -> bool {
    let mut values = Vec::with_capacity(declaration.piece_ids.len());
    for id in &declaration.piece_ids {
        match state.pieces.get(id) {
            Some(p)
                if p.color == declaration.color
                    && !p.captured
                    && in_enemy_half(p.color, p.square) =>
            {
                values.push(p.total_value())
            }
            _ => return false,
        }
    }
    is_progression(declaration.harmony_type, &values)
}

/// Fewest occurrences of a position that may end the game; the position
/// after START_GAME already counts once.
pub const MIN_REPETITION_COUNT: u32 = 2;
pub const MAX_REPETITION_COUNT: u32 = 10;
/// Moves per side.
pub const MAX_FIFTY_MOVE_LIMIT: u32 = 1000;

/// Validate a whole config by running every numeric field through
/// [`apply_config_field`].
pub fn check_config(config: &RithmomachiaConfig) -> Result<(), MoveError> {
    let fields = [
        (RithmomachiaConfigField::PointWinThreshold, config.point_win_threshold),
        (RithmomachiaConfigField::RepetitionCount, config.repetition_count),
        (RithmomachiaConfigField::FiftyMoveLimit, config.fifty_move_limit),
    ];
    for (field, value) in fields {
        apply_config_field(config, field, &serde_json::json!(value))?;
    }
    Ok(())
}

/// Validate a SET_CONFIG value and return the updated config.
pub fn apply_config_field(
    config: &RithmomachiaConfig,
    field: RithmomachiaConfigField,
    value: &serde_json::Value,
) -> Result<RithmomachiaConfig, MoveError> {
    let mut next = config.clone();
    let as_bool = |name: &str| {
        value
            .as_bool()
            .ok_or_else(|| MoveError::config(format!("{} must be a boolean", name)))
    };
    let as_count = |min: u32, max: u32| {
        value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| (min..=max).contains(n))
    };
    match field {
        RithmomachiaConfigField::PointWinEnabled => next.point_win_enabled = as_bool("pointWinEnabled")?,
        RithmomachiaConfigField::RepetitionRule => next.repetition_rule = as_bool("repetitionRule")?,
        RithmomachiaConfigField::FiftyMoveRule => next.fifty_move_rule = as_bool("fiftyMoveRule")?,
        RithmomachiaConfigField::PointWinThreshold => {
            next.point_win_threshold = value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n >= 1)
                .ok_or_else(|| MoveError::config("pointWinThreshold must be at least 1"))?;
        }
        RithmomachiaConfigField::RepetitionCount => {
            next.repetition_count = as_count(MIN_REPETITION_COUNT, MAX_REPETITION_COUNT)
                .ok_or_else(|| {
                    MoveError::config(format!(
                        "repetitionCount must be between {} and {}",
                        MIN_REPETITION_COUNT, MAX_REPETITION_COUNT
                    ))
                })?;
        }
        RithmomachiaConfigField::FiftyMoveLimit => {
            next.fifty_move_limit = as_count(1, MAX_FIFTY_MOVE_LIMIT).ok_or_else(|| {
                MoveError::config(format!(
                    "fiftyMoveLimit must be between 1 and {}",
                    MAX_FIFTY_MOVE_LIMIT
                ))
            })?;
        }
    }
    Ok(next)
}

// ── Private helpers ──

fn require_phase(
    state: &RithmomachiaState,
    phase: GamePhase,
    move_type: &'static str,
) -> Result<(), MoveError> {
    if state.game_phase != phase {
        return Err(MoveError::WrongPhase {
            move_type,
            phase: state.game_phase,
        });
    }
    Ok(())
}

fn require_turn(state: &RithmomachiaState, ctx: &MoveContext) -> Result<(), MoveError> {
    match ctx.seat {
        Some(seat) if Color::from_seat(seat) != Some(state.turn) => {
            Err(MoveError::precondition("Not your turn"))
        }
        _ => Ok(()),
    }
}

fn live_piece<'a>(state: &'a RithmomachiaState, piece_id: &str) -> Result<&'a Piece, MoveError> {
    match state.pieces.get(piece_id) {
        Some(p) if !p.captured => Ok(p),
        Some(_) => Err(MoveError::precondition(format!("Piece {} has been captured", piece_id))),
        None => Err(MoveError::precondition(format!("Unknown piece: {}", piece_id))),
    }
}

fn check_piece_move(
    state: &RithmomachiaState,
    piece_id: &str,
    from: Square,
    to: Square,
    capture: Option<&CaptureSpec>,
) -> Result<(), MoveError> {
    let piece = live_piece(state, piece_id)?;
    if piece.color != state.turn {
        return Err(MoveError::precondition(format!("Piece {} belongs to the opponent", piece_id)));
    }
    if piece.square != from {
        return Err(MoveError::precondition(format!(
            "Piece {} is on {}, not {}",
            piece_id, piece.square, from
        )));
    }
    let occupancy = Occupancy::new(state);
    if !can_reach(&occupancy, piece, to) {
        return Err(MoveError::precondition(format!(
            "{:?} on {} cannot reach {}",
            piece.piece_type, from, to
        )));
    }
    match (occupancy.get(to), capture) {
        (None, None) => Ok(()),
        (None, Some(_)) => Err(MoveError::precondition(format!("No piece to capture on {}", to))),
        (Some(occupant), _) if occupant.color == piece.color => Err(MoveError::precondition(
            format!("{} is occupied by your own piece", to),
        )),
        (Some(_), None) => Err(MoveError::precondition(format!(
            "{} is occupied; moving there requires a capture",
            to
        ))),
        (Some(target), Some(spec)) => check_capture(state, piece, target, spec),
    }
}

fn check_capture(
    state: &RithmomachiaState,
    mover: &Piece,
    target: &Piece,
    spec: &CaptureSpec,
) -> Result<(), MoveError> {
    if spec.target_piece_id != target.id {
        return Err(MoveError::precondition(format!(
            "Capture target {} is not on the destination square",
            spec.target_piece_id
        )));
    }

    let m = match (mover.piece_type, spec.pyramid_face) {
        (PieceType::P, Some(face)) if mover.pyramid_faces.contains(&face) => face,
        (PieceType::P, Some(face)) => {
            return Err(MoveError::precondition(format!("Pyramid has no face {}", face)))
        }
        (PieceType::P, None) => {
            return Err(MoveError::precondition("A pyramid must capture with one of its faces"))
        }
        (_, Some(_)) => {
            return Err(MoveError::precondition("Only a pyramid can capture with a face"))
        }
        (_, None) => mover.value,
    };

    let expected_helpers = usize::from(spec.relation.needs_helper());
    if spec.helpers.len() != expected_helpers {
        return Err(MoveError::precondition(format!(
            "{:?} capture takes {} helper(s), got {}",
            spec.relation,
            expected_helpers,
            spec.helpers.len()
        )));
    }
    let helper = match spec.helpers.first() {
        Some(id) => {
            let helper = live_piece(state, id)?;
            if helper.color != mover.color || helper.id == mover.id {
                return Err(MoveError::precondition(format!(
                    "Helper {} must be another of your own pieces",
                    id
                )));
            }
            Some(helper.total_value())
        }
        None => None,
    };

    let t = target.total_value();
    if !relation_holds(spec.relation, m, t, helper) {
        return Err(MoveError::precondition(format!(
            "{:?} relation does not hold: attacker {}, target {}",
            spec.relation, m, t
        )));
    }
    Ok(())
}

fn check_harmony(
    state: &RithmomachiaState,
    color: Color,
    piece_ids: &[String],
    harmony_type: HarmonyType,
) -> Result<(), MoveError> {
    if piece_ids.len() < MIN_HARMONY_PIECES {
        return Err(MoveError::precondition(format!(
            "A harmony needs at least {} pieces",
            MIN_HARMONY_PIECES
        )));
    }
    let mut seen = HashSet::new();
    let mut values = Vec::with_capacity(piece_ids.len());
    for id in piece_ids {
        if !seen.insert(id.as_str()) {
            return Err(MoveError::precondition(format!("Duplicate piece in harmony: {}", id)));
        }
        let piece = live_piece(state, id)?;
        if piece.color != color {
            return Err(MoveError::precondition(format!("Piece {} belongs to the opponent", id)));
        }
        if !in_enemy_half(color, piece.square) {
            return Err(MoveError::precondition(format!(
                "Piece {} is not in the enemy half",
                id
            )));
        }
        values.push(piece.total_value());
    }
    if !is_progression(harmony_type, &values) {
        return Err(MoveError::precondition(format!(
            "Values {:?} do not form a {:?} progression",
            values, harmony_type
        )));
    }
    Ok(())
}

fn finish_game(s: &mut RithmomachiaState, winner: Option<Color>, condition: WinCondition) {
    s.game_phase = GamePhase::Results;
    s.winner = winner;
    s.win_condition = Some(condition);
}

fn record_position(s: &mut RithmomachiaState) -> u32 {
    let key = position_key(s);
    let count = s.position_counts.entry(key).or_insert(0);
    *count += 1;
    *count
}

/// Hand the turn over and evaluate every end condition, in priority order.
fn end_turn(s: &mut RithmomachiaState, mover: Color) {
    s.ply += 1;
    s.turn = mover.opponent();
    let repetitions = record_position(s);

    if let Some(declaration) = s.pending_harmony.take() {
        if declaration.color != mover && harmony_intact(s, &declaration) {
            finish_game(s, Some(declaration.color), WinCondition::Harmony);
            return;
        }
        if declaration.color == mover {
            s.pending_harmony = Some(declaration);
        }
    }
    if s.config.point_win_enabled && s.points(mover) >= s.config.point_win_threshold {
        finish_game(s, Some(mover), WinCondition::Points);
        return;
    }
    if s.config.repetition_rule && repetitions >= s.config.repetition_count {
        finish_game(s, None, WinCondition::Repetition);
        return;
    }
    if s.config.fifty_move_rule
        && s.half_moves_since_capture >= s.config.fifty_move_limit.saturating_mul(2)
    {
        finish_game(s, None, WinCondition::Fifty);
        return;
    }
    if !has_legal_move(s, s.turn) {
        finish_game(s, Some(mover), WinCondition::Exhaustion);
    }
}

fn apply_piece_move(
    state: &RithmomachiaState,
    piece_id: &str,
    from: Square,
    to: Square,
    capture: Option<&CaptureSpec>,
) -> RithmomachiaState {
    let mover = match state.pieces.get(piece_id) {
        Some(p) if state.game_phase == GamePhase::Playing && !p.captured => p.color,
        _ => return state.clone(),
    };

    let mut s = state.clone();
    if let Some(piece) = s.pieces.get_mut(piece_id) {
        piece.square = to;
    }

    let mut record = MoveRecord {
        ply: s.ply,
        color: mover,
        piece_id: piece_id.to_string(),
        from,
        to,
        captured: None,
        relation: None,
    };
    let taken = capture.and_then(|spec| {
        let target = s.pieces.get_mut(&spec.target_piece_id)?;
        if target.color == mover || target.captured {
            return None;
        }
        target.captured = true;
        Some((target.piece_type.point_value(), spec))
    });
    match taken {
        Some((points, spec)) => {
            *s.captured_points.entry(mover).or_insert(0) += points;
            s.half_moves_since_capture = 0;
            record.captured = Some(spec.target_piece_id.clone());
            record.relation = Some(spec.relation);
        }
        None => s.half_moves_since_capture += 1,
    }
    s.history.push(record);

    // moving instead of answering declines the offer
    if s.draw_offer == Some(mover.opponent()) {
        s.draw_offer = None;
    }
    end_turn(&mut s, mover);
    s
}

fn apply_declare_harmony(
    state: &RithmomachiaState,
    piece_ids: &[String],
    harmony_type: HarmonyType,
) -> RithmomachiaState {
    if state.game_phase != GamePhase::Playing {
        return state.clone();
    }
    let mut s = state.clone();
    let color = s.turn;
    let declaration = HarmonyDeclaration {
        color,
        piece_ids: piece_ids.to_vec(),
        harmony_type,
        declared_at_ply: s.ply,
    };
    s.half_moves_since_capture += 1;
    end_turn(&mut s, color);
    if s.game_phase == GamePhase::Playing {
        s.pending_harmony = Some(declaration);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mv(kind: RithmomachiaMove) -> RithmomachiaGameMove {
        GameMove::new("p1", 0, kind)
    }

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn piece(id: &str, color: Color, piece_type: PieceType, value: u32, at: &str) -> Piece {
        let pyramid_faces = if piece_type == PieceType::P {
            vec![16, 25, 36, 49, 64]
        } else {
            Vec::new()
        };
        Piece {
            id: id.into(),
            color,
            piece_type,
            value,
            pyramid_faces,
            square: sq(at),
            captured: false,
        }
    }

    /// Playing state with only the given pieces, White to move.
    fn custom(pieces: Vec<Piece>) -> RithmomachiaState {
        let plugin = RithmomachiaPlugin::new();
        let mut state = plugin.get_initial_state(&RithmomachiaConfig::default());
        state.game_phase = GamePhase::Playing;
        state.pieces = pieces.into_iter().map(|p| (p.id.clone(), p)).collect();
        record_position(&mut state);
        state
    }

    fn started() -> RithmomachiaState {
        let plugin = RithmomachiaPlugin::new();
        let state = plugin.get_initial_state(&RithmomachiaConfig::default());
        apply_ok(&state, RithmomachiaMove::StartGame)
    }

    fn apply_ok(state: &RithmomachiaState, kind: RithmomachiaMove) -> RithmomachiaState {
        RithmomachiaPlugin::new()
            .validate_move(state, &mv(kind), &MoveContext::default())
            .into_result()
            .unwrap()
    }

    fn reject(state: &RithmomachiaState, kind: RithmomachiaMove) -> String {
        reject_ctx(state, kind, &MoveContext::default())
    }

    fn reject_ctx(state: &RithmomachiaState, kind: RithmomachiaMove, ctx: &MoveContext) -> String {
        let before = state.clone();
        let result = RithmomachiaPlugin::new().validate_move(state, &mv(kind), ctx);
        assert_eq!(*state, before);
        result.error().expect("move should be rejected").to_string()
    }

    fn step(piece_id: &str, from: &str, to: &str) -> RithmomachiaMove {
        RithmomachiaMove::Move {
            piece_id: piece_id.into(),
            from: sq(from),
            to: sq(to),
            capture: None,
        }
    }

    fn take(piece_id: &str, from: &str, to: &str, relation: CaptureRelation, target: &str) -> RithmomachiaMove {
        take_with(piece_id, from, to, relation, target, &[], None)
    }

    fn take_with(
        piece_id: &str,
        from: &str,
        to: &str,
        relation: CaptureRelation,
        target: &str,
        helpers: &[&str],
        pyramid_face: Option<u32>,
    ) -> RithmomachiaMove {
        RithmomachiaMove::Move {
            piece_id: piece_id.into(),
            from: sq(from),
            to: sq(to),
            capture: Some(CaptureSpec {
                relation,
                target_piece_id: target.into(),
                helpers: helpers.iter().map(|h| h.to_string()).collect(),
                pyramid_face,
            }),
        }
    }

    #[test]
    fn test_initial_state() {
        let state = RithmomachiaPlugin::new().get_initial_state(&RithmomachiaConfig::default());
        assert_eq!(state.game_phase, GamePhase::Setup);
        assert_eq!(state.pieces.len(), 48);
        assert_eq!(state.turn, Color::W);
        assert!(state.position_counts.is_empty());
    }

    #[test]
    fn test_start_game() {
        let state = started();
        assert_eq!(state.game_phase, GamePhase::Playing);
        assert_eq!(state.position_counts.values().sum::<u32>(), 1);
        let msg = reject(&state, RithmomachiaMove::StartGame);
        assert_eq!(msg, "START_GAME is not allowed during the playing phase");
    }

    #[test]
    fn test_simple_move_passes_turn() {
        let state = apply_ok(&started(), step("W-C-C1", "C1", "E3"));
        assert_eq!(state.pieces["W-C-C1"].square, sq("E3"));
        assert_eq!(state.turn, Color::B);
        assert_eq!(state.ply, 1);
        assert_eq!(state.half_moves_since_capture, 1);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].from, sq("C1"));
    }

    #[test]
    fn test_move_rejections() {
        let state = started();
        assert!(reject(&state, step("B-C-N1", "N1", "M2")).contains("opponent"));
        assert!(reject(&state, step("W-C-C1", "C2", "E3")).contains("not C2"));
        assert!(reject(&state, step("W-C-C1", "C1", "C3")).contains("cannot reach"));
        // A1 square is hemmed in by its own column
        assert!(reject(&state, step("W-S-A1", "A1", "A3")).contains("cannot reach"));
        assert!(reject(&state, step("W-T-B1", "B1", "C1")).contains("your own piece"));
        assert!(reject(&state, step("nope", "A1", "A2")).contains("Unknown piece"));
    }

    #[test]
    fn test_seat_must_match_turn() {
        let state = started();
        let msg = reject_ctx(&state, step("W-C-C1", "C1", "E3"), &MoveContext::for_seat(1));
        assert_eq!(msg, "Not your turn");
        let ok = RithmomachiaPlugin::new().validate_move(
            &state,
            &mv(step("W-C-C1", "C1", "E3")),
            &MoveContext::for_seat(0),
        );
        assert!(ok.is_valid());
    }

    #[test]
    fn test_equal_capture_scores_points() {
        let state = custom(vec![
            piece("w9", Color::W, PieceType::C, 9, "E5"),
            piece("b9", Color::B, PieceType::C, 9, "G7"),
            piece("b3", Color::B, PieceType::T, 3, "P1"),
        ]);
        let after = apply_ok(&state, take("w9", "E5", "G7", CaptureRelation::Equal, "b9"));
        assert!(after.pieces["b9"].captured);
        assert_eq!(after.pieces["w9"].square, sq("G7"));
        assert_eq!(after.points(Color::W), 1);
        assert_eq!(after.half_moves_since_capture, 0);
        assert_eq!(after.history[0].captured.as_deref(), Some("b9"));
        assert_eq!(after.history[0].relation, Some(CaptureRelation::Equal));
    }

    #[test]
    fn test_capture_rejections() {
        let state = custom(vec![
            piece("w4", Color::W, PieceType::C, 4, "E5"),
            piece("w5", Color::W, PieceType::T, 5, "A1"),
            piece("b9", Color::B, PieceType::C, 9, "G7"),
            piece("b2", Color::B, PieceType::T, 2, "P1"),
        ]);
        assert!(reject(&state, step("w4", "E5", "G7")).contains("requires a capture"));
        assert!(reject(&state, take("w4", "E5", "G7", CaptureRelation::Equal, "b9"))
            .contains("does not hold"));
        assert!(reject(&state, take("w4", "E5", "F6", CaptureRelation::Equal, "b9"))
            .contains("No piece to capture"));
        assert!(reject(&state, take("w4", "E5", "G7", CaptureRelation::Equal, "b2"))
            .contains("not on the destination"));
        assert!(reject(&state, take("w4", "E5", "G7", CaptureRelation::Sum, "b9"))
            .contains("helper"));
        assert!(reject(
            &state,
            take_with("w4", "E5", "G7", CaptureRelation::Sum, "b9", &["b2"], None)
        )
        .contains("your own pieces"));
    }

    #[test]
    fn test_helper_capture() {
        let state = custom(vec![
            piece("w4", Color::W, PieceType::C, 4, "E5"),
            piece("w5", Color::W, PieceType::T, 5, "A1"),
            piece("b9", Color::B, PieceType::C, 9, "G7"),
            piece("b2", Color::B, PieceType::T, 2, "P1"),
        ]);
        let after = apply_ok(
            &state,
            take_with("w4", "E5", "G7", CaptureRelation::Sum, "b9", &["w5"], None),
        );
        assert!(after.pieces["b9"].captured);
        assert!(!after.pieces["w5"].captured);
    }

    #[test]
    fn test_pyramid_attacks_with_a_face() {
        let state = custom(vec![
            piece("wp", Color::W, PieceType::P, 190, "E5"),
            piece("b25", Color::B, PieceType::T, 25, "F6"),
            piece("b2", Color::B, PieceType::T, 2, "P1"),
        ]);
        assert!(reject(&state, take("wp", "E5", "F6", CaptureRelation::Equal, "b25"))
            .contains("faces"));
        assert!(reject(
            &state,
            take_with("wp", "E5", "F6", CaptureRelation::Equal, "b25", &[], Some(24))
        )
        .contains("no face 24"));
        let after = apply_ok(
            &state,
            take_with("wp", "E5", "F6", CaptureRelation::Equal, "b25", &[], Some(25)),
        );
        assert!(after.pieces["b25"].captured);
    }

    #[test]
    fn test_pyramid_target_counts_all_faces() {
        let state = custom(vec![
            piece("w190", Color::W, PieceType::T, 190, "E5"),
            piece("bp", Color::B, PieceType::P, 190, "E8"),
            piece("b2", Color::B, PieceType::T, 2, "P1"),
        ]);
        let after = apply_ok(&state, take("w190", "E5", "E8", CaptureRelation::Equal, "bp"));
        assert!(after.pieces["bp"].captured);
        assert_eq!(after.points(Color::W), PieceType::P.point_value());
    }

    #[test]
    fn test_non_pyramid_cannot_name_face() {
        let state = custom(vec![
            piece("w9", Color::W, PieceType::C, 9, "E5"),
            piece("b9", Color::B, PieceType::C, 9, "F6"),
        ]);
        let msg = reject(
            &state,
            take_with("w9", "E5", "F6", CaptureRelation::Equal, "b9", &[], Some(9)),
        );
        assert!(msg.contains("Only a pyramid"));
    }

    fn harmony_board() -> RithmomachiaState {
        custom(vec![
            piece("w2", Color::W, PieceType::C, 2, "J1"),
            piece("w4", Color::W, PieceType::C, 4, "J3"),
            piece("w6", Color::W, PieceType::C, 6, "J5"),
            piece("w7", Color::W, PieceType::T, 7, "C4"),
            piece("b12", Color::B, PieceType::T, 12, "P8"),
            piece("b2", Color::B, PieceType::T, 2, "H1"),
        ])
    }

    fn declare(ids: &[&str], harmony_type: HarmonyType) -> RithmomachiaMove {
        RithmomachiaMove::DeclareHarmony {
            piece_ids: ids.iter().map(|s| s.to_string()).collect(),
            harmony_type,
        }
    }

    #[test]
    fn test_harmony_wins_if_opponent_does_not_break_it() {
        let state = apply_ok(&harmony_board(), declare(&["w2", "w4", "w6"], HarmonyType::Arithmetic));
        assert_eq!(state.turn, Color::B);
        assert!(state.pending_harmony.is_some());
        assert_eq!(state.game_phase, GamePhase::Playing);

        let state = apply_ok(&state, step("b12", "P8", "P7"));
        assert_eq!(state.game_phase, GamePhase::Results);
        assert_eq!(state.winner, Some(Color::W));
        assert_eq!(state.win_condition, Some(WinCondition::Harmony));
    }

    #[test]
    fn test_harmony_broken_by_capture() {
        let state = apply_ok(&harmony_board(), declare(&["w2", "w4", "w6"], HarmonyType::Arithmetic));
        let state = apply_ok(&state, take("b2", "H1", "J1", CaptureRelation::Equal, "w2"));
        assert_eq!(state.game_phase, GamePhase::Playing);
        assert!(state.pending_harmony.is_none());
    }

    #[test]
    fn test_harmony_rejections() {
        let state = harmony_board();
        assert!(reject(&state, declare(&["w2", "w4"], HarmonyType::Arithmetic)).contains("at least 3"));
        assert!(reject(&state, declare(&["w2", "w4", "w6"], HarmonyType::Geometric))
            .contains("Geometric"));
        assert!(reject(&state, declare(&["w2", "w4", "w7"], HarmonyType::Arithmetic))
            .contains("enemy half"));
        assert!(reject(&state, declare(&["w2", "w2", "w4"], HarmonyType::Arithmetic))
            .contains("Duplicate"));
        assert!(reject(&state, declare(&["w2", "w4", "b12"], HarmonyType::Arithmetic))
            .contains("opponent"));
    }

    #[test]
    fn test_resign() {
        let state = started();
        let msg = reject_ctx(
            &state,
            RithmomachiaMove::Resign { color: Color::W },
            &MoveContext::for_seat(1),
        );
        assert!(msg.contains("other side"));
        let state = apply_ok(&state, RithmomachiaMove::Resign { color: Color::B });
        assert_eq!(state.winner, Some(Color::W));
        assert_eq!(state.win_condition, Some(WinCondition::Resignation));
        assert!(RithmomachiaPlugin::new().is_game_complete(&state));
    }

    #[test]
    fn test_draw_offer_accepted() {
        let state = apply_ok(&started(), RithmomachiaMove::OfferDraw);
        assert_eq!(state.draw_offer, Some(Color::W));
        assert!(reject(&state, RithmomachiaMove::OfferDraw).contains("already pending"));
        // White cannot accept its own offer
        assert!(reject(&state, RithmomachiaMove::AcceptDraw).contains("No draw offer"));

        let state = apply_ok(&state, step("W-C-C1", "C1", "E3"));
        let state = apply_ok(&state, RithmomachiaMove::AcceptDraw);
        assert_eq!(state.game_phase, GamePhase::Results);
        assert_eq!(state.winner, None);
        assert_eq!(state.win_condition, Some(WinCondition::Agreement));
    }

    #[test]
    fn test_draw_offer_declined_or_ignored() {
        let offered = apply_ok(&started(), RithmomachiaMove::OfferDraw);
        let offered = apply_ok(&offered, step("W-C-C1", "C1", "E3"));

        let declined = apply_ok(&offered, RithmomachiaMove::DeclineDraw);
        assert_eq!(declined.draw_offer, None);
        assert_eq!(declined.turn, Color::B);

        let ignored = apply_ok(&offered, step("B-C-N1", "N1", "L3"));
        assert_eq!(ignored.draw_offer, None);
    }

    #[test]
    fn test_fifty_move_draw() {
        let mut state = custom(vec![
            piece("wt", Color::W, PieceType::T, 5, "A1"),
            piece("bt", Color::B, PieceType::T, 7, "P8"),
        ]);
        state.half_moves_since_capture = 99;
        let state = apply_ok(&state, step("wt", "A1", "A2"));
        assert_eq!(state.win_condition, Some(WinCondition::Fifty));
        assert_eq!(state.winner, None);
    }

    #[test]
    fn test_fifty_move_rule_can_be_disabled() {
        let mut state = custom(vec![
            piece("wt", Color::W, PieceType::T, 5, "A1"),
            piece("bt", Color::B, PieceType::T, 7, "P8"),
        ]);
        state.config.fifty_move_rule = false;
        state.half_moves_since_capture = 99;
        let state = apply_ok(&state, step("wt", "A1", "A2"));
        assert_eq!(state.game_phase, GamePhase::Playing);
    }

    #[test]
    fn test_threefold_repetition_draw() {
        let mut state = custom(vec![
            piece("wt", Color::W, PieceType::T, 5, "A1"),
            piece("bt", Color::B, PieceType::T, 7, "P8"),
        ]);
        let shuffle = [
            step("wt", "A1", "A2"),
            step("bt", "P8", "P7"),
            step("wt", "A2", "A1"),
            step("bt", "P7", "P8"),
        ];
        for kind in shuffle.iter().chain(shuffle.iter()) {
            assert_eq!(state.game_phase, GamePhase::Playing);
            state = apply_ok(&state, kind.clone());
        }
        assert_eq!(state.win_condition, Some(WinCondition::Repetition));
        assert_eq!(state.ply, 8);
    }

    #[test]
    fn test_exhaustion() {
        // Black's lone pyramid is boxed in by pieces none of its faces relate to
        let state = custom(vec![
            piece("wc", Color::W, PieceType::C, 3, "A1"),
            piece("w11", Color::W, PieceType::T, 11, "O8"),
            piece("w13", Color::W, PieceType::T, 13, "O7"),
            piece("w17", Color::W, PieceType::T, 17, "P7"),
            piece("bp", Color::B, PieceType::P, 190, "P8"),
        ]);
        let state = apply_ok(&state, step("wc", "A1", "B2"));
        assert_eq!(state.winner, Some(Color::W));
        assert_eq!(state.win_condition, Some(WinCondition::Exhaustion));
    }

    #[test]
    fn test_points_victory() {
        let mut state = custom(vec![
            piece("w9", Color::W, PieceType::C, 9, "E5"),
            piece("b9", Color::B, PieceType::C, 9, "G7"),
            piece("b2", Color::B, PieceType::T, 2, "P1"),
        ]);
        state.config.point_win_enabled = true;
        state.config.point_win_threshold = 1;
        let state = apply_ok(&state, take("w9", "E5", "G7", CaptureRelation::Equal, "b9"));
        assert_eq!(state.winner, Some(Color::W));
        assert_eq!(state.win_condition, Some(WinCondition::Points));
    }

    #[test]
    fn test_set_config() {
        let state = RithmomachiaPlugin::new().get_initial_state(&RithmomachiaConfig::default());
        let state = apply_ok(
            &state,
            RithmomachiaMove::SetConfig {
                field: RithmomachiaConfigField::PointWinThreshold,
                value: json!(12),
            },
        );
        assert_eq!(state.config.point_win_threshold, 12);
        let msg = reject(
            &state,
            RithmomachiaMove::SetConfig {
                field: RithmomachiaConfigField::PointWinThreshold,
                value: json!(0),
            },
        );
        assert!(msg.starts_with("invalid config"));
        let msg = reject(
            &state,
            RithmomachiaMove::SetConfig {
                field: RithmomachiaConfigField::RepetitionRule,
                value: json!("yes"),
            },
        );
        assert!(msg.contains("boolean"));

        let playing = apply_ok(&state, RithmomachiaMove::StartGame);
        assert_eq!(playing.config.point_win_threshold, 12);
        let msg = reject(
            &playing,
            RithmomachiaMove::SetConfig {
                field: RithmomachiaConfigField::FiftyMoveRule,
                value: json!(false),
            },
        );
        assert!(msg.contains("playing phase"));
    }

    #[test]
    fn test_set_rule_counts() {
        let set = |field, value| RithmomachiaMove::SetConfig { field, value };
        let state = RithmomachiaPlugin::new().get_initial_state(&RithmomachiaConfig::default());

        let state = apply_ok(&state, set(RithmomachiaConfigField::RepetitionCount, json!(4)));
        assert_eq!(state.config.repetition_count, 4);
        let state = apply_ok(&state, set(RithmomachiaConfigField::FiftyMoveLimit, json!(20)));
        assert_eq!(state.config.fifty_move_limit, 20);

        for value in [json!(0), json!(1), json!(11), json!("3")] {
            let msg = reject(&state, set(RithmomachiaConfigField::RepetitionCount, value));
            assert!(msg.contains("repetitionCount"), "{}", msg);
        }
        for value in [json!(0), json!(1001), json!(3_000_000_000u64)] {
            let msg = reject(&state, set(RithmomachiaConfigField::FiftyMoveLimit, value));
            assert!(msg.contains("fiftyMoveLimit"), "{}", msg);
        }

        let playing = apply_ok(&state, RithmomachiaMove::StartGame);
        assert_eq!(playing.config.repetition_count, 4);
        assert_eq!(playing.config.fifty_move_limit, 20);
    }

    #[test]
    fn test_initial_config_validated() {
        let rejected = |config: RithmomachiaConfig| check_config(&config).unwrap_err().to_string();
        let defaults = RithmomachiaConfig::default();
        assert!(check_config(&defaults).is_ok());

        let msg = rejected(RithmomachiaConfig {
            repetition_count: 0,
            ..defaults.clone()
        });
        assert!(msg.contains("repetitionCount"), "{}", msg);
        let msg = rejected(RithmomachiaConfig {
            fifty_move_limit: 3_000_000_000,
            ..defaults.clone()
        });
        assert!(msg.contains("fiftyMoveLimit"), "{}", msg);
        let msg = rejected(RithmomachiaConfig {
            point_win_threshold: 0,
            ..defaults
        });
        assert!(msg.contains("pointWinThreshold"), "{}", msg);
    }

    #[test]
    fn test_adapter_rejects_invalid_initial_config() {
        use crate::engine::plugin::{GamePlugin, JsonAdapter};

        let adapter = JsonAdapter(RithmomachiaPlugin::new());
        let bad = [
            json!({"repetitionCount": 0}),
            json!({"fiftyMoveLimit": 3_000_000_000u64}),
        ];
        for options in bad {
            let err = adapter
                .get_initial_state(&GameConfig::from_options(options))
                .unwrap_err();
            assert!(err.to_string().starts_with("invalid config"), "{}", err);
        }
        let ok = GameConfig::from_options(json!({"repetitionCount": 2, "fiftyMoveLimit": 1}));
        assert!(adapter.get_initial_state(&ok).is_ok());
    }

    #[test]
    fn test_huge_fifty_move_limit_does_not_overflow() {
        let mut state = custom(vec![
            piece("wt", Color::W, PieceType::T, 5, "A1"),
            piece("bt", Color::B, PieceType::T, 7, "P8"),
        ]);
        state.config.fifty_move_limit = u32::MAX;
        state.half_moves_since_capture = 99;
        let state = apply_ok(&state, step("wt", "A1", "A2"));
        assert_eq!(state.game_phase, GamePhase::Playing);
        assert_eq!(state.win_condition, None);
    }

    #[test]
    fn test_reset_keeps_config() {
        let mut state = apply_ok(&started(), step("W-C-C1", "C1", "E3"));
        state.config.point_win_enabled = true;
        let reset = apply_ok(&state, RithmomachiaMove::ResetGame);
        assert_eq!(reset.game_phase, GamePhase::Setup);
        assert!(reset.config.point_win_enabled);
        assert!(reset.history.is_empty());
    }

    #[test]
    fn test_unknown_move_rejected() {
        assert_eq!(reject(&started(), RithmomachiaMove::Unknown), "unknown move type");
    }

    #[test]
    fn test_legal_moves_all_validate() {
        let state = started();
        let plugin = RithmomachiaPlugin::new();
        let moves = legal_moves(&state);
        assert!(!moves.is_empty());
        for kind in moves {
            let result = plugin.validate_move(&state, &mv(kind.clone()), &MoveContext::default());
            assert!(result.is_valid(), "{:?}: {:?}", kind, result.error());
        }
    }

    #[test]
    fn test_legal_moves_include_helper_captures() {
        let state = custom(vec![
            piece("w4", Color::W, PieceType::C, 4, "E5"),
            piece("w5", Color::W, PieceType::T, 5, "A1"),
            piece("b9", Color::B, PieceType::C, 9, "G7"),
        ]);
        let captures: Vec<CaptureSpec> = legal_moves(&state)
            .into_iter()
            .filter_map(|m| match m {
                RithmomachiaMove::Move { capture, .. } => capture,
                _ => None,
            })
            .collect();
        assert!(captures
            .iter()
            .any(|c| c.relation == CaptureRelation::Sum && c.helpers == vec!["w5".to_string()]));
    }

    #[test]
    fn test_predictor_matches_validator() {
        let plugin = RithmomachiaPlugin::new();
        let state = started();
        let game_move = mv(step("W-C-C1", "C1", "E3"));
        let validated = plugin
            .validate_move(&state, &game_move, &MoveContext::default())
            .into_result()
            .unwrap();
        assert_eq!(plugin.predict_move(&state, &game_move), validated);
    }

    #[test]
    fn test_predictor_ignores_inapplicable_move() {
        let plugin = RithmomachiaPlugin::new();
        let state = plugin.get_initial_state(&RithmomachiaConfig::default());
        assert_eq!(plugin.predict_move(&state, &mv(step("W-C-C1", "C1", "E3"))), state);
    }
}
