//! Client-side mirror of a game: the last state the server confirmed plus the
//! moves sent but not yet acknowledged. The local view is the server state
//! with those moves replayed through the predictor.

use crate::engine::models::GameMove;
use crate::engine::plugin::TypedGamePlugin;

pub struct ClientMirror<'a, P: TypedGamePlugin> {
    plugin: &'a P,
    server_state: P::State,
    pending: Vec<GameMove<P::Move>>,
}

impl<'a, P: TypedGamePlugin> ClientMirror<'a, P> {
    pub fn new(plugin: &'a P, server_state: P::State) -> Self {
        Self {
            plugin,
            server_state,
            pending: Vec::new(),
        }
    }

    pub fn server_state(&self) -> &P::State {
        &self.server_state
    }

    pub fn pending(&self) -> &[GameMove<P::Move>] {
        &self.pending
    }

    /// Record a move sent to the server and return the new optimistic view.
    pub fn submit(&mut self, game_move: GameMove<P::Move>) -> P::State {
        self.pending.push(game_move);
        self.predicted()
    }

    /// Server state with every pending move applied optimistically.
    pub fn predicted(&self) -> P::State {
        self.pending
            .iter()
            .fold(self.server_state.clone(), |state, m| self.plugin.predict_move(&state, m))
    }

    /// Adopt a state pushed by the server. The server always wins; the oldest
    /// `acknowledged` pending moves are dropped since the new state includes them.
    pub fn reconcile(&mut self, server_state: P::State, acknowledged: usize) -> P::State {
        self.server_state = server_state;
        let acknowledged = acknowledged.min(self.pending.len());
        self.pending.drain(..acknowledged);
        self.predicted()
    }

    /// The server rejected the oldest pending move; forget it.
    pub fn reject_oldest(&mut self) -> P::State {
        if !self.pending.is_empty() {
            self.pending.remove(0);
        }
        tracing::debug!(pending = self.pending.len(), "pending move rejected by server");
        self.predicted()
    }
}
