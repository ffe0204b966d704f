pub mod card_sorting;
pub mod rithmomachia;

use std::collections::HashMap;

use crate::engine::plugin::{GamePlugin, JsonAdapter};
use crate::engine::settings::EngineSettings;

use card_sorting::plugin::CardSortingPlugin;
use rithmomachia::plugin::RithmomachiaPlugin;

/// Registry of available game plugins.
pub struct GameRegistry {
    plugins: HashMap<String, Box<dyn GamePlugin>>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Registry holding every game this engine ships, tuned by `settings`.
    pub fn with_builtin_games(settings: &EngineSettings) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JsonAdapter(CardSortingPlugin::with_weights(
            settings.card_sorting.weights,
        ))));
        registry.register(Box::new(JsonAdapter(RithmomachiaPlugin::new())));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn GamePlugin>) {
        let id = plugin.game_id().to_string();
        self.plugins.insert(id, plugin);
    }

    pub fn get(&self, game_id: &str) -> Option<&dyn GamePlugin> {
        self.plugins.get(game_id).map(|p| p.as_ref())
    }

    pub fn list_game_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.plugins.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for GameRegistry {
    fn default() -> Self {
        Self::with_builtin_games(&EngineSettings::default())
    }
}
