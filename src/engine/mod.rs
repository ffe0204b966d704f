pub mod arena;
pub mod bot_strategy;
pub mod error;
pub mod models;
pub mod plugin;
pub mod settings;
pub mod simulator;
